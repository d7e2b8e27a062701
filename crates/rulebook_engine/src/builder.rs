//! Knowledge base construction.
//!
//! Building runs in phases: parse rule sources, register declared types,
//! check rule names, resolve every rule, then lower the resolved rules for
//! the selected [`BuildMode`] and wire them into the network. Problems from
//! every phase are collected; any error fails the whole build.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rulebook_foundation::{Diagnostic, Error, FactType, FieldType, Result, TypeRegistry};
use rulebook_language::{parse_source, Dialect, PackageDescr, RuleSource, Span};
use tracing::{debug, warn};

use crate::consequence::Consequence;
use crate::evaluator::{Action, BuildMode};
use crate::kbase::{CompiledRule, KnowledgeBase};
use crate::network::{NetworkSpec, RuleId};
use crate::resolve::{error_diagnostic, ResolvedRule, Resolver};

/// Collects rule sources and builds a [`KnowledgeBase`].
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBuilder {
    mode: BuildMode,
    dialect: Dialect,
    sources: Vec<RuleSource>,
    packages: Vec<PackageDescr>,
    types: Vec<FactType>,
}

impl KnowledgeBuilder {
    /// Creates a builder with interpreted mode and the Java dialect.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects how rules are lowered.
    #[must_use]
    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the dialect for packages and rules that do not name one.
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Adds a rule source file.
    #[must_use]
    pub fn with_source(mut self, source: RuleSource) -> Self {
        self.add_source(source);
        self
    }

    /// Adds a rule source file.
    pub fn add_source(&mut self, source: RuleSource) -> &mut Self {
        self.sources.push(source);
        self
    }

    /// Adds a package built programmatically.
    #[must_use]
    pub fn with_package(mut self, package: PackageDescr) -> Self {
        self.add_package(package);
        self
    }

    /// Adds a package built programmatically.
    pub fn add_package(&mut self, package: PackageDescr) -> &mut Self {
        self.packages.push(package);
        self
    }

    /// Registers a fact type supplied by the host.
    #[must_use]
    pub fn with_type(mut self, ty: FactType) -> Self {
        self.register_type(ty);
        self
    }

    /// Registers a fact type supplied by the host.
    pub fn register_type(&mut self, ty: FactType) -> &mut Self {
        self.types.push(ty);
        self
    }

    /// Returns the selected build mode.
    #[must_use]
    pub const fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Builds the knowledge base.
    ///
    /// # Errors
    /// Returns a `RuleBuild` error carrying every diagnostic if any phase
    /// reported an error.
    pub fn build(&self) -> Result<KnowledgeBase> {
        let mut diagnostics = Vec::new();

        let mut packages = Vec::with_capacity(self.sources.len() + self.packages.len());
        for source in &self.sources {
            match parse_source(source) {
                Ok(package) => packages.push(package),
                Err(err) => {
                    diagnostics.push(error_diagnostic(&err).in_resource(source.path.clone()));
                }
            }
        }
        packages.extend(self.packages.iter().cloned());

        let mut registry = TypeRegistry::new();
        for ty in &self.types {
            if let Err(err) = registry.register(ty.clone()) {
                diagnostics.push(error_diagnostic(&err));
            }
        }
        declare_types(&mut registry, &packages, &mut diagnostics);
        check_rule_names(&packages, &mut diagnostics);

        let mut resolved: Vec<(ResolvedRule, &PackageDescr)> = Vec::new();
        for package in &packages {
            let resolver = Resolver::new(&registry, &package.name, &package.imports);
            let dialect = package.dialect.unwrap_or(self.dialect);
            for rule in &package.rules {
                match resolver.resolve_rule(rule, dialect) {
                    Ok(rule) => resolved.push((rule, package)),
                    Err(problems) => diagnostics.extend(problems.into_iter().map(|d| match &package.resource {
                        Some(resource) => d.in_resource(resource.clone()),
                        None => d,
                    })),
                }
            }
        }

        if diagnostics.iter().any(Diagnostic::is_error) {
            warn!(
                errors = diagnostics.iter().filter(|d| d.is_error()).count(),
                "knowledge build failed"
            );
            return Err(Error::rule_build(diagnostics));
        }

        let mut network = NetworkSpec::new();
        let mut rules = Vec::with_capacity(resolved.len());
        for (index, (rule, package)) in resolved.into_iter().enumerate() {
            let id = RuleId::new(index);
            network.add_rule(id, &rule, self.mode);
            if !rule.enabled {
                diagnostics.push(
                    Diagnostic::info("rule is disabled and will never fire").in_rule(&*rule.name),
                );
            }
            let action = Action::lower(&rule.consequence, self.mode);
            rules.push(Some(Arc::new(CompiledRule {
                id,
                package: package.name.clone(),
                resource: package.resource.clone(),
                span: rule.span,
                salience: rule.salience,
                no_loop: rule.no_loop,
                enabled: rule.enabled,
                patterns: rule.patterns.iter().map(|p| p.type_name.clone()).collect(),
                consequence: Consequence::new(rule.dialect, action, rule.locals),
                name: rule.name,
            })));
        }

        debug!(
            rules = rules.len(),
            alphas = network.alphas().count(),
            mode = %self.mode,
            "knowledge base built"
        );
        Ok(KnowledgeBase {
            rules,
            network,
            registry: Arc::new(registry),
            mode: self.mode,
            diagnostics,
        })
    }
}

/// Registers every `declare` block, qualified by its package.
fn declare_types(
    registry: &mut TypeRegistry,
    packages: &[PackageDescr],
    diagnostics: &mut Vec<Diagnostic>,
) {
    let declared: HashSet<String> = packages
        .iter()
        .flat_map(|p| p.types.iter().map(|t| p.qualify(&t.name)))
        .collect();
    let lookup = |registry: &TypeRegistry, package: &PackageDescr, name: &str| -> Option<String> {
        if let Some(ty) = registry.resolve(name, &package.name, &package.imports) {
            return Some(ty.name().to_string());
        }
        let qualified = package.qualify(name);
        declared.contains(&qualified).then_some(qualified)
    };

    for package in packages {
        for decl in &package.types {
            let name = package.qualify(&decl.name);
            let mut ty = FactType::new(name.as_str());
            let mut failed = false;
            if let Some(supertype) = &decl.supertype {
                match lookup(registry, package, supertype) {
                    Some(resolved) => ty = ty.with_supertype(resolved),
                    None => {
                        failed = true;
                        diagnostics.push(located(
                            Diagnostic::error(format!("unknown supertype '{supertype}' of {name}")),
                            decl.span,
                            package,
                        ));
                    }
                }
            }
            for (field, type_name) in &decl.fields {
                let field_type = match FieldType::from_name(type_name) {
                    FieldType::Object(raw) => match lookup(registry, package, &raw) {
                        Some(resolved) => FieldType::Object(resolved.into()),
                        None => {
                            failed = true;
                            diagnostics.push(located(
                                Diagnostic::error(format!(
                                    "unknown type '{raw}' of field '{field}' in {name}"
                                )),
                                decl.span,
                                package,
                            ));
                            continue;
                        }
                    },
                    other => other,
                };
                ty = ty.with_field(field.as_str(), field_type);
            }
            if failed {
                continue;
            }
            if let Err(err) = registry.register(ty) {
                diagnostics.push(located(error_diagnostic(&err), decl.span, package));
            } else {
                debug!(r#type = %name, "declared type registered");
            }
        }
    }
}

fn located(
    diagnostic: Diagnostic,
    span: Span,
    package: &PackageDescr,
) -> Diagnostic {
    let diagnostic = diagnostic.at(span.line, span.column);
    match &package.resource {
        Some(resource) => diagnostic.in_resource(resource.clone()),
        None => diagnostic,
    }
}

fn check_rule_names(packages: &[PackageDescr], diagnostics: &mut Vec<Diagnostic>) {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for package in packages {
        for rule in &package.rules {
            let count = seen.entry(rule.name.as_str()).or_default();
            *count += 1;
            if *count == 2 {
                diagnostics.push(located(
                    Diagnostic::error(format!("duplicate rule name '{}'", rule.name))
                        .in_rule(rule.name.clone()),
                    rule.span,
                    package,
                ));
            }
        }
    }
}
