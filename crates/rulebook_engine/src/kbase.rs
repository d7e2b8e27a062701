//! Built knowledge bases.

use std::sync::Arc;

use rulebook_foundation::{
    Diagnostic, Error, ErrorContext, ErrorKind, Result, TypeRegistry, Value,
};
use rulebook_language::{Dialect, Span};
use tracing::debug;

use crate::consequence::Consequence;
use crate::evaluator::BuildMode;
use crate::network::{NetworkSpec, RuleId};

/// A rule ready to run.
#[derive(Debug)]
pub struct CompiledRule {
    pub(crate) id: RuleId,
    pub(crate) name: Arc<str>,
    pub(crate) package: String,
    pub(crate) resource: Option<String>,
    pub(crate) span: Span,
    pub(crate) salience: i32,
    pub(crate) no_loop: bool,
    pub(crate) enabled: bool,
    pub(crate) patterns: Vec<Arc<str>>,
    pub(crate) consequence: Consequence,
}

impl CompiledRule {
    /// Returns the rule id.
    #[must_use]
    pub const fn id(&self) -> RuleId {
        self.id
    }

    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name as a shared string.
    #[must_use]
    pub fn name_arc(&self) -> Arc<str> {
        self.name.clone()
    }

    /// Returns the package the rule was declared in.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Returns the source resource path, if the rule came from a file.
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// Returns where the rule is defined.
    ///
    /// Rules read from a resource carry the position of their header; rules
    /// built from descriptors only name their package.
    #[must_use]
    pub fn location(&self) -> ErrorContext {
        match &self.resource {
            Some(resource) => ErrorContext::new()
                .with_source(resource.clone())
                .with_position(self.span.line, self.span.column),
            None => ErrorContext::new().with_source(self.package.clone()),
        }
    }

    /// Returns the salience.
    #[must_use]
    pub const fn salience(&self) -> i32 {
        self.salience
    }

    /// Returns the no-loop attribute.
    #[must_use]
    pub const fn no_loop(&self) -> bool {
        self.no_loop
    }

    /// Returns the enabled attribute.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the consequence dialect.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.consequence.dialect()
    }

    /// Returns the qualified pattern types, in join order.
    #[must_use]
    pub fn patterns(&self) -> &[Arc<str>] {
        &self.patterns
    }

    /// Returns the consequence.
    #[must_use]
    pub const fn consequence(&self) -> &Consequence {
        &self.consequence
    }
}

/// The immutable result of a successful build.
///
/// A knowledge base holds compiled rules, the matching network and the type
/// registry. It is shared between sessions through an [`Arc`]; every session
/// keeps its own working memory.
#[derive(Debug)]
pub struct KnowledgeBase {
    pub(crate) rules: Vec<Option<Arc<CompiledRule>>>,
    pub(crate) network: NetworkSpec,
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) mode: BuildMode,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl KnowledgeBase {
    /// Returns the build mode the rules were lowered with.
    #[must_use]
    pub const fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Returns the warnings and notes reported by the build.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns the matching network.
    #[must_use]
    pub const fn network(&self) -> &NetworkSpec {
        &self.network
    }

    /// Returns the type registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Returns a rule by id.
    #[must_use]
    pub fn rule(&self, id: RuleId) -> Option<&Arc<CompiledRule>> {
        self.rules.get(id.index()).and_then(Option::as_ref)
    }

    /// Finds a rule by name.
    #[must_use]
    pub fn rule_by_name(&self, name: &str) -> Option<&Arc<CompiledRule>> {
        self.rules().find(|rule| rule.name() == name)
    }

    /// Iterates over the rules in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = &Arc<CompiledRule>> {
        self.rules.iter().flatten()
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules().count()
    }

    /// Removes a rule and the network nodes only it used.
    ///
    /// Returns false if no rule has that name. Sessions created afterwards
    /// no longer see the rule.
    pub fn remove_rule(&mut self, name: &str) -> bool {
        let Some(id) = self.rule_by_name(name).map(|rule| rule.id) else {
            return false;
        };
        self.network.remove_rule(id);
        self.rules[id.index()] = None;
        debug!(rule = name, "rule removed");
        true
    }

    /// Constructs a fact of a declared or registered type.
    ///
    /// `type_name` may be qualified or, when unambiguous, simple.
    ///
    /// # Errors
    /// Returns an error if the type is unknown or the arguments do not fit.
    pub fn instantiate(&self, type_name: &str, args: Vec<Value>) -> Result<Value> {
        let ty = self
            .registry
            .find(type_name)
            .ok_or_else(|| Error::new(ErrorKind::UnknownType(type_name.to_string())))?;
        self.registry.instantiate(ty.name(), args)
    }
}
