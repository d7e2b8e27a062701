//! Rule descriptor IR.
//!
//! Descriptors are the declarative form of a rule set, independent of how it
//! was written. The DRL front end produces them from source text; tests and
//! embedders can also build them directly. Constraint and consequence code is
//! kept as text with its source position and parsed by the compiler.

use crate::dialect::Dialect;
use crate::span::Span;

/// A rule source resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleSource {
    /// Path used in diagnostics.
    pub path: String,
    /// Source text.
    pub text: String,
}

impl RuleSource {
    /// Creates a rule source.
    #[must_use]
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// A package of type declarations and rules.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackageDescr {
    /// Package name (may be empty).
    pub name: String,
    /// Imported type names (`a.b.C` or `a.b.*`).
    pub imports: Vec<String>,
    /// Package-level default dialect.
    pub dialect: Option<Dialect>,
    /// Declared types.
    pub types: Vec<TypeDeclDescr>,
    /// Rules, in source order.
    pub rules: Vec<RuleDescr>,
    /// Resource the package was read from, if any.
    pub resource: Option<String>,
}

impl PackageDescr {
    /// Creates an empty package.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder method to add an import.
    #[must_use]
    pub fn with_import(mut self, import: impl Into<String>) -> Self {
        self.imports.push(import.into());
        self
    }

    /// Builder method to set the default dialect.
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// Builder method to add a type declaration.
    #[must_use]
    pub fn with_type(mut self, ty: TypeDeclDescr) -> Self {
        self.types.push(ty);
        self
    }

    /// Builder method to add a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: RuleDescr) -> Self {
        self.rules.push(rule);
        self
    }

    /// Returns the qualified form of a simple name in this package.
    #[must_use]
    pub fn qualify(&self, name: &str) -> String {
        if self.name.is_empty() || name.contains('.') {
            name.to_string()
        } else {
            format!("{}.{name}", self.name)
        }
    }
}

/// A `declare` block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeDeclDescr {
    /// Simple or qualified type name.
    pub name: String,
    /// Supertype name as written.
    pub supertype: Option<String>,
    /// Fields as `(name, type name)` in declaration order.
    pub fields: Vec<(String, String)>,
    /// Position of the declaration.
    pub span: Span,
}

impl TypeDeclDescr {
    /// Creates a type declaration.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder method to add a field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.fields.push((name.into(), ty.into()));
        self
    }

    /// Builder method to set the supertype.
    #[must_use]
    pub fn extending(mut self, supertype: impl Into<String>) -> Self {
        self.supertype = Some(supertype.into());
        self
    }
}

/// Rule attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributesDescr {
    /// Priority; higher fires first.
    pub salience: i32,
    /// Consequence dialect; falls back to the package default.
    pub dialect: Option<Dialect>,
    /// Suppress activations caused by the rule's own consequence.
    pub no_loop: bool,
    /// Disabled rules are compiled but never activated.
    pub enabled: bool,
}

impl Default for AttributesDescr {
    fn default() -> Self {
        Self {
            salience: 0,
            dialect: None,
            no_loop: false,
            enabled: true,
        }
    }
}

/// A rule.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleDescr {
    /// Rule name, unique within a rule set.
    pub name: String,
    /// Attributes.
    pub attributes: AttributesDescr,
    /// Patterns in join order.
    pub patterns: Vec<PatternDescr>,
    /// Consequence code.
    pub consequence: String,
    /// Position of the consequence code.
    pub consequence_span: Span,
    /// Position of the rule header.
    pub span: Span,
}

impl RuleDescr {
    /// Creates a rule with no patterns and an empty consequence.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder method to add a pattern.
    #[must_use]
    pub fn with_pattern(mut self, pattern: PatternDescr) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Builder method to set salience.
    #[must_use]
    pub fn with_salience(mut self, salience: i32) -> Self {
        self.attributes.salience = salience;
        self
    }

    /// Builder method to set the dialect.
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.attributes.dialect = Some(dialect);
        self
    }

    /// Builder method to set `no-loop`.
    #[must_use]
    pub fn with_no_loop(mut self, no_loop: bool) -> Self {
        self.attributes.no_loop = no_loop;
        self
    }

    /// Builder method to enable or disable the rule.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.attributes.enabled = enabled;
        self
    }

    /// Builder method to set the consequence code.
    #[must_use]
    pub fn then(mut self, code: impl Into<String>) -> Self {
        self.consequence = code.into();
        self
    }
}

/// A pattern: a type filter plus constraints.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatternDescr {
    /// Declaration bound to the matched fact (`$p`).
    pub binding: Option<String>,
    /// Type name as written.
    pub type_name: String,
    /// Constraints in source order.
    pub constraints: Vec<ConstraintDescr>,
    /// Position of the pattern.
    pub span: Span,
}

impl PatternDescr {
    /// Creates an unconstrained pattern.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    /// Builder method to bind the matched fact.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>) -> Self {
        self.binding = Some(name.into());
        self
    }

    /// Builder method to add a constraint.
    #[must_use]
    pub fn with_constraint(mut self, text: impl Into<String>) -> Self {
        self.constraints.push(ConstraintDescr::new(text));
        self
    }

    /// Builder method to add a field binding like `$a : age`.
    #[must_use]
    pub fn with_binding(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut constraint = ConstraintDescr::new(text);
        constraint.binding = Some(name.into());
        self.constraints.push(constraint);
        self
    }
}

/// One constraint of a pattern.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConstraintDescr {
    /// Declaration bound to the expression's value, if this is a binding.
    pub binding: Option<String>,
    /// Expression text.
    pub text: String,
    /// Position of the expression text.
    pub span: Span,
}

impl ConstraintDescr {
    /// Creates a constraint at the start of a virtual source.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            binding: None,
            text: text.into(),
            span: Span::at_start(),
        }
    }
}
