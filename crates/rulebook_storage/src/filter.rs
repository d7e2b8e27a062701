//! Object filters for working memory queries.

use std::fmt;
use std::sync::Arc;

use rulebook_foundation::{TypeRegistry, Value};

/// Selects facts from working memory.
///
/// Type filters accept either a qualified name (`org.example.Person`) or a
/// simple name (`Person`). With a registry, subtypes match too.
#[derive(Clone, Default)]
pub enum ObjectFilter {
    /// Accepts every fact.
    #[default]
    All,
    /// Accepts facts of the named type.
    Type(Arc<str>),
    /// Accepts facts for which the predicate returns true.
    Predicate(Arc<dyn Fn(&Value) -> bool + Send + Sync>),
}

impl ObjectFilter {
    /// Filter accepting every fact.
    #[must_use]
    pub const fn all() -> Self {
        Self::All
    }

    /// Filter accepting facts of the named type.
    #[must_use]
    pub fn of_type(name: impl Into<Arc<str>>) -> Self {
        Self::Type(name.into())
    }

    /// Filter accepting facts matching a predicate.
    #[must_use]
    pub fn matching(pred: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(pred))
    }

    /// Returns true if the fact's own type matches, ignoring subtyping.
    #[must_use]
    pub fn accepts(&self, fact: &Value) -> bool {
        match self {
            Self::All => true,
            Self::Type(name) => names_match(fact.type_name(), name),
            Self::Predicate(pred) => pred(fact),
        }
    }

    /// Returns true if the fact is an instance of the filtered type.
    #[must_use]
    pub fn accepts_in(&self, fact: &Value, registry: &TypeRegistry) -> bool {
        let Self::Type(name) = self else {
            return self.accepts(fact);
        };
        if names_match(fact.type_name(), name) {
            return true;
        }
        registry
            .iter()
            .filter(|ty| names_match(ty.name(), name))
            .any(|ty| registry.is_assignable(fact.type_name(), ty.name()))
    }
}

fn names_match(type_name: &str, wanted: &str) -> bool {
    if type_name == wanted {
        return true;
    }
    !wanted.contains('.') && type_name.rsplit('.').next() == Some(wanted)
}

impl fmt::Debug for ObjectFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "All"),
            Self::Type(name) => f.debug_tuple("Type").field(name).finish(),
            Self::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}
