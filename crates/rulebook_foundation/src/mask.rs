//! Property masks for property-reactive updates.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// A set of fact fields.
///
/// Used in two places: an update carries the mask of fields it changed, and
/// every pattern carries the mask of fields it reads. An update only
/// re-propagates through a pattern whose mask intersects the update's mask.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum PropertyMask {
    /// No fields.
    #[default]
    Empty,
    /// Every field, including identity of the whole fact.
    All,
    /// A specific set of fields.
    Fields(BTreeSet<Arc<str>>),
}

impl PropertyMask {
    /// Returns the empty mask.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Empty
    }

    /// Returns the mask covering everything.
    #[must_use]
    pub const fn all() -> Self {
        Self::All
    }

    /// Creates a mask from field names.
    pub fn of<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let set: BTreeSet<Arc<str>> = fields.into_iter().map(Into::into).collect();
        if set.is_empty() {
            Self::Empty
        } else {
            Self::Fields(set)
        }
    }

    /// Returns true if the mask contains no field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns true if the mask covers everything.
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Adds a field to the mask.
    pub fn insert(&mut self, field: impl Into<Arc<str>>) {
        match self {
            Self::All => {}
            Self::Empty => {
                let mut set = BTreeSet::new();
                set.insert(field.into());
                *self = Self::Fields(set);
            }
            Self::Fields(set) => {
                set.insert(field.into());
            }
        }
    }

    /// Widens the mask to cover everything.
    pub fn set_all(&mut self) {
        *self = Self::All;
    }

    /// Merges another mask into this one.
    pub fn union_with(&mut self, other: &Self) {
        match other {
            Self::Empty => {}
            Self::All => self.set_all(),
            Self::Fields(fields) => {
                for field in fields {
                    self.insert(field.clone());
                }
            }
        }
    }

    /// Returns true if the field is covered by this mask.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        match self {
            Self::Empty => false,
            Self::All => true,
            Self::Fields(set) => set.contains(field),
        }
    }

    /// Returns true if the two masks share at least one field.
    ///
    /// `All` intersects every non-empty mask.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, _) | (_, Self::Empty) => false,
            (Self::All, _) | (_, Self::All) => true,
            (Self::Fields(a), Self::Fields(b)) => a.iter().any(|f| b.contains(f)),
        }
    }
}

impl fmt::Display for PropertyMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "{{}}"),
            Self::All => write!(f, "{{*}}"),
            Self::Fields(set) => {
                write!(f, "{{")?;
                for (i, field) in set.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
