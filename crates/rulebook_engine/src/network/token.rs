//! Partial matches.

use std::fmt;
use std::sync::Arc;

use rulebook_foundation::FactHandle;

/// The facts matched by a rule's leading patterns, by position.
///
/// A token of length `n` for an `n`-pattern rule is a complete match.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(Arc<[FactHandle]>);

impl Token {
    /// The empty token that seeds every rule.
    #[must_use]
    pub fn empty() -> Self {
        Self(Arc::from([]))
    }

    /// Returns a token with `handle` appended.
    #[must_use]
    pub fn extend(&self, handle: FactHandle) -> Self {
        let mut handles = Vec::with_capacity(self.0.len() + 1);
        handles.extend_from_slice(&self.0);
        handles.push(handle);
        Self(handles.into())
    }

    /// Returns the matched handles in pattern order.
    #[must_use]
    pub fn handles(&self) -> &[FactHandle] {
        &self.0
    }

    /// Returns the handle at a pattern position.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<FactHandle> {
        self.0.get(position).copied()
    }

    /// Returns the number of matched patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for the empty token.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if the token binds `handle` at any position.
    #[must_use]
    pub fn contains(&self, handle: FactHandle) -> bool {
        self.0.contains(&handle)
    }
}

impl From<Vec<FactHandle>> for Token {
    fn from(handles: Vec<FactHandle>) -> Self {
        Self(handles.into())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, handle) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{handle}")?;
        }
        write!(f, "]")
    }
}
