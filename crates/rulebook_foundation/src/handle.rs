//! Fact handles.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable identity of a fact in working memory.
///
/// Handles are allocated from a monotonically increasing counter and are
/// never reused, so a handle that has been retracted can never become live
/// again. Ordering follows allocation order, which is also insertion order.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FactHandle(u64);

impl FactHandle {
    /// Creates a handle from its raw id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id of this handle.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for FactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FactHandle({})", self.0)
    }
}

impl fmt::Display for FactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_order_by_allocation() {
        let a = FactHandle::new(1);
        let b = FactHandle::new(2);
        assert!(a < b);
        assert_eq!(a, FactHandle::new(1));
    }

    #[test]
    fn handle_display() {
        assert_eq!(format!("{}", FactHandle::new(7)), "#7");
        assert_eq!(format!("{:?}", FactHandle::new(7)), "FactHandle(7)");
    }
}
