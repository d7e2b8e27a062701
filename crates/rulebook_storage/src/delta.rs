//! Change records emitted by the fact store.

use rulebook_foundation::{FactHandle, PropertyMask, Value};

/// A single change to working memory.
///
/// The matching network consumes deltas to update its memories; the session
/// forwards them to listeners.
#[derive(Clone, Debug, PartialEq)]
pub enum Delta {
    /// A fact was added.
    Insert {
        /// Handle of the new fact.
        handle: FactHandle,
        /// The fact.
        fact: Value,
    },
    /// A fact was replaced.
    Update {
        /// Handle of the fact.
        handle: FactHandle,
        /// Value before the update.
        old: Value,
        /// Value after the update.
        new: Value,
        /// Fields the update touched.
        mask: PropertyMask,
    },
    /// A fact was removed.
    Retract {
        /// Handle of the removed fact.
        handle: FactHandle,
        /// The fact as it was when removed.
        fact: Value,
    },
}

impl Delta {
    /// Returns the handle this delta concerns.
    #[must_use]
    pub fn handle(&self) -> FactHandle {
        match self {
            Self::Insert { handle, .. }
            | Self::Update { handle, .. }
            | Self::Retract { handle, .. } => *handle,
        }
    }

    /// Returns the fact value after the change, if the fact still exists.
    #[must_use]
    pub fn current(&self) -> Option<&Value> {
        match self {
            Self::Insert { fact, .. } => Some(fact),
            Self::Update { new, .. } => Some(new),
            Self::Retract { .. } => None,
        }
    }
}
