//! Session events and listeners.
//!
//! Every working memory change and agenda change is reported to the
//! session's listeners in the order it happened, which makes event logs a
//! convenient way to compare two runs.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use rulebook_engine::Activation;
use rulebook_foundation::{FactHandle, Value};

/// Something that happened in a session.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// A fact was inserted.
    Inserted {
        /// New handle.
        handle: FactHandle,
        /// Inserted fact.
        fact: Value,
    },
    /// A fact was replaced.
    Updated {
        /// Handle of the fact.
        handle: FactHandle,
        /// Previous value.
        old: Value,
        /// New value.
        new: Value,
    },
    /// A fact was retracted.
    Retracted {
        /// Handle of the fact.
        handle: FactHandle,
        /// Retracted fact.
        fact: Value,
    },
    /// An activation was queued.
    ActivationCreated(Activation),
    /// A queued activation was cancelled.
    ActivationCancelled(Activation),
    /// A consequence is about to run.
    BeforeFire(Activation),
    /// A consequence finished.
    AfterFire(Activation),
    /// A consequence printed a line.
    Output(String),
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inserted { handle, fact } => write!(f, "insert {handle} {fact}"),
            Self::Updated { handle, new, .. } => write!(f, "update {handle} {new}"),
            Self::Retracted { handle, .. } => write!(f, "retract {handle}"),
            Self::ActivationCreated(a) => write!(f, "create {a}"),
            Self::ActivationCancelled(a) => write!(f, "cancel {a}"),
            Self::BeforeFire(a) => write!(f, "fire {a}"),
            Self::AfterFire(a) => write!(f, "fired {a}"),
            Self::Output(line) => write!(f, "print {line}"),
        }
    }
}

/// Receives session events.
pub trait SessionListener: Send {
    /// Called once per event, synchronously.
    fn on_event(&mut self, event: &SessionEvent);
}

impl<F> SessionListener for F
where
    F: FnMut(&SessionEvent) + Send,
{
    fn on_event(&mut self, event: &SessionEvent) {
        self(event);
    }
}

/// A listener that keeps every event.
///
/// Clones share the same log, so one clone can be handed to the session and
/// the other kept for inspection.
#[derive(Clone, Debug, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl EventRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the recorded events rendered as lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(ToString::to_string).collect()
    }

    /// Forgets all recorded events.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl SessionListener for EventRecorder {
    fn on_event(&mut self, event: &SessionEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
