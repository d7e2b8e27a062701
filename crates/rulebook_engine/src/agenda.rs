//! The agenda: activations waiting to fire.
//!
//! Activations fire by salience, highest first, then by creation order. An
//! activation is identified by its rule and token; adding the same match twice
//! is a no-op, and cancelling removes it eagerly.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::network::{RuleId, Token};

type Priority = (Reverse<i32>, u64);

/// A complete match of a rule, ready to fire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Activation {
    /// Rule to fire.
    pub rule: RuleId,
    /// Rule name.
    pub rule_name: Arc<str>,
    /// Matched facts, by pattern position.
    pub token: Token,
    /// Rule salience.
    pub salience: i32,
    /// Creation order.
    pub sequence: u64,
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rule_name, self.token)
    }
}

/// An agenda change, reported to session listeners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgendaEvent {
    /// An activation was queued.
    Created(Activation),
    /// A queued activation was invalidated before firing.
    Cancelled(Activation),
}

/// Ordered queue of activations.
#[derive(Clone, Debug, Default)]
pub struct Agenda {
    queue: BTreeMap<Priority, Activation>,
    by_match: HashMap<(RuleId, Token), Priority>,
    next_sequence: u64,
    firing: Option<RuleId>,
    cancelled: u64,
    events: Vec<AgendaEvent>,
}

impl Agenda {
    /// Creates an empty agenda.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an activation. Returns false if the match is already queued,
    /// or if `no_loop` is set and the rule is the one currently firing.
    pub fn add(
        &mut self,
        rule: RuleId,
        rule_name: &Arc<str>,
        salience: i32,
        no_loop: bool,
        token: Token,
    ) -> bool {
        if no_loop && self.firing == Some(rule) {
            trace!(rule = %rule_name, %token, "no-loop suppressed activation");
            return false;
        }
        let key = (rule, token);
        if self.by_match.contains_key(&key) {
            return false;
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let priority = (Reverse(salience), sequence);
        let activation = Activation {
            rule,
            rule_name: rule_name.clone(),
            token: key.1.clone(),
            salience,
            sequence,
        };
        trace!(%activation, salience, sequence, "activation created");
        self.by_match.insert(key, priority);
        self.events.push(AgendaEvent::Created(activation.clone()));
        self.queue.insert(priority, activation);
        true
    }

    /// Removes a queued activation. Returns false if it was not queued.
    pub fn cancel(&mut self, rule: RuleId, token: &Token) -> bool {
        let Some(priority) = self.by_match.remove(&(rule, token.clone())) else {
            return false;
        };
        let Some(activation) = self.queue.remove(&priority) else {
            return false;
        };
        trace!(%activation, "activation cancelled");
        self.cancelled += 1;
        self.events.push(AgendaEvent::Cancelled(activation));
        true
    }

    /// Removes and returns the next activation to fire.
    pub fn pop(&mut self) -> Option<Activation> {
        let (_, activation) = self.queue.pop_first()?;
        self.by_match
            .remove(&(activation.rule, activation.token.clone()));
        Some(activation)
    }

    /// Returns the next activation without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&Activation> {
        self.queue.values().next()
    }

    /// Iterates over queued activations in firing order.
    pub fn iter(&self) -> impl Iterator<Item = &Activation> {
        self.queue.values()
    }

    /// Returns the number of queued activations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns how many activations have been cancelled so far.
    #[must_use]
    pub const fn cancelled_count(&self) -> u64 {
        self.cancelled
    }

    /// Marks the rule whose consequence is running.
    pub fn set_firing(&mut self, rule: Option<RuleId>) {
        self.firing = rule;
    }

    /// Takes the events recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<AgendaEvent> {
        std::mem::take(&mut self.events)
    }
}
