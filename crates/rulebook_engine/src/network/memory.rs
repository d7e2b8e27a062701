//! Per-session network state.
//!
//! Everything that changes while facts flow through the network lives here,
//! so a [`NetworkSpec`] can be shared between sessions. All memories that are
//! iterated during propagation are ordered sets; hash maps are used only for
//! lookups.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use rulebook_foundation::{Error, FactHandle, Value};
use tracing::warn;

use super::node::{AlphaId, NetworkSpec, RuleId};
use super::token::Token;

/// Join index state of one beta node.
#[derive(Clone, Debug, Default)]
pub(crate) struct NodeMemory {
    pub(crate) left_index: HashMap<Vec<Value>, BTreeSet<Token>>,
    pub(crate) left_keys: HashMap<Token, Vec<Value>>,
    pub(crate) right_index: HashMap<Vec<Value>, BTreeSet<FactHandle>>,
    pub(crate) right_keys: HashMap<FactHandle, Vec<Value>>,
}

/// Partial matches of one rule.
#[derive(Clone, Debug, Default)]
pub(crate) struct RuleMemory {
    /// `levels[k]` holds the tokens matching the first `k` patterns.
    pub(crate) levels: Vec<BTreeSet<Token>>,
    /// Tokens binding each handle, at any position.
    pub(crate) by_handle: HashMap<FactHandle, BTreeSet<Token>>,
    pub(crate) nodes: Vec<NodeMemory>,
}

/// Sizes of a session's network memories.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Facts held across all alpha memories.
    pub alpha_facts: usize,
    /// Partial and complete matches across all rules.
    pub tokens: usize,
    /// Entries across all join indexes.
    pub indexed: usize,
}

/// Mutable network state of one session.
#[derive(Clone, Debug)]
pub struct NetworkMemory {
    pub(crate) alpha: Vec<BTreeSet<FactHandle>>,
    pub(crate) rules: Vec<RuleMemory>,
    pub(crate) type_cache: HashMap<Arc<str>, Arc<[AlphaId]>>,
    pub(crate) error: Option<Error>,
}

impl NetworkMemory {
    /// Creates empty memories shaped for `spec`.
    #[must_use]
    pub fn new(spec: &NetworkSpec) -> Self {
        let mut rules: Vec<RuleMemory> = (0..spec.rule_capacity())
            .map(|_| RuleMemory::default())
            .collect();
        for (id, rule) in spec.rules() {
            let memory = &mut rules[id.index()];
            memory.levels = vec![BTreeSet::new(); rule.len() + 1];
            memory.nodes = (0..rule.len()).map(|_| NodeMemory::default()).collect();
        }
        Self {
            alpha: vec![BTreeSet::new(); spec.alpha_capacity()],
            rules,
            type_cache: HashMap::new(),
            error: None,
        }
    }

    /// Returns the facts held by an alpha memory, in handle order.
    pub fn alpha_memory(&self, id: AlphaId) -> impl Iterator<Item = FactHandle> + '_ {
        self.alpha.get(id.index()).into_iter().flatten().copied()
    }

    /// Returns the tokens of a rule that match its first `level` patterns.
    pub fn partial_matches(&self, rule: RuleId, level: usize) -> impl Iterator<Item = &Token> {
        self.rules
            .get(rule.index())
            .and_then(|memory| memory.levels.get(level))
            .into_iter()
            .flatten()
    }

    /// Returns the sizes of all memories.
    #[must_use]
    pub fn stats(&self) -> MemoryStats {
        let mut stats = MemoryStats {
            alpha_facts: self.alpha.iter().map(BTreeSet::len).sum(),
            ..MemoryStats::default()
        };
        for rule in &self.rules {
            stats.tokens += rule.levels.iter().map(BTreeSet::len).sum::<usize>();
            for node in &rule.nodes {
                stats.indexed += node.left_keys.len() + node.right_keys.len();
            }
        }
        stats
    }

    pub(crate) fn record(&mut self, error: Error) {
        warn!(%error, "constraint evaluation failed, treating as no match");
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub(crate) fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }
}
