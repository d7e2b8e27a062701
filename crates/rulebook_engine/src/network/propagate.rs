//! Delta propagation.
//!
//! A [`Propagator`] pushes one working memory change through the network:
//! alpha memories first, then right activations of the affected beta nodes,
//! which extend partial matches until they reach the terminal and become
//! activations. Removals cascade through the tokens that bound the fact.

use std::collections::BTreeSet;
use std::sync::Arc;

use rulebook_foundation::{FactHandle, PropertyMask, Result, TypeRegistry, Value};
use rulebook_storage::{Delta, FactStore};
use tracing::trace;

use super::memory::NetworkMemory;
use super::node::{AlphaId, BetaNode, NetworkSpec, RuleId};
use super::token::Token;
use crate::agenda::Agenda;
use crate::evaluator::{Evaluator, Frame};

/// Applies working memory changes to one session's network state.
pub struct Propagator<'a> {
    spec: &'a NetworkSpec,
    memory: &'a mut NetworkMemory,
    agenda: &'a mut Agenda,
    store: &'a FactStore,
    registry: &'a TypeRegistry,
    property_reactive: bool,
}

impl<'a> Propagator<'a> {
    /// Creates a propagator. `store` must already reflect the change being
    /// applied.
    pub fn new(
        spec: &'a NetworkSpec,
        memory: &'a mut NetworkMemory,
        agenda: &'a mut Agenda,
        store: &'a FactStore,
        registry: &'a TypeRegistry,
    ) -> Self {
        Self {
            spec,
            memory,
            agenda,
            store,
            registry,
            property_reactive: true,
        }
    }

    /// Sets whether updates that touch no watched field may skip
    /// re-propagation.
    #[must_use]
    pub const fn property_reactive(mut self, enabled: bool) -> Self {
        self.property_reactive = enabled;
        self
    }

    /// Seeds every rule with the empty token. Rules without patterns become
    /// activations immediately.
    pub fn seed(&mut self) {
        let spec = self.spec;
        for (rule, _) in spec.rules() {
            self.insert_token(rule, Token::empty());
        }
    }

    /// Propagates one change.
    ///
    /// # Errors
    /// Returns the first constraint evaluation error. Failing tests count as
    /// no match and propagation still runs to completion.
    pub fn apply(&mut self, delta: &Delta) -> Result<()> {
        match delta {
            Delta::Insert { handle, fact } => self.assert_fact(*handle, fact),
            Delta::Retract { handle, fact } => self.retract_fact(*handle, fact),
            Delta::Update {
                handle,
                old,
                new,
                mask,
            } => self.update_fact(*handle, old, new, mask),
        }
        match self.memory.take_error() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn alphas_for(&mut self, type_name: &str) -> Arc<[AlphaId]> {
        if let Some(ids) = self.memory.type_cache.get(type_name) {
            return ids.clone();
        }
        let (spec, registry) = (self.spec, self.registry);
        let ids: Arc<[AlphaId]> = spec
            .alphas()
            .filter(|(_, node)| registry.is_assignable(type_name, node.type_name()))
            .map(|(id, _)| id)
            .collect();
        self.memory.type_cache.insert(type_name.into(), ids.clone());
        ids
    }

    fn alpha_matches(&mut self, id: AlphaId, fact: &Value) -> bool {
        let spec = self.spec;
        let Some(node) = spec.alpha(id) else {
            return false;
        };
        let frame = Frame::alpha(fact);
        node.constraints.iter().all(|c| self.check(c, &frame))
    }

    fn check(&mut self, test: &Evaluator, frame: &Frame<'_>) -> bool {
        match test.test(frame) {
            Ok(passed) => passed,
            Err(error) => {
                self.memory.record(error);
                false
            }
        }
    }

    fn keys(&mut self, evals: &[Evaluator], frame: &Frame<'_>) -> Option<Vec<Value>> {
        let mut key = Vec::with_capacity(evals.len());
        for eval in evals {
            match eval.eval(frame) {
                Ok(value) => key.push(value.index_key()),
                Err(error) => {
                    self.memory.record(error);
                    return None;
                }
            }
        }
        Some(key)
    }

    fn node(&self, rule: RuleId, position: usize) -> Option<&'a BetaNode> {
        let spec = self.spec;
        spec.rule(rule).and_then(|net| net.nodes.get(position))
    }

    fn token_facts(&self, token: &Token) -> Option<Vec<Value>> {
        token
            .handles()
            .iter()
            .map(|h| self.store.get(*h).cloned())
            .collect()
    }

    // -------------------------------------------------------------------------
    // Assertion
    // -------------------------------------------------------------------------

    fn assert_fact(&mut self, handle: FactHandle, fact: &Value) {
        trace!(%handle, "assert");
        let mut matched = Vec::new();
        for &id in self.alphas_for(fact.type_name()).iter() {
            if self.alpha_matches(id, fact) {
                self.memory.alpha[id.index()].insert(handle);
                matched.push(id);
            }
        }
        for id in matched {
            self.activate_successors(id, handle, fact);
        }
    }

    fn activate_successors(&mut self, id: AlphaId, handle: FactHandle, fact: &Value) {
        let spec = self.spec;
        let Some(node) = spec.alpha(id) else { return };
        for &(rule, position) in &node.successors {
            self.right_activate(rule, position, handle, fact);
        }
    }

    fn right_activate(&mut self, rule: RuleId, position: usize, handle: FactHandle, fact: &Value) {
        let Some(node) = self.node(rule, position) else {
            return;
        };
        let key = match &node.index {
            Some(index) => match self.keys(&index.right, &Frame::alpha(fact)) {
                Some(key) => Some(key),
                None => return,
            },
            None => None,
        };
        let memory = &mut self.memory.rules[rule.index()];
        let candidates: Vec<Token> = match key {
            Some(key) => {
                let slot = &mut memory.nodes[position];
                slot.right_index.entry(key.clone()).or_default().insert(handle);
                let candidates = slot
                    .left_index
                    .get(&key)
                    .map(|tokens| tokens.iter().cloned().collect())
                    .unwrap_or_default();
                slot.right_keys.insert(handle, key);
                candidates
            }
            None => memory.levels[position].iter().cloned().collect(),
        };
        for token in candidates {
            if self.joins(node, &token, handle, fact) {
                self.insert_token(rule, token.extend(handle));
            }
        }
    }

    fn left_activate(&mut self, rule: RuleId, position: usize, token: &Token) {
        let Some(node) = self.node(rule, position) else {
            return;
        };
        let key = match &node.index {
            Some(index) => {
                let Some(facts) = self.token_facts(token) else {
                    return;
                };
                match self.keys(&index.left, &Frame::facts(&facts)) {
                    Some(key) => Some(key),
                    None => return,
                }
            }
            None => None,
        };
        let candidates: Vec<FactHandle> = match key {
            Some(key) => {
                let slot = &mut self.memory.rules[rule.index()].nodes[position];
                slot.left_index.entry(key.clone()).or_default().insert(token.clone());
                let candidates = slot
                    .right_index
                    .get(&key)
                    .map(|handles| handles.iter().copied().collect())
                    .unwrap_or_default();
                slot.left_keys.insert(token.clone(), key);
                candidates
            }
            None => self.memory.alpha[node.alpha.index()].iter().copied().collect(),
        };
        let store = self.store;
        for handle in candidates {
            let Some(fact) = store.get(handle) else {
                continue;
            };
            if self.joins(node, token, handle, fact) {
                self.insert_token(rule, token.extend(handle));
            }
        }
    }

    fn joins(&mut self, node: &BetaNode, token: &Token, handle: FactHandle, fact: &Value) -> bool {
        if !node.allow_same_fact && token.contains(handle) {
            return false;
        }
        if node.tests.is_empty() {
            return true;
        }
        let Some(facts) = self.token_facts(token) else {
            return false;
        };
        let frame = Frame::join(fact, &facts);
        node.tests.iter().all(|test| self.check(test, &frame))
    }

    fn insert_token(&mut self, rule: RuleId, token: Token) {
        let spec = self.spec;
        let Some(net) = spec.rule(rule) else { return };
        let level = token.len();
        let memory = &mut self.memory.rules[rule.index()];
        if !memory.levels[level].insert(token.clone()) {
            return;
        }
        for &handle in token.handles() {
            memory
                .by_handle
                .entry(handle)
                .or_default()
                .insert(token.clone());
        }
        if level == net.len() {
            self.agenda
                .add(rule, &net.name, net.salience, net.no_loop, token);
        } else {
            self.left_activate(rule, level, &token);
        }
    }

    // -------------------------------------------------------------------------
    // Retraction
    // -------------------------------------------------------------------------

    fn retract_fact(&mut self, handle: FactHandle, fact: &Value) {
        trace!(%handle, "retract");
        for &id in self.alphas_for(fact.type_name()).iter() {
            if self.memory.alpha[id.index()].remove(&handle) {
                self.deactivate_successors(id, handle);
            }
        }
    }

    fn deactivate_successors(&mut self, id: AlphaId, handle: FactHandle) {
        let spec = self.spec;
        let Some(node) = spec.alpha(id) else { return };
        for &(rule, position) in &node.successors {
            self.right_deactivate(rule, position, handle);
        }
    }

    fn right_deactivate(&mut self, rule: RuleId, position: usize, handle: FactHandle) {
        let memory = &mut self.memory.rules[rule.index()];
        let slot = &mut memory.nodes[position];
        if let Some(key) = slot.right_keys.remove(&handle) {
            if let Some(handles) = slot.right_index.get_mut(&key) {
                handles.remove(&handle);
                if handles.is_empty() {
                    slot.right_index.remove(&key);
                }
            }
        }
        let doomed: Vec<Token> = memory
            .by_handle
            .get(&handle)
            .map(|tokens| {
                tokens
                    .iter()
                    .filter(|t| t.get(position) == Some(handle))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        for token in doomed {
            self.remove_token(rule, &token);
        }
    }

    fn remove_token(&mut self, rule: RuleId, token: &Token) {
        let spec = self.spec;
        let Some(net) = spec.rule(rule) else { return };
        let level = token.len();
        let memory = &mut self.memory.rules[rule.index()];
        if !memory.levels[level].remove(token) {
            return;
        }
        for handle in token.handles() {
            if let Some(tokens) = memory.by_handle.get_mut(handle) {
                tokens.remove(token);
                if tokens.is_empty() {
                    memory.by_handle.remove(handle);
                }
            }
        }
        if level == net.len() {
            self.agenda.cancel(rule, token);
            return;
        }
        let slot = &mut memory.nodes[level];
        if let Some(key) = slot.left_keys.remove(token) {
            if let Some(tokens) = slot.left_index.get_mut(&key) {
                tokens.remove(token);
                if tokens.is_empty() {
                    slot.left_index.remove(&key);
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Update
    // -------------------------------------------------------------------------

    fn update_fact(&mut self, handle: FactHandle, old: &Value, new: &Value, mask: &PropertyMask) {
        let type_changed = old.type_name() != new.type_name();
        let all = PropertyMask::all();
        let mask = if type_changed { &all } else { mask };
        trace!(%handle, %mask, "update");
        let new_alphas = self.alphas_for(new.type_name());
        let mut candidates: BTreeSet<AlphaId> = new_alphas.iter().copied().collect();
        if type_changed {
            candidates.extend(self.alphas_for(old.type_name()).iter().copied());
        }

        // Deletions propagate completely before any insertion.
        let mut added = Vec::new();
        let mut repropagate = Vec::new();
        for id in candidates {
            let was = self.memory.alpha[id.index()].contains(&handle);
            let now = new_alphas.contains(&id) && self.alpha_matches(id, new);
            match (was, now) {
                (true, false) => {
                    self.memory.alpha[id.index()].remove(&handle);
                    self.deactivate_successors(id, handle);
                }
                (false, true) => added.push(id),
                (true, true) => self.refresh_successors(id, handle, mask, &mut repropagate),
                (false, false) => {}
            }
        }

        for &id in &added {
            self.memory.alpha[id.index()].insert(handle);
        }
        for (rule, position) in repropagate {
            self.right_activate(rule, position, handle, new);
        }
        for id in added {
            self.activate_successors(id, handle, new);
        }
    }

    /// Retracts the fact from every successor that watches a changed field,
    /// remembering it for re-assertion. A full mask refreshes every
    /// successor, including patterns that watch nothing.
    fn refresh_successors(
        &mut self,
        id: AlphaId,
        handle: FactHandle,
        mask: &PropertyMask,
        repropagate: &mut Vec<(RuleId, usize)>,
    ) {
        let spec = self.spec;
        let Some(node) = spec.alpha(id) else { return };
        for &(rule, position) in &node.successors {
            let Some(beta) = self.node(rule, position) else {
                continue;
            };
            if self.property_reactive && !mask.is_all() && !mask.intersects(&beta.watch) {
                trace!(%handle, %rule, position, "update skipped, no watched field changed");
                continue;
            }
            self.right_deactivate(rule, position, handle);
            repropagate.push((rule, position));
        }
    }
}

impl std::fmt::Debug for Propagator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Propagator")
            .field("property_reactive", &self.property_reactive)
            .finish_non_exhaustive()
    }
}
