//! Immutable network structure.
//!
//! Alpha nodes live in an arena and are shared between rules: two patterns
//! with the same type and the same alpha tests map to one node, which counts
//! its users. Each enabled rule owns a chain of beta nodes, one per pattern,
//! ending in its terminal.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rulebook_foundation::PropertyMask;
use tracing::{debug, trace};

use crate::evaluator::{BuildMode, Evaluator};
use crate::ir;
use crate::resolve::ResolvedRule;

/// Index of an alpha node in the network arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlphaId(pub(crate) usize);

impl AlphaId {
    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Index of a rule in its knowledge base.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub(crate) usize);

impl RuleId {
    /// Creates a rule id from its index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A type filter plus single-fact tests.
#[derive(Debug)]
pub struct AlphaNode {
    pub(crate) type_name: Arc<str>,
    pub(crate) constraints: Vec<Evaluator>,
    pub(crate) refcount: usize,
    /// Beta nodes fed by this node, as (rule, pattern position).
    pub(crate) successors: Vec<(RuleId, usize)>,
    key: AlphaKey,
}

impl AlphaNode {
    /// Returns the fact type this node filters on.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the number of patterns using this node.
    #[must_use]
    pub const fn refcount(&self) -> usize {
        self.refcount
    }
}

type AlphaKey = (Arc<str>, Vec<ir::Expr>);

/// Hash join index of a beta node.
#[derive(Debug)]
pub struct JoinIndex {
    /// Key expressions over the tested fact.
    pub(crate) right: Vec<Evaluator>,
    /// Key expressions over the partial match.
    pub(crate) left: Vec<Evaluator>,
}

/// Joins partial matches of the preceding patterns with one alpha memory.
#[derive(Debug)]
pub struct BetaNode {
    pub(crate) alpha: AlphaId,
    pub(crate) tests: Vec<Evaluator>,
    pub(crate) index: Option<JoinIndex>,
    pub(crate) watch: PropertyMask,
    pub(crate) allow_same_fact: bool,
}

/// The beta chain and terminal of one rule.
#[derive(Debug)]
pub struct RuleNetwork {
    pub(crate) name: Arc<str>,
    pub(crate) salience: i32,
    pub(crate) no_loop: bool,
    pub(crate) nodes: Vec<BetaNode>,
}

impl RuleNetwork {
    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of patterns in the rule.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true for a rule without patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// The compiled matching network of a knowledge base.
#[derive(Debug, Default)]
pub struct NetworkSpec {
    alphas: Vec<Option<AlphaNode>>,
    shared: HashMap<AlphaKey, AlphaId>,
    rules: Vec<Option<RuleNetwork>>,
}

impl NetworkSpec {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wires a rule into the network under `id`.
    ///
    /// Disabled rules reserve their id but get no nodes.
    pub fn add_rule(&mut self, id: RuleId, rule: &ResolvedRule, mode: BuildMode) {
        if self.rules.len() <= id.0 {
            self.rules.resize_with(id.0 + 1, || None);
        }
        if !rule.enabled {
            debug!(rule = %rule.name, "rule disabled, not wired");
            return;
        }
        let lower = |exprs: &[ir::Expr]| -> Vec<Evaluator> {
            exprs.iter().map(|e| Evaluator::lower(e, mode)).collect()
        };
        let mut nodes = Vec::with_capacity(rule.patterns.len());
        for (position, pattern) in rule.patterns.iter().enumerate() {
            let alpha = self.share_alpha(&pattern.type_name, &pattern.alpha, mode);
            if let Some(node) = self.alphas[alpha.0].as_mut() {
                node.refcount += 1;
                node.successors.push((id, position));
            }
            let index = (!pattern.index.is_empty()).then(|| {
                let (right, left): (Vec<_>, Vec<_>) = pattern.index.iter().cloned().unzip();
                JoinIndex {
                    right: lower(&right),
                    left: lower(&left),
                }
            });
            nodes.push(BetaNode {
                alpha,
                tests: lower(&pattern.joins),
                index,
                watch: pattern.watch.clone(),
                allow_same_fact: pattern.allow_same_fact,
            });
        }
        debug!(rule = %rule.name, %id, patterns = nodes.len(), "rule wired");
        self.rules[id.0] = Some(RuleNetwork {
            name: rule.name.clone(),
            salience: rule.salience,
            no_loop: rule.no_loop,
            nodes,
        });
    }

    fn share_alpha(&mut self, type_name: &Arc<str>, alpha: &[ir::Expr], mode: BuildMode) -> AlphaId {
        let key: AlphaKey = (type_name.clone(), alpha.to_vec());
        if let Some(id) = self.shared.get(&key) {
            trace!(alpha = id.0, "sharing alpha node");
            return *id;
        }
        let node = AlphaNode {
            type_name: type_name.clone(),
            constraints: alpha.iter().map(|e| Evaluator::lower(e, mode)).collect(),
            refcount: 0,
            successors: Vec::new(),
            key: key.clone(),
        };
        let id = match self.alphas.iter().position(Option::is_none) {
            Some(free) => {
                self.alphas[free] = Some(node);
                AlphaId(free)
            }
            None => {
                self.alphas.push(Some(node));
                AlphaId(self.alphas.len() - 1)
            }
        };
        self.shared.insert(key, id);
        id
    }

    /// Unwires a rule, freeing alpha nodes no other rule uses.
    ///
    /// Returns false if the rule was not wired.
    pub fn remove_rule(&mut self, id: RuleId) -> bool {
        let Some(rule) = self.rules.get_mut(id.0).and_then(Option::take) else {
            return false;
        };
        for beta in &rule.nodes {
            let Some(slot) = self.alphas.get_mut(beta.alpha.0) else {
                continue;
            };
            let freed = match slot.as_mut() {
                Some(node) => {
                    node.refcount = node.refcount.saturating_sub(1);
                    node.successors.retain(|(r, _)| *r != id);
                    node.refcount == 0
                }
                None => false,
            };
            if freed {
                if let Some(node) = slot.take() {
                    self.shared.remove(&node.key);
                    trace!(alpha = beta.alpha.0, "alpha node freed");
                }
            }
        }
        debug!(rule = %rule.name, "rule unwired");
        true
    }

    /// Returns the alpha node with the given id, if live.
    #[must_use]
    pub fn alpha(&self, id: AlphaId) -> Option<&AlphaNode> {
        self.alphas.get(id.0).and_then(Option::as_ref)
    }

    /// Iterates over live alpha nodes.
    pub fn alphas(&self) -> impl Iterator<Item = (AlphaId, &AlphaNode)> {
        self.alphas
            .iter()
            .enumerate()
            .filter_map(|(i, node)| node.as_ref().map(|node| (AlphaId(i), node)))
    }

    /// Returns the size of the alpha arena, free slots included.
    #[must_use]
    pub fn alpha_capacity(&self) -> usize {
        self.alphas.len()
    }

    /// Returns the network of a wired rule.
    #[must_use]
    pub fn rule(&self, id: RuleId) -> Option<&RuleNetwork> {
        self.rules.get(id.0).and_then(Option::as_ref)
    }

    /// Iterates over wired rules.
    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &RuleNetwork)> {
        self.rules
            .iter()
            .enumerate()
            .filter_map(|(i, rule)| rule.as_ref().map(|rule| (RuleId(i), rule)))
    }

    /// Returns the number of rule slots, unwired ones included.
    #[must_use]
    pub fn rule_capacity(&self) -> usize {
        self.rules.len()
    }
}
