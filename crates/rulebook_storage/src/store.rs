//! Fact storage with immutable snapshots.
//!
//! The `FactStore` keeps every live fact keyed by its handle in a persistent
//! ordered map. Because handles are allocated monotonically, iteration order
//! is insertion order, and cloning the map for a snapshot is O(1).

use rulebook_foundation::{Error, FactHandle, PropertyMask, Result, Value};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::delta::Delta;
use crate::filter::ObjectFilter;

/// An immutable view of working memory at a point in time.
pub type Snapshot = im::OrdMap<FactHandle, Value>;

/// Working memory contents.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FactStore {
    facts: im::OrdMap<FactHandle, Value>,
    next_id: u64,
}

impl FactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fact under a freshly allocated handle.
    pub fn insert(&mut self, fact: Value) -> (FactHandle, Delta) {
        self.next_id += 1;
        let handle = FactHandle::new(self.next_id);
        self.facts.insert(handle, fact.clone());
        (handle, Delta::Insert { handle, fact })
    }

    /// Replaces the fact behind `handle`.
    ///
    /// `mask` names the changed fields. `None` marks every field as changed,
    /// so the update matches like a retraction followed by an insertion.
    ///
    /// # Errors
    /// Returns `UnknownHandle` if the handle is not live.
    pub fn update(
        &mut self,
        handle: FactHandle,
        fact: Value,
        mask: Option<PropertyMask>,
    ) -> Result<Delta> {
        let old = self
            .facts
            .get(&handle)
            .cloned()
            .ok_or_else(|| Error::unknown_handle(handle))?;
        let mask = mask.unwrap_or_else(PropertyMask::all);
        self.facts.insert(handle, fact.clone());
        Ok(Delta::Update {
            handle,
            old,
            new: fact,
            mask,
        })
    }

    /// Removes the fact behind `handle`.
    ///
    /// # Errors
    /// Returns `UnknownHandle` if the handle is not live.
    pub fn retract(&mut self, handle: FactHandle) -> Result<Delta> {
        let fact = self
            .facts
            .remove(&handle)
            .ok_or_else(|| Error::unknown_handle(handle))?;
        Ok(Delta::Retract { handle, fact })
    }

    /// Returns the fact behind `handle`.
    #[must_use]
    pub fn get(&self, handle: FactHandle) -> Option<&Value> {
        self.facts.get(&handle)
    }

    /// Returns true if the handle is live.
    #[must_use]
    pub fn contains(&self, handle: FactHandle) -> bool {
        self.facts.contains_key(&handle)
    }

    /// Returns the number of live facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Returns true if there are no live facts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Iterates over live facts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (FactHandle, &Value)> {
        self.facts.iter().map(|(h, v)| (*h, v))
    }

    /// Returns an immutable snapshot of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.facts.clone()
    }

    /// Returns the facts accepted by `filter`, in insertion order.
    pub fn query<'a>(
        &'a self,
        filter: &'a ObjectFilter,
    ) -> impl Iterator<Item = (FactHandle, &'a Value)> + 'a {
        self.iter().filter(move |(_, v)| filter.accepts(v))
    }
}
