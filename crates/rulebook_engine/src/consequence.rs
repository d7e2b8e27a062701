//! Consequence execution.
//!
//! A consequence runs against copies of its activation's facts, one per
//! handle even when several patterns bind the same fact. Reads see the
//! copies; `modify`, `update`, `insert` and `retract` are routed back to the
//! owning session through [`WorkingMemoryActions`], which propagates each
//! mutation completely before returning.

use rulebook_foundation::{Error, FactHandle, PropertyMask, Result, Value};
use rulebook_language::Dialect;
use tracing::trace;

use crate::evaluator::{Action, Frame};
use crate::ir::FieldAssign;
use crate::ops;

/// Working memory operations available to a running consequence.
pub trait WorkingMemoryActions {
    /// Inserts a new fact.
    ///
    /// # Errors
    /// Returns the first constraint evaluation error raised while propagating.
    fn insert(&mut self, fact: Value) -> Result<FactHandle>;

    /// Replaces a fact. `mask` names the changed fields; `None` means every
    /// field changed.
    ///
    /// # Errors
    /// Returns `UnknownHandle` if the handle is not live.
    fn update(&mut self, handle: FactHandle, fact: Value, mask: Option<PropertyMask>)
        -> Result<()>;

    /// Retracts a fact.
    ///
    /// # Errors
    /// Returns `UnknownHandle` if the handle is not live.
    fn retract(&mut self, handle: FactHandle) -> Result<()>;

    /// Emits one line of consequence output.
    fn print(&mut self, line: String);
}

/// State of one consequence execution.
pub struct ConsequenceContext<'a> {
    handles: &'a [FactHandle],
    facts: Vec<Value>,
    locals: Vec<Value>,
    actions: &'a mut dyn WorkingMemoryActions,
}

impl<'a> ConsequenceContext<'a> {
    /// Creates a context over an activation's handles and fact copies.
    pub fn new(
        handles: &'a [FactHandle],
        facts: Vec<Value>,
        locals: usize,
        actions: &'a mut dyn WorkingMemoryActions,
    ) -> Self {
        Self {
            handles,
            facts,
            locals: vec![Value::Nil; locals],
            actions,
        }
    }

    /// Returns the evaluation frame for the current state.
    #[must_use]
    pub fn frame(&self) -> Frame<'_> {
        Frame {
            this: None,
            facts: &self.facts,
            locals: &self.locals,
        }
    }

    /// Returns the consequence's copy of a matched fact.
    #[must_use]
    pub fn fact(&self, pattern: usize) -> Option<&Value> {
        self.facts.get(pattern)
    }

    pub(crate) fn set_local(&mut self, slot: usize, value: Value) {
        if slot >= self.locals.len() {
            self.locals.resize(slot + 1, Value::Nil);
        }
        self.locals[slot] = value;
    }

    pub(crate) fn assign_local_field(
        &mut self,
        slot: usize,
        assign: &FieldAssign,
        value: Value,
    ) -> Result<()> {
        let target = self
            .locals
            .get_mut(slot)
            .ok_or_else(|| Error::internal(format!("no local in slot {slot}")))?;
        *target = ops::assign(target, assign, value)?;
        Ok(())
    }

    pub(crate) fn assign_fact_field(
        &mut self,
        pattern: usize,
        assign: &FieldAssign,
        value: Value,
    ) -> Result<()> {
        let handle = self.handle(pattern)?;
        let updated = ops::assign(&self.current(pattern)?, assign, value)?;
        // One fact bound to several patterns shares a single logical copy.
        for (fact, bound) in self.facts.iter_mut().zip(self.handles) {
            if *bound == handle {
                *fact = updated.clone();
            }
        }
        Ok(())
    }

    fn handle(&self, pattern: usize) -> Result<FactHandle> {
        self.handles
            .get(pattern)
            .copied()
            .ok_or_else(|| Error::internal(format!("no handle at position {pattern}")))
    }

    fn current(&self, pattern: usize) -> Result<Value> {
        self.facts
            .get(pattern)
            .cloned()
            .ok_or_else(|| Error::internal(format!("no fact at position {pattern}")))
    }

    pub(crate) fn insert(&mut self, fact: Value) -> Result<()> {
        let handle = self.actions.insert(fact)?;
        trace!(%handle, "consequence inserted fact");
        Ok(())
    }

    pub(crate) fn update(&mut self, pattern: usize) -> Result<()> {
        let (handle, fact) = (self.handle(pattern)?, self.current(pattern)?);
        self.actions.update(handle, fact, None)
    }

    pub(crate) fn commit_modify(&mut self, pattern: usize, mask: PropertyMask) -> Result<()> {
        let (handle, fact) = (self.handle(pattern)?, self.current(pattern)?);
        trace!(%handle, %mask, "consequence modified fact");
        self.actions.update(handle, fact, Some(mask))
    }

    pub(crate) fn retract(&mut self, pattern: usize) -> Result<()> {
        let handle = self.handle(pattern)?;
        self.actions.retract(handle)
    }

    pub(crate) fn print(&mut self, value: &Value) {
        self.actions.print(value.to_string());
    }
}

/// A rule's executable action, tagged with the dialect it was written in.
#[derive(Clone, Debug)]
pub struct Consequence {
    dialect: Dialect,
    action: Action,
    locals: usize,
}

impl Consequence {
    /// Creates a consequence.
    #[must_use]
    pub const fn new(dialect: Dialect, action: Action, locals: usize) -> Self {
        Self {
            dialect,
            action,
            locals,
        }
    }

    /// Returns the dialect the consequence was written in.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Returns the number of local slots the consequence uses.
    #[must_use]
    pub const fn locals(&self) -> usize {
        self.locals
    }

    /// Runs the consequence for one activation.
    ///
    /// # Errors
    /// Returns the first evaluation or working memory error. Mutations made
    /// before the error are kept.
    pub fn execute(
        &self,
        handles: &[FactHandle],
        facts: Vec<Value>,
        actions: &mut dyn WorkingMemoryActions,
    ) -> Result<()> {
        let mut ctx = ConsequenceContext::new(handles, facts, self.locals, actions);
        self.action.run(&mut ctx)
    }
}
