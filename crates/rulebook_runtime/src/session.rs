//! Rule sessions.
//!
//! A [`Session`] owns one working memory, one network memory and one agenda,
//! all driven by a shared [`KnowledgeBase`]. Every mutation is propagated
//! completely before the call returns, whether it comes from the host or from
//! a running consequence.

use std::sync::Arc;

use rulebook_engine::{
    Activation, AgendaEvent, Agenda, KnowledgeBase, MemoryStats, NetworkMemory, Propagator,
    WorkingMemoryActions,
};
use rulebook_foundation::{Error, FactHandle, PropertyMask, Result, Value};
use rulebook_storage::{Delta, FactStore, ObjectFilter, Snapshot};
use tracing::{debug, trace, warn};

use crate::config::SessionConfig;
use crate::event::{SessionEvent, SessionListener};

/// A stateful rule session.
pub struct Session {
    config: SessionConfig,
    state: SessionState,
    fired_total: u64,
}

/// Working memory plus everything a consequence may touch.
struct SessionState {
    kb: Arc<KnowledgeBase>,
    property_reactive: bool,
    capture_output: bool,
    store: FactStore,
    memory: NetworkMemory,
    agenda: Agenda,
    output: Vec<String>,
    listeners: Vec<Box<dyn SessionListener>>,
}

impl Session {
    /// Creates a session with the default configuration.
    #[must_use]
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self::with_config(kb, SessionConfig::default())
    }

    /// Creates a session.
    ///
    /// Rules without patterns are activated immediately.
    #[must_use]
    pub fn with_config(kb: Arc<KnowledgeBase>, config: SessionConfig) -> Self {
        let mut memory = NetworkMemory::new(kb.network());
        let mut agenda = Agenda::new();
        let store = FactStore::new();
        Propagator::new(kb.network(), &mut memory, &mut agenda, &store, kb.registry()).seed();
        debug!(
            rules = kb.rule_count(),
            mode = %kb.mode(),
            seeded = agenda.len(),
            "session created"
        );
        Self {
            state: SessionState {
                property_reactive: config.property_reactive,
                capture_output: config.capture_output,
                kb,
                store,
                memory,
                agenda,
                output: Vec::new(),
                listeners: Vec::new(),
            },
            config,
            fired_total: 0,
        }
    }

    /// Returns the knowledge base this session runs.
    #[must_use]
    pub fn knowledge_base(&self) -> &Arc<KnowledgeBase> {
        &self.state.kb
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Registers a listener for session events.
    pub fn add_listener(&mut self, listener: impl SessionListener + 'static) {
        self.state.listeners.push(Box::new(listener));
    }

    // -------------------------------------------------------------------------
    // Working memory
    // -------------------------------------------------------------------------

    /// Inserts a fact and propagates it.
    ///
    /// # Errors
    /// Returns the first constraint evaluation error raised while
    /// propagating. The fact stays inserted.
    pub fn insert(&mut self, fact: impl Into<Value>) -> Result<FactHandle> {
        self.state.insert(fact.into())
    }

    /// Replaces a fact and propagates the change as if every field changed.
    ///
    /// Matching sees a retraction followed by an insertion that keeps the
    /// handle: pending activations on the fact are cancelled and re-created
    /// behind newer ones, and fired matches that still hold fire again.
    ///
    /// # Errors
    /// Returns `UnknownHandle` if the handle is not live, leaving working
    /// memory unchanged, or the first constraint evaluation error.
    pub fn update(&mut self, handle: FactHandle, fact: impl Into<Value>) -> Result<()> {
        self.state.update(handle, fact.into(), None)
    }

    /// Replaces a fact, declaring which fields changed.
    ///
    /// With property reactivity on, patterns that watch none of `changed`
    /// keep their matches and activations.
    ///
    /// # Errors
    /// As [`Session::update`].
    pub fn update_fields(
        &mut self,
        handle: FactHandle,
        fact: impl Into<Value>,
        changed: PropertyMask,
    ) -> Result<()> {
        self.state.update(handle, fact.into(), Some(changed))
    }

    /// Retracts a fact and cancels every activation that used it.
    ///
    /// # Errors
    /// Returns `UnknownHandle` if the handle is not live.
    pub fn retract(&mut self, handle: FactHandle) -> Result<()> {
        self.state.retract(handle)
    }

    /// Returns the fact behind a handle.
    #[must_use]
    pub fn get_object(&self, handle: FactHandle) -> Option<&Value> {
        self.state.store.get(handle)
    }

    /// Returns the live facts accepted by `filter`, in insertion order.
    ///
    /// Type filters match subtypes of the named type.
    #[must_use]
    pub fn query_objects(&self, filter: &ObjectFilter) -> Vec<Value> {
        let registry = self.state.kb.registry();
        self.state
            .store
            .iter()
            .filter(|(_, fact)| filter.accepts_in(fact, registry))
            .map(|(_, fact)| fact.clone())
            .collect()
    }

    /// Returns the live handles, in insertion order.
    #[must_use]
    pub fn fact_handles(&self) -> Vec<FactHandle> {
        self.state.store.iter().map(|(handle, _)| handle).collect()
    }

    /// Returns the number of live facts.
    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.state.store.len()
    }

    /// Returns an immutable snapshot of working memory.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.state.store.snapshot()
    }

    /// Constructs a fact of a known type, see [`KnowledgeBase::instantiate`].
    ///
    /// # Errors
    /// Returns an error if the type is unknown or the arguments do not fit.
    pub fn instantiate(&self, type_name: &str, args: Vec<Value>) -> Result<Value> {
        self.state.kb.instantiate(type_name, args)
    }

    // -------------------------------------------------------------------------
    // Agenda
    // -------------------------------------------------------------------------

    /// Returns the queued activations in firing order.
    #[must_use]
    pub fn agenda(&self) -> Vec<Activation> {
        self.state.agenda.iter().cloned().collect()
    }

    /// Returns the number of queued activations.
    #[must_use]
    pub fn agenda_len(&self) -> usize {
        self.state.agenda.len()
    }

    /// Returns how many activations were cancelled before firing.
    #[must_use]
    pub const fn cancelled_count(&self) -> u64 {
        self.state.agenda.cancelled_count()
    }

    /// Returns how many consequences this session has run.
    #[must_use]
    pub const fn fired_count(&self) -> u64 {
        self.fired_total
    }

    /// Fires activations until the agenda is empty.
    ///
    /// Returns the number of rules fired by this call.
    ///
    /// # Errors
    /// Returns `ConsequenceExecution` if a consequence fails; mutations it
    /// made before failing are kept. Returns `MaxFiringsExceeded` if the
    /// configured limit is reached with activations still queued.
    pub fn fire_all_rules(&mut self) -> Result<usize> {
        let mut fired = 0;
        while !self.state.agenda.is_empty() {
            if let Some(limit) = self.config.max_firings {
                if fired >= limit {
                    warn!(limit, queued = self.state.agenda.len(), "firing limit reached");
                    return Err(Error::max_firings(limit));
                }
            }
            self.fire_next()?;
            fired += 1;
        }
        debug!(fired, "agenda empty");
        Ok(fired)
    }

    /// Fires at most `limit` activations.
    ///
    /// Returns the number of rules fired. Reaching the limit is not an error.
    ///
    /// # Errors
    /// Returns `ConsequenceExecution` if a consequence fails.
    pub fn fire_until_limit(&mut self, limit: usize) -> Result<usize> {
        let mut fired = 0;
        while fired < limit && self.fire_next()? {
            fired += 1;
        }
        debug!(fired, limit, queued = self.state.agenda.len(), "firing stopped");
        Ok(fired)
    }

    /// Fires the next activation. Returns false if the agenda was empty.
    fn fire_next(&mut self) -> Result<bool> {
        self.state.flush_agenda_events();
        let Some(activation) = self.state.agenda.pop() else {
            return Ok(false);
        };
        let Some(rule) = self.state.kb.rule(activation.rule).cloned() else {
            return Err(Error::internal(format!(
                "activation for unknown rule {}",
                activation.rule
            )));
        };
        let facts = activation
            .token
            .handles()
            .iter()
            .map(|handle| {
                self.state
                    .store
                    .get(*handle)
                    .cloned()
                    .ok_or_else(|| Error::unknown_handle(*handle))
            })
            .collect::<Result<Vec<_>>>()?;

        trace!(%activation, "firing");
        self.state.emit(&SessionEvent::BeforeFire(activation.clone()));
        self.fired_total += 1;
        self.state.agenda.set_firing(Some(activation.rule));
        let result = rule
            .consequence()
            .execute(activation.token.handles(), facts, &mut self.state);
        self.state.agenda.set_firing(None);
        self.state.flush_agenda_events();

        if let Err(err) = result {
            warn!(rule = rule.name(), error = %err, "consequence failed");
            return Err(Error::consequence(rule.name(), err).with_context(rule.location()));
        }
        self.state.emit(&SessionEvent::AfterFire(activation));
        Ok(true)
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    /// Returns the lines printed by consequences so far.
    #[must_use]
    pub fn output(&self) -> &[String] {
        &self.state.output
    }

    /// Takes the lines printed by consequences so far.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.state.output)
    }

    /// Returns the sizes of the network memories.
    #[must_use]
    pub fn memory_stats(&self) -> MemoryStats {
        self.state.memory.stats()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("facts", &self.state.store.len())
            .field("agenda", &self.state.agenda.len())
            .field("fired", &self.fired_total)
            .finish_non_exhaustive()
    }
}

impl SessionState {
    fn emit(&mut self, event: &SessionEvent) {
        for listener in &mut self.listeners {
            listener.on_event(event);
        }
    }

    fn flush_agenda_events(&mut self) {
        for event in self.agenda.drain_events() {
            let event = match event {
                AgendaEvent::Created(a) => SessionEvent::ActivationCreated(a),
                AgendaEvent::Cancelled(a) => SessionEvent::ActivationCancelled(a),
            };
            self.emit(&event);
        }
    }

    fn propagate(&mut self, delta: &Delta) -> Result<()> {
        self.flush_agenda_events();
        let event = match delta {
            Delta::Insert { handle, fact } => SessionEvent::Inserted {
                handle: *handle,
                fact: fact.clone(),
            },
            Delta::Update {
                handle, old, new, ..
            } => SessionEvent::Updated {
                handle: *handle,
                old: old.clone(),
                new: new.clone(),
            },
            Delta::Retract { handle, fact } => SessionEvent::Retracted {
                handle: *handle,
                fact: fact.clone(),
            },
        };
        self.emit(&event);
        let kb = &self.kb;
        let result = Propagator::new(
            kb.network(),
            &mut self.memory,
            &mut self.agenda,
            &self.store,
            kb.registry(),
        )
        .property_reactive(self.property_reactive)
        .apply(delta);
        self.flush_agenda_events();
        result
    }
}

impl WorkingMemoryActions for SessionState {
    fn insert(&mut self, fact: Value) -> Result<FactHandle> {
        let (handle, delta) = self.store.insert(fact);
        trace!(%handle, "fact inserted");
        self.propagate(&delta)?;
        Ok(handle)
    }

    fn update(
        &mut self,
        handle: FactHandle,
        fact: Value,
        mask: Option<PropertyMask>,
    ) -> Result<()> {
        let delta = self.store.update(handle, fact, mask)?;
        trace!(%handle, "fact updated");
        self.propagate(&delta)
    }

    fn retract(&mut self, handle: FactHandle) -> Result<()> {
        let delta = self.store.retract(handle)?;
        trace!(%handle, "fact retracted");
        self.propagate(&delta)
    }

    fn print(&mut self, line: String) {
        debug!(target: "rulebook::output", "{line}");
        self.emit(&SessionEvent::Output(line.clone()));
        if self.capture_output {
            self.output.push(line);
        }
    }
}
