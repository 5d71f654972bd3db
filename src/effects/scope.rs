//! The handle user callbacks receive while the engine runs them.

use super::action::run_actions;
use super::disposer::Disposer;
use crate::context::{ContextStore, MachineContext};
use crate::core::{Event, RuntimeState};
use crate::engine::{MachineError, MachineHandle, ResolvedMachine};

/// Access to the machine from inside an action or activity.
///
/// Reads see the live context. Writes go through [`set`](Scope::set),
/// which recomputes derived fields and runs watch actions before
/// returning. Events sent from here are queued and processed once the
/// current transition has fully completed.
pub struct Scope<'a, C> {
    store: &'a mut ContextStore<C>,
    event: &'a Event,
    state: &'a RuntimeState,
    machine: &'a ResolvedMachine<C>,
    handle: &'a MachineHandle<C>,
    held: &'a mut Vec<Disposer>,
}

impl<'a, C: MachineContext> Scope<'a, C> {
    pub(crate) fn new(
        store: &'a mut ContextStore<C>,
        event: &'a Event,
        state: &'a RuntimeState,
        machine: &'a ResolvedMachine<C>,
        handle: &'a MachineHandle<C>,
        held: &'a mut Vec<Disposer>,
    ) -> Self {
        Self {
            store,
            event,
            state,
            machine,
            handle,
            held,
        }
    }

    /// The live context.
    pub fn context(&self) -> &C {
        self.store.get()
    }

    /// The context the machine was started with.
    pub fn initial_context(&self) -> &C {
        self.store.initial()
    }

    /// Mutate the context, then recompute derived fields and run the
    /// actions of every watched key that changed.
    pub fn set<F>(&mut self, mutate: F) -> Result<(), MachineError>
    where
        F: FnOnce(&mut C),
    {
        let changed = self.store.apply(mutate)?;
        let machine = self.machine;
        for index in changed {
            if let Some(watch) = machine.watches.get(index) {
                tracing::trace!(machine = self.machine_id(), key = %watch.key, "watched key changed");
                run_actions(&watch.actions, self)?;
            }
        }
        Ok(())
    }

    /// The event being processed.
    pub fn event(&self) -> &Event {
        self.event
    }

    /// The runtime state as of this step of the transition.
    pub fn state(&self) -> &RuntimeState {
        self.state
    }

    /// Keep `disposer` until the current state exits, then release it
    /// (newest first, after the state's activities). Disposers held from
    /// machine-level entry actions live until the machine stops.
    pub fn hold(&mut self, disposer: Disposer) {
        self.held.push(disposer);
    }

    /// Queue an event for after the current transition.
    pub fn send(&self, event: impl Into<Event>) {
        self.handle.post(event.into());
    }

    /// A handle for long-lived callbacks (listeners, observers) that need
    /// to send events after this scope is gone.
    pub fn handle(&self) -> MachineHandle<C> {
        self.handle.clone()
    }

    pub fn machine_id(&self) -> &str {
        self.handle.id()
    }
}
