//! The machine: one addressable instance of a definition.
//!
//! # Run-to-completion
//!
//! Every entry point (`start`, `send`, `stop`, and timer firings) becomes a
//! message in one FIFO queue. The first caller drains the queue; callers that
//! arrive while a message is being processed (an action sending an event, a
//! listener reacting to a notification) only enqueue. A transition therefore
//! always completes, subscribers included, before the next one begins.

use super::error::MachineError;
use super::resolve::resolve;
use super::scheduler::{ManualScheduler, Scheduler};
use super::transition::{Inner, Message, Notice, TimerToken};
use crate::builder::MachineDefinition;
use crate::context::MachineContext;
use crate::core::{Event, MachineStatus, RuntimeState, StateHistory};
use crate::effects::Disposer;
use crate::options::MachineOptions;
use crate::snapshot::Snapshot;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

type Listener<C> = Rc<dyn Fn(&RuntimeState, &C)>;

pub(crate) struct Shared<C> {
    inner: RefCell<Inner<C>>,
    queue: RefCell<VecDeque<Message<C>>>,
    processing: Cell<bool>,
    listeners: RefCell<Vec<(u64, Listener<C>)>>,
    next_listener: Cell<u64>,
    replay_last: bool,
    id: Rc<str>,
}

struct Processing<'a>(&'a Cell<bool>);

impl<'a> Processing<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for Processing<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<C: MachineContext> Shared<C> {
    fn dispatch(&self, message: Message<C>) -> Result<(), MachineError> {
        self.queue.borrow_mut().push_back(message);
        if self.processing.get() {
            return Ok(());
        }

        let _processing = Processing::enter(&self.processing);
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(message) = next else {
                return Ok(());
            };
            let outcome = self.inner.borrow_mut().process(message);
            match outcome {
                Ok(Some(notice)) => self.notify(notice),
                Ok(None) => {}
                Err(err) => {
                    let discarded: Vec<Message<C>> = self.queue.borrow_mut().drain(..).collect();
                    if !discarded.is_empty() {
                        tracing::warn!(
                            machine = %self.id,
                            discarded = discarded.len(),
                            "discarding queued messages after failed transition"
                        );
                    }
                    if self.inner.borrow().status() == MachineStatus::Stopped {
                        self.drop_listeners();
                    }
                    return Err(err);
                }
            }
        }
    }

    fn notify(&self, notice: Notice) {
        let (state, context) = {
            let inner = self.inner.borrow();
            (inner.state().clone(), inner.context().clone())
        };
        let listeners: Vec<Listener<C>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&state, &context);
        }
        if notice == Notice::Stopped {
            self.drop_listeners();
        }
    }

    fn drop_listeners(&self) {
        let dropped = std::mem::take(&mut *self.listeners.borrow_mut());
        drop(dropped);
    }
}

/// A weak, cloneable handle to a machine.
///
/// Handles do not keep the machine alive. Sending through a handle whose
/// machine was dropped does nothing.
pub struct MachineHandle<C> {
    shared: Weak<Shared<C>>,
    id: Rc<str>,
}

impl<C: MachineContext> MachineHandle<C> {
    /// Send an event. Inside a transition the event is queued and this
    /// returns immediately; otherwise it is processed before returning.
    pub fn send(&self, event: impl Into<Event>) -> Result<(), MachineError> {
        match self.shared.upgrade() {
            Some(shared) => shared.dispatch(Message::Event(event.into())),
            None => Ok(()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Enqueue without draining. Only valid while a transition is running,
    /// which drains the queue before it returns.
    pub(crate) fn post(&self, event: Event) {
        if let Some(shared) = self.shared.upgrade() {
            shared.queue.borrow_mut().push_back(Message::Event(event));
        }
    }

    /// Deliver an elapsed timer. Errors have no caller to return to.
    pub(crate) fn fire(&self, token: TimerToken) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        if let Err(err) = shared.dispatch(Message::Timer(token)) {
            tracing::error!(machine = %self.id, error = %err, "timer transition failed");
        }
    }
}

impl<C> Clone for MachineHandle<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
            id: Rc::clone(&self.id),
        }
    }
}

impl<C> fmt::Debug for MachineHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineHandle")
            .field("id", &self.id)
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

/// A running instance of a [`MachineDefinition`].
///
/// Clones refer to the same instance.
///
/// # Example
///
/// ```rust
/// use statecore::{create_machine, MachineBuilder, MachineOptions, StateNode, Transition};
///
/// #[derive(Clone, serde::Serialize)]
/// struct Counter {
///     count: u32,
/// }
///
/// let definition = MachineBuilder::new()
///     .initial("idle")
///     .context(Counter { count: 0 })
///     .state("idle", StateNode::new().on("INC", Transition::new().action("increment")))
///     .build()
///     .unwrap();
/// let options = MachineOptions::<Counter>::new().action("increment", |scope| {
///     scope.set(|ctx| ctx.count += 1)?;
///     Ok(())
/// });
///
/// let machine = create_machine(&definition, &options).unwrap();
/// machine.start().unwrap();
/// for _ in 0..3 {
///     machine.send("INC").unwrap();
/// }
///
/// assert_eq!(machine.context().count, 3);
/// assert_eq!(machine.state().value(), Some("idle"));
/// ```
pub struct Machine<C> {
    shared: Rc<Shared<C>>,
}

/// Resolve `definition` against `options` and create a machine that has not
/// started yet.
///
/// Every unresolvable name is reported at once as
/// [`MachineError::Configuration`].
pub fn create_machine<C: MachineContext>(
    definition: &MachineDefinition<C>,
    options: &MachineOptions<C>,
) -> Result<Machine<C>, MachineError> {
    let compiled = resolve(definition, options)?;
    let id: Rc<str> = match &options.config.id {
        Some(id) => Rc::from(id.as_str()),
        None => Rc::from(uuid::Uuid::new_v4().to_string()),
    };
    let scheduler: Rc<dyn Scheduler> = match &options.scheduler {
        Some(scheduler) => Rc::clone(scheduler),
        None => Rc::new(ManualScheduler::new()),
    };
    let history = StateHistory::new(options.config.history_limit);

    let shared = Rc::new_cyclic(|weak: &Weak<Shared<C>>| {
        let handle = MachineHandle {
            shared: Weak::clone(weak),
            id: Rc::clone(&id),
        };
        Shared {
            inner: RefCell::new(Inner::new(compiled, handle, scheduler, history)),
            queue: RefCell::new(VecDeque::new()),
            processing: Cell::new(false),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
            replay_last: options.config.replay_last,
            id: Rc::clone(&id),
        }
    });
    tracing::debug!(machine = %id, definition = %definition.id(), "machine created");

    Ok(Machine { shared })
}

impl<C: MachineContext> Machine<C> {
    /// Instance id: the configured id, or a UUID.
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// Id of the definition this machine was created from. Instances of one
    /// definition share it.
    pub fn definition_id(&self) -> String {
        self.shared.inner.borrow().definition_id().to_string()
    }

    /// Start with the definition's context. Does nothing if already running.
    pub fn start(&self) -> Result<(), MachineError> {
        self.shared.dispatch(Message::Start(None))
    }

    /// Start with `context` instead of the definition's context.
    pub fn start_with(&self, context: C) -> Result<(), MachineError> {
        self.shared.dispatch(Message::Start(Some(context)))
    }

    /// Exit the current state, tear everything down and stop for good.
    /// Idempotent.
    pub fn stop(&self) -> Result<(), MachineError> {
        self.shared.dispatch(Message::Stop)
    }

    /// Send an event. Events sent before `start` or after `stop` are
    /// ignored.
    pub fn send(&self, event: impl Into<Event>) -> Result<(), MachineError> {
        self.shared.dispatch(Message::Event(event.into()))
    }

    /// Call `listener` after every completed transition.
    ///
    /// With `replay_last` configured, the listener is also called right
    /// away with the current state, unless a transition is in progress (it
    /// is then notified when that transition completes). Subscribing to a
    /// stopped machine does nothing.
    pub fn subscribe<F>(&self, listener: F) -> Disposer
    where
        F: Fn(&RuntimeState, &C) + 'static,
    {
        // Mid-transition the engine holds the state borrowed; treat it as live.
        let stopped = self
            .shared
            .inner
            .try_borrow()
            .map(|inner| inner.status() == MachineStatus::Stopped)
            .unwrap_or(false);
        if stopped {
            return Disposer::noop();
        }
        let listener: Listener<C> = Rc::new(listener);
        let key = self.shared.next_listener.get();
        self.shared.next_listener.set(key + 1);
        self.shared
            .listeners
            .borrow_mut()
            .push((key, Rc::clone(&listener)));

        if self.shared.replay_last {
            let current = self
                .shared
                .inner
                .try_borrow()
                .ok()
                .map(|inner| (inner.state().clone(), inner.context().clone()));
            if let Some((state, context)) = current {
                listener(&state, &context);
            }
        }

        let shared = Rc::downgrade(&self.shared);
        Disposer::new(move || {
            if let Some(shared) = shared.upgrade() {
                let removed: Vec<(u64, Listener<C>)> = {
                    let mut listeners = shared.listeners.borrow_mut();
                    let (removed, kept) = std::mem::take(&mut *listeners)
                        .into_iter()
                        .partition(|(k, _)| *k == key);
                    *listeners = kept;
                    removed
                };
                drop(removed);
            }
        })
    }

    /// The current runtime state.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an action or activity of this
    /// machine; use [`Scope::state`](crate::Scope::state) there.
    pub fn state(&self) -> RuntimeState {
        self.shared.inner.borrow().state().clone()
    }

    /// A copy of the current context.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an action or activity of this
    /// machine; use [`Scope::context`](crate::Scope::context) there.
    pub fn context(&self) -> C {
        self.shared.inner.borrow().context().clone()
    }

    pub fn status(&self) -> MachineStatus {
        self.shared.inner.borrow().status()
    }

    /// Whether sending `event_type` now would select a candidate.
    pub fn can(&self, event_type: &str) -> bool {
        self.shared.inner.borrow().can(event_type)
    }

    pub fn history(&self) -> StateHistory {
        self.shared.inner.borrow().history().clone()
    }

    /// Capture the current state and context for inspection or tooling.
    pub fn snapshot(&self) -> Snapshot<C> {
        let inner = self.shared.inner.borrow();
        Snapshot::capture(
            self.id(),
            inner.state().clone(),
            inner.context().clone(),
            inner.history().clone(),
        )
    }

    /// A weak handle for callbacks that outlive the current transition.
    pub fn handle(&self) -> MachineHandle<C> {
        MachineHandle {
            shared: Rc::downgrade(&self.shared),
            id: Rc::clone(&self.shared.id),
        }
    }

    /// Names of the activities held for the current state.
    pub fn active_activities(&self) -> Vec<String> {
        self.shared.inner.borrow().activity_names()
    }

    /// Number of armed `after` and `every` timers.
    pub fn active_timers(&self) -> usize {
        self.shared.inner.borrow().timer_count()
    }
}

impl<C> Clone for Machine<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<C> fmt::Debug for Machine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine").field("id", &self.shared.id).finish()
    }
}
