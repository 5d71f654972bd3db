//! Transition execution.
//!
//! `Inner` owns everything a transition touches: the resolved definition,
//! the context store, the runtime state, the held activities and the armed
//! timers. It processes one message at a time and never re-enters itself;
//! the queue in [`Machine`](super::Machine) sequences the messages.

use super::machine::MachineHandle;
use super::resolve::{Compiled, ResolvedMachine, ResolvedState, ResolvedTransition};
use super::scheduler::Scheduler;
use super::MachineError;
use crate::context::{ContextStore, MachineContext};
use crate::core::{Event, MachineStatus, RuntimeState, StateHistory, TransitionRecord, STOP_EVENT};
use crate::effects::{
    run_actions, ActivityManager, Disposer, ResolvedAction, ResolvedActivity, ResolvedDelay, Scope,
};
use chrono::Utc;
use smallvec::SmallVec;
use std::rc::Rc;
use std::time::Duration;

/// Shortest period of an `every` timer. A zero interval would otherwise
/// re-arm for the instant it just fired at.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

pub(crate) enum Message<C> {
    Start(Option<C>),
    Stop,
    Event(Event),
    Timer(TimerToken),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TimerKind {
    After(usize),
    Every(usize),
}

/// Identifies an armed timer and the state entry that armed it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TimerToken {
    generation: u64,
    kind: TimerKind,
}

/// What subscribers should hear about a processed message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Notice {
    Changed,
    Stopped,
}

type Outcome = Result<Option<Notice>, MachineError>;

pub(crate) struct Inner<C> {
    machine: Rc<ResolvedMachine<C>>,
    store: ContextStore<C>,
    state: RuntimeState,
    /// Bumped on every state exit. Timers armed under an older value are
    /// stale.
    generation: u64,
    root_activities: ActivityManager,
    activities: ActivityManager,
    /// Disposers handed over by actions through `Scope::hold`.
    held: Vec<Disposer>,
    /// Held by machine-level entry actions; released on stop.
    root_held: Vec<Disposer>,
    timers: SmallVec<[(TimerKind, Disposer); 4]>,
    history: StateHistory,
    handle: MachineHandle<C>,
    scheduler: Rc<dyn Scheduler>,
}

impl<C: MachineContext> Inner<C> {
    pub(crate) fn new(
        compiled: Compiled<C>,
        handle: MachineHandle<C>,
        scheduler: Rc<dyn Scheduler>,
        history: StateHistory,
    ) -> Self {
        Self {
            machine: Rc::new(compiled.machine),
            store: compiled.store,
            state: RuntimeState::not_started(),
            generation: 0,
            root_activities: ActivityManager::default(),
            activities: ActivityManager::default(),
            held: Vec::new(),
            root_held: Vec::new(),
            timers: SmallVec::new(),
            history,
            handle,
            scheduler,
        }
    }

    pub(crate) fn state(&self) -> &RuntimeState {
        &self.state
    }

    pub(crate) fn context(&self) -> &C {
        self.store.get()
    }

    pub(crate) fn status(&self) -> MachineStatus {
        self.state.status
    }

    pub(crate) fn definition_id(&self) -> &str {
        &self.machine.key
    }

    pub(crate) fn history(&self) -> &StateHistory {
        &self.history
    }

    pub(crate) fn activity_names(&self) -> Vec<String> {
        self.activities.names()
    }

    pub(crate) fn timer_count(&self) -> usize {
        self.timers.len()
    }

    pub(crate) fn can(&self, event_type: &str) -> bool {
        if self.state.status != MachineStatus::Running {
            return false;
        }
        let Some(current) = self.state.value.as_deref() else {
            return false;
        };
        let event = Event::new(event_type);
        self.machine
            .candidates(current, event_type)
            .iter()
            .any(|candidate| candidate.enabled(self.store.get(), &event))
    }

    pub(crate) fn process(&mut self, message: Message<C>) -> Outcome {
        match message {
            Message::Start(context) => self.start(context),
            Message::Stop => self.stop(),
            Message::Event(event) => self.handle_event(event),
            Message::Timer(token) => self.handle_timer(token),
        }
    }

    fn start(&mut self, context: Option<C>) -> Outcome {
        match self.state.status {
            MachineStatus::Running => {
                tracing::trace!(machine = self.handle.id(), "start ignored, already running");
                return Ok(None);
            }
            MachineStatus::Stopped => {
                tracing::warn!(machine = self.handle.id(), "start ignored, machine is stopped");
                return Ok(None);
            }
            MachineStatus::NotStarted => {}
        }

        let context = context.unwrap_or_else(|| self.store.initial().clone());
        self.store.seed(context)?;

        let machine = Rc::clone(&self.machine);
        let event = Event::init();
        self.state.status = MachineStatus::Running;
        self.state.event = event.clone();
        tracing::debug!(machine = self.handle.id(), initial = %machine.initial, "starting machine");

        let mut entered = self.run(&machine.entry, &event);
        self.root_held = std::mem::take(&mut self.held);
        if entered.is_ok() {
            entered = self.start_activities(&machine.activities, &event, true);
        }
        if let Err(err) = entered {
            // No state was entered; the machine cannot run.
            self.root_activities.stop_all();
            self.release_held();
            release_all(&mut self.root_held);
            self.state.status = MachineStatus::Stopped;
            tracing::warn!(machine = self.handle.id(), error = %err, "start failed before entering the initial state");
            return Err(err);
        }
        self.change_state(&machine, &machine.initial, &[], &event)?;
        Ok(Some(Notice::Changed))
    }

    fn stop(&mut self) -> Outcome {
        match self.state.status {
            MachineStatus::Stopped => return Ok(None),
            MachineStatus::NotStarted => {
                self.state.status = MachineStatus::Stopped;
                tracing::debug!(machine = self.handle.id(), "machine stopped before start");
                return Ok(Some(Notice::Stopped));
            }
            MachineStatus::Running => {}
        }

        let machine = Rc::clone(&self.machine);
        let event = Event::new(STOP_EVENT);
        self.state.event = event.clone();

        let mut result = match self.current_node(&machine) {
            Some(node) => self.run(&node.exit, &event),
            None => Ok(()),
        };
        self.teardown_state();
        if result.is_ok() {
            result = self.run(&machine.exit, &event);
        }
        self.root_activities.stop_all();
        self.release_held();
        release_all(&mut self.root_held);
        self.state.status = MachineStatus::Stopped;
        self.state.changed = false;
        tracing::debug!(machine = self.handle.id(), state = ?self.state.value, "machine stopped");

        result?;
        Ok(Some(Notice::Stopped))
    }

    fn handle_event(&mut self, event: Event) -> Outcome {
        if self.state.status != MachineStatus::Running {
            tracing::trace!(machine = self.handle.id(), event = %event, "event ignored, machine not running");
            return Ok(None);
        }
        self.state.event = event.clone();

        let machine = Rc::clone(&self.machine);
        let current = self.state.value.clone().unwrap_or_default();
        let selected = machine
            .candidates(&current, event.kind())
            .iter()
            .find(|candidate| candidate.enabled(self.store.get(), &event));

        match selected {
            Some(transition) => {
                if let Some(guard) = &transition.guard {
                    tracing::trace!(machine = self.handle.id(), event = %event, guard = %guard.describe(), "guard passed");
                }
                self.take(&machine, transition, &event)?;
                Ok(Some(Notice::Changed))
            }
            None => {
                self.state.changed = false;
                tracing::trace!(machine = self.handle.id(), state = %current, event = %event, "no transition matched");
                Ok(None)
            }
        }
    }

    fn handle_timer(&mut self, token: TimerToken) -> Outcome {
        if self.state.status != MachineStatus::Running || token.generation != self.generation {
            tracing::trace!(machine = self.handle.id(), ?token, "stale timer dropped");
            return Ok(None);
        }

        let machine = Rc::clone(&self.machine);
        let Some(node) = self.current_node(&machine) else {
            return Ok(None);
        };
        let (timer, prefix) = match token.kind {
            TimerKind::After(index) => (node.after.get(index), "after"),
            TimerKind::Every(index) => (node.every.get(index), "every"),
        };
        let Some(timer) = timer else {
            return Ok(None);
        };
        self.timers.retain(|(kind, _)| *kind != token.kind);

        let event = Event::new(format!("{prefix}:{}", timer.label));
        self.state.event = event.clone();
        let selected = timer
            .transitions
            .iter()
            .find(|candidate| candidate.enabled(self.store.get(), &event));

        let outcome = match selected {
            Some(transition) => self
                .take(&machine, transition, &event)
                .map(|()| Some(Notice::Changed)),
            None => {
                self.state.changed = false;
                tracing::trace!(machine = self.handle.id(), timer = %event, "timer guard failed");
                Ok(None)
            }
        };

        let still_current = self.generation == token.generation
            && self.state.status == MachineStatus::Running;
        if matches!(token.kind, TimerKind::Every(_)) && still_current {
            self.arm_one(token.kind, &timer.delay, &event);
        }
        outcome
    }

    fn take(
        &mut self,
        machine: &ResolvedMachine<C>,
        transition: &ResolvedTransition<C>,
        event: &Event,
    ) -> Result<(), MachineError> {
        match &transition.target {
            None => {
                self.state.changed = false;
                self.run(&transition.actions, event)
            }
            Some(target) => self.change_state(machine, target, &transition.actions, event),
        }
    }

    /// Exit the current state (if any) and enter `target`.
    ///
    /// Order: exit actions, activity and timer teardown, state update,
    /// transition actions, entry actions, timers, activities. The first
    /// failing callback aborts the rest; the state update is kept.
    fn change_state(
        &mut self,
        machine: &ResolvedMachine<C>,
        target: &str,
        actions: &[ResolvedAction<C>],
        event: &Event,
    ) -> Result<(), MachineError> {
        let from = self.state.value.clone();
        if let Some(node) = self.current_node(machine) {
            self.run(&node.exit, event)?;
        }
        self.teardown_state();

        let node = machine.states.get(target);
        self.state.changed = from.as_deref() != Some(target);
        self.state.previous_value = from.clone();
        self.state.value = Some(target.to_string());
        self.state.tags = node.map(|n| n.tags.clone()).unwrap_or_default();
        self.history.record(TransitionRecord {
            from: from.clone(),
            to: target.to_string(),
            event: event.kind().to_string(),
            timestamp: Utc::now(),
        });
        tracing::debug!(
            machine = self.handle.id(),
            definition = %machine.key,
            from = from.as_deref().unwrap_or("-"),
            to = target,
            event = event.kind(),
            "transition"
        );

        self.run(actions, event)?;
        if let Some(node) = node {
            self.run(&node.entry, event)?;
            self.arm(node, event);
            self.start_activities(&node.activities, event, false)?;
        }
        Ok(())
    }

    fn current_node<'m>(&self, machine: &'m ResolvedMachine<C>) -> Option<&'m ResolvedState<C>> {
        self.state
            .value
            .as_deref()
            .and_then(|id| machine.states.get(id))
    }

    fn run(&mut self, actions: &[ResolvedAction<C>], event: &Event) -> Result<(), MachineError> {
        if actions.is_empty() {
            return Ok(());
        }
        let mut scope = Scope::new(
            &mut self.store,
            event,
            &self.state,
            &self.machine,
            &self.handle,
            &mut self.held,
        );
        run_actions(actions, &mut scope)
    }

    fn start_activities(
        &mut self,
        activities: &[ResolvedActivity<C>],
        event: &Event,
        root: bool,
    ) -> Result<(), MachineError> {
        if activities.is_empty() {
            return Ok(());
        }
        let mut scope = Scope::new(
            &mut self.store,
            event,
            &self.state,
            &self.machine,
            &self.handle,
            &mut self.held,
        );
        let manager = if root {
            &mut self.root_activities
        } else {
            &mut self.activities
        };
        manager.start(activities, &mut scope)
    }

    /// Release everything owned by the current state entry.
    fn teardown_state(&mut self) {
        self.activities.stop_all();
        self.release_held();
        for (_, mut timer) in self.timers.drain(..) {
            timer.dispose();
        }
        self.generation += 1;
    }

    fn release_held(&mut self) {
        release_all(&mut self.held);
    }

    fn arm(&mut self, node: &ResolvedState<C>, event: &Event) {
        for (index, timer) in node.after.iter().enumerate() {
            self.arm_one(TimerKind::After(index), &timer.delay, event);
        }
        for (index, timer) in node.every.iter().enumerate() {
            self.arm_one(TimerKind::Every(index), &timer.delay, event);
        }
    }

    fn arm_one(&mut self, kind: TimerKind, delay: &ResolvedDelay<C>, event: &Event) {
        let mut duration = delay.resolve(self.store.get(), event);
        if matches!(kind, TimerKind::Every(_)) {
            duration = duration.max(MIN_INTERVAL);
        }
        let token = TimerToken {
            generation: self.generation,
            kind,
        };
        let handle = self.handle.clone();
        let disposer = self
            .scheduler
            .schedule(duration, Box::new(move || handle.fire(token)));
        tracing::trace!(machine = self.handle.id(), ?kind, ?duration, "timer armed");
        self.timers.push((kind, disposer));
    }
}

/// Release newest first.
fn release_all(held: &mut Vec<Disposer>) {
    while let Some(mut disposer) = held.pop() {
        disposer.dispose();
    }
}
