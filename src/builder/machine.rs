//! Builder for machine definitions.

use super::error::BuildError;
use super::state::{push_candidate, StateNode};
use super::transition::Transition;
use crate::context::{Computed, MachineContext};
use crate::effects::{Action, Activity};
use crate::engine::{resolve, MachineError};
use crate::options::MachineOptions;
use std::collections::HashSet;

/// Immutable description of a machine: states, machine-level handlers,
/// computed fields and watch rules, plus the default context.
///
/// Named references are only checked against [`MachineOptions`] when the
/// machine is created, or by [`validate`](Self::validate).
pub struct MachineDefinition<C> {
    pub(crate) id: String,
    pub(crate) initial: String,
    pub(crate) context: C,
    pub(crate) states: Vec<(String, StateNode<C>)>,
    pub(crate) on: Vec<(String, Vec<Transition<C>>)>,
    pub(crate) entry: Vec<Action<C>>,
    pub(crate) exit: Vec<Action<C>>,
    pub(crate) activities: Vec<Activity<C>>,
    pub(crate) computed: Vec<Computed<C>>,
    pub(crate) watch: Vec<(String, Vec<Action<C>>)>,
}

impl<C: MachineContext> MachineDefinition<C> {
    /// Check every named reference against `options` and report every
    /// problem at once.
    pub fn validate(&self, options: &MachineOptions<C>) -> Result<(), MachineError> {
        resolve(self, options).map(|_| ())
    }
}

impl<C> MachineDefinition<C> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn initial(&self) -> &str {
        &self.initial
    }

    /// The context the machine starts with unless `start_with` overrides it.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Declared state ids, in declaration order.
    pub fn state_ids(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|(id, _)| id.as_str())
    }

    pub fn state(&self, id: &str) -> Option<&StateNode<C>> {
        self.states
            .iter()
            .find(|(name, _)| name == id)
            .map(|(_, node)| node)
    }
}

/// Builder for [`MachineDefinition`] with a fluent API.
///
/// # Example
///
/// ```rust
/// use statecore::{MachineBuilder, StateNode, Transition};
///
/// #[derive(Clone, serde::Serialize)]
/// struct Counter {
///     count: u32,
/// }
///
/// let definition = MachineBuilder::new()
///     .id("counter")
///     .initial("idle")
///     .context(Counter { count: 0 })
///     .state("idle", StateNode::new().on("INC", Transition::new().action("increment")))
///     .build()
///     .unwrap();
///
/// assert_eq!(definition.initial(), "idle");
/// assert_eq!(definition.state_ids().collect::<Vec<_>>(), ["idle"]);
/// ```
pub struct MachineBuilder<C> {
    id: Option<String>,
    initial: Option<String>,
    context: Option<C>,
    states: Vec<(String, StateNode<C>)>,
    on: Vec<(String, Vec<Transition<C>>)>,
    entry: Vec<Action<C>>,
    exit: Vec<Action<C>>,
    activities: Vec<Activity<C>>,
    computed: Vec<Computed<C>>,
    watch: Vec<(String, Vec<Action<C>>)>,
}

impl<C> MachineBuilder<C> {
    pub fn new() -> Self {
        Self {
            id: None,
            initial: None,
            context: None,
            states: Vec::new(),
            on: Vec::new(),
            entry: Vec::new(),
            exit: Vec::new(),
            activities: Vec::new(),
            computed: Vec::new(),
            watch: Vec::new(),
        }
    }

    /// Definition id, used in logs. Defaults to `"machine"`.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: impl Into<String>) -> Self {
        self.initial = Some(state.into());
        self
    }

    /// Set the default context (required).
    pub fn context(mut self, context: C) -> Self {
        self.context = Some(context);
        self
    }

    pub fn state(mut self, id: impl Into<String>, node: StateNode<C>) -> Self {
        self.states.push((id.into(), node));
        self
    }

    /// Machine-level handler, used when the current state declares no
    /// candidates for `event`.
    pub fn on(mut self, event: impl Into<String>, transition: impl Into<Transition<C>>) -> Self {
        push_candidate(&mut self.on, event.into(), transition.into());
        self
    }

    /// Action run once at `start`, before the initial state is entered.
    pub fn entry(mut self, action: impl Into<Action<C>>) -> Self {
        self.entry.push(action.into());
        self
    }

    /// Action run once at `stop`, after the current state is exited.
    pub fn exit(mut self, action: impl Into<Action<C>>) -> Self {
        self.exit.push(action.into());
        self
    }

    /// Activity that runs from `start` to `stop`.
    pub fn activity(mut self, activity: impl Into<Activity<C>>) -> Self {
        self.activities.push(activity.into());
        self
    }

    /// Derived field registered in the options under `name`.
    pub fn computed(mut self, name: impl Into<String>) -> Self {
        self.computed.push(Computed::Named(name.into()));
        self
    }

    /// Inline derived field. Derived fields recompute in the order added.
    pub fn computed_fn<F>(mut self, name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&mut C) + 'static,
    {
        self.computed.push(Computed::new(name, compute));
        self
    }

    /// Run `actions` whenever the context key `key` changes.
    pub fn watch<I, A>(mut self, key: impl Into<String>, actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Action<C>>,
    {
        self.watch
            .push((key.into(), actions.into_iter().map(Into::into).collect()));
        self
    }

    /// Build the definition.
    /// Returns an error if required fields are missing or a state id is
    /// declared twice.
    pub fn build(self) -> Result<MachineDefinition<C>, BuildError> {
        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;
        let context = self.context.ok_or(BuildError::MissingContext)?;

        if self.states.is_empty() {
            return Err(BuildError::NoStates);
        }

        let mut seen = HashSet::new();
        for (id, _) in &self.states {
            if !seen.insert(id.as_str()) {
                return Err(BuildError::DuplicateState(id.clone()));
            }
        }

        Ok(MachineDefinition {
            id: self.id.unwrap_or_else(|| "machine".to_string()),
            initial,
            context,
            states: self.states,
            on: self.on,
            entry: self.entry,
            exit: self.exit,
            activities: self.activities,
            computed: self.computed,
            watch: self.watch,
        })
    }
}

impl<C> Default for MachineBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
