//! Runtime options: the named implementations a definition refers to, plus
//! per-instance configuration.

use crate::context::{CompareFn, ComputedFn};
use crate::core::{Event, GuardFn};
use crate::effects::{ActionFn, ActivityFn, BoxError, Delay, Disposer, Scope};
use crate::engine::Scheduler;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::rc::Rc;

/// Per-instance configuration.
///
/// Every field has a default, so partial JSON documents are accepted:
///
/// ```rust
/// use statecore::MachineConfig;
///
/// let config = MachineConfig::from_json(r#"{ "id": "number-input:1", "replay_last": true }"#).unwrap();
/// assert_eq!(config.id.as_deref(), Some("number-input:1"));
/// assert!(config.replay_last);
/// assert_eq!(config.history_limit, 32);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Machine instance id. A fresh UUID v4 when absent.
    pub id: Option<String>,
    /// Replay the current state to new subscribers immediately.
    pub replay_last: bool,
    /// Transitions kept in the history. Zero disables recording.
    pub history_limit: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            id: None,
            replay_last: false,
            history_limit: 32,
        }
    }
}

impl MachineConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Named guards, actions, activities, delays, computed fields and compare
/// functions, registered by name and resolved once when the machine is
/// created.
///
/// # Example
///
/// ```rust
/// use statecore::{MachineConfig, MachineOptions};
///
/// #[derive(Clone, serde::Serialize)]
/// struct Ctx {
///     value: i64,
///     max: i64,
/// }
///
/// let options = MachineOptions::<Ctx>::new()
///     .guard("isAtMax", |ctx, _| ctx.value >= ctx.max)
///     .action("increment", |scope| scope.set(|ctx| ctx.value += 1).map_err(Into::into))
///     .delay("CHANGE_DELAY", 300)
///     .config(MachineConfig { id: Some("spin".into()), ..Default::default() });
///
/// assert!(options.has_guard("isAtMax"));
/// assert!(options.has_action("increment"));
/// assert!(options.has_delay("CHANGE_DELAY"));
/// ```
pub struct MachineOptions<C> {
    pub(crate) guards: HashMap<String, GuardFn<C>>,
    pub(crate) actions: HashMap<String, ActionFn<C>>,
    pub(crate) activities: HashMap<String, ActivityFn<C>>,
    pub(crate) delays: HashMap<String, Delay<C>>,
    pub(crate) computed: HashMap<String, ComputedFn<C>>,
    pub(crate) compare_fns: HashMap<String, CompareFn>,
    pub(crate) config: MachineConfig,
    pub(crate) scheduler: Option<Rc<dyn Scheduler>>,
}

impl<C> MachineOptions<C> {
    pub fn new() -> Self {
        Self {
            guards: HashMap::new(),
            actions: HashMap::new(),
            activities: HashMap::new(),
            delays: HashMap::new(),
            computed: HashMap::new(),
            compare_fns: HashMap::new(),
            config: MachineConfig::default(),
            scheduler: None,
        }
    }

    /// Register a named guard. Guards must be pure.
    pub fn guard<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&C, &Event) -> bool + 'static,
    {
        self.guards.insert(name.into(), Rc::new(predicate));
        self
    }

    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut Scope<'_, C>) -> Result<(), BoxError> + 'static,
    {
        self.actions.insert(name.into(), Rc::new(action));
        self
    }

    pub fn activity<F>(mut self, name: impl Into<String>, activity: F) -> Self
    where
        F: Fn(&mut Scope<'_, C>) -> Result<Option<Disposer>, BoxError> + 'static,
    {
        self.activities.insert(name.into(), Rc::new(activity));
        self
    }

    /// Register a named delay: milliseconds, a `Duration`, or
    /// [`Delay::dynamic`]. A delay defined as another name is rejected when
    /// the machine is created.
    pub fn delay(mut self, name: impl Into<String>, delay: impl Into<Delay<C>>) -> Self {
        self.delays.insert(name.into(), delay.into());
        self
    }

    pub fn computed<F>(mut self, name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&mut C) + 'static,
    {
        self.computed.insert(name.into(), Rc::new(compute));
        self
    }

    /// Replace deep equality for one watched key. `compare` returns `true`
    /// when the previous and next values count as equal.
    pub fn compare<F>(mut self, key: impl Into<String>, compare: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + 'static,
    {
        self.compare_fns.insert(key.into(), Rc::new(compare));
        self
    }

    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `scheduler` for `after` and `every` timers instead of a private
    /// [`ManualScheduler`](crate::ManualScheduler).
    pub fn scheduler<S: Scheduler + 'static>(mut self, scheduler: S) -> Self {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    pub fn has_guard(&self, name: &str) -> bool {
        self.guards.contains_key(name)
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn has_activity(&self, name: &str) -> bool {
        self.activities.contains_key(name)
    }

    pub fn has_delay(&self, name: &str) -> bool {
        self.delays.contains_key(name)
    }
}

impl<C> Default for MachineOptions<C> {
    fn default() -> Self {
        Self::new()
    }
}
