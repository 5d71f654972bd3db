//! Binding a definition's named references to the implementations in the
//! options.
//!
//! Resolution runs once, when the machine is created. Every problem found is
//! accumulated with `Validation` rather than stopping at the first one, so a
//! widget author sees all the missing names together.

use super::error::{ConfigurationError, MachineError};
use crate::builder::{MachineDefinition, StateNode, TimerNode, Transition};
use crate::context::{Computed, ContextStore, MachineContext};
use crate::core::{Guard, ResolvedGuard};
use crate::effects::{
    Action, Activity, Delay, ResolvedAction, ResolvedActivity, ResolvedChoice, ResolvedDelay,
};
use crate::options::MachineOptions;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

pub(crate) struct ResolvedTransition<C> {
    pub(crate) guard: Option<ResolvedGuard<C>>,
    pub(crate) target: Option<String>,
    pub(crate) actions: Vec<ResolvedAction<C>>,
}

impl<C> ResolvedTransition<C> {
    pub(crate) fn enabled(&self, context: &C, event: &crate::core::Event) -> bool {
        self.guard
            .as_ref()
            .map_or(true, |guard| guard.check(context, event))
    }
}

pub(crate) struct ResolvedTimer<C> {
    pub(crate) delay: ResolvedDelay<C>,
    /// Names the timer in the event it dispatches.
    pub(crate) label: String,
    pub(crate) transitions: Vec<ResolvedTransition<C>>,
}

pub(crate) struct ResolvedState<C> {
    pub(crate) entry: Vec<ResolvedAction<C>>,
    pub(crate) exit: Vec<ResolvedAction<C>>,
    pub(crate) on: HashMap<String, Vec<ResolvedTransition<C>>>,
    pub(crate) activities: Vec<ResolvedActivity<C>>,
    pub(crate) after: Vec<ResolvedTimer<C>>,
    pub(crate) every: Vec<ResolvedTimer<C>>,
    pub(crate) tags: BTreeSet<String>,
}

pub(crate) struct ResolvedWatch<C> {
    pub(crate) key: String,
    pub(crate) actions: Vec<ResolvedAction<C>>,
}

/// A definition with every name bound. This is what the engine executes.
pub(crate) struct ResolvedMachine<C> {
    pub(crate) key: String,
    pub(crate) initial: String,
    pub(crate) states: HashMap<String, ResolvedState<C>>,
    pub(crate) on: HashMap<String, Vec<ResolvedTransition<C>>>,
    pub(crate) entry: Vec<ResolvedAction<C>>,
    pub(crate) exit: Vec<ResolvedAction<C>>,
    pub(crate) activities: Vec<ResolvedActivity<C>>,
    /// Positions match the watch positions of the context store.
    pub(crate) watches: Vec<ResolvedWatch<C>>,
}

impl<C> ResolvedMachine<C> {
    /// Candidates for `event` in `state`, falling back to machine-level
    /// handlers when the state declares none.
    pub(crate) fn candidates(&self, state: &str, event: &str) -> &[ResolvedTransition<C>] {
        self.states
            .get(state)
            .and_then(|node| node.on.get(event))
            .or_else(|| self.on.get(event))
            .map_or(&[], Vec::as_slice)
    }
}

pub(crate) struct Compiled<C> {
    pub(crate) machine: ResolvedMachine<C>,
    pub(crate) store: ContextStore<C>,
}

/// Resolve `definition` against `options`.
pub(crate) fn resolve<C: MachineContext>(
    definition: &MachineDefinition<C>,
    options: &MachineOptions<C>,
) -> Result<Compiled<C>, MachineError> {
    let mut resolver = Resolver::new(definition, options);

    resolver.check(
        resolver.declared.contains(definition.initial.as_str()),
        || ConfigurationError::UnknownInitialState(definition.initial.clone()),
    );
    resolver.check_delay_table();

    let states = definition
        .states
        .iter()
        .map(|(id, node)| (id.clone(), resolver.state(id, node)))
        .collect();
    let on = resolver.handlers(&definition.on, "machine");
    let entry = resolver.actions(&definition.entry, "machine entry");
    let exit = resolver.actions(&definition.exit, "machine exit");
    let activities = resolver.activities(&definition.activities, "machine");
    let watches: Vec<ResolvedWatch<C>> = definition
        .watch
        .iter()
        .map(|(key, actions)| ResolvedWatch {
            key: key.clone(),
            actions: resolver.actions(actions, &format!("watch \"{key}\"")),
        })
        .collect();
    let store = resolver.store();

    resolver.finish()?;

    Ok(Compiled {
        machine: ResolvedMachine {
            key: definition.id.clone(),
            initial: definition.initial.clone(),
            states,
            on,
            entry,
            exit,
            activities,
            watches,
        },
        store,
    })
}

struct Resolver<'a, C> {
    definition: &'a MachineDefinition<C>,
    options: &'a MachineOptions<C>,
    declared: HashSet<&'a str>,
    checks: Vec<Validation<(), NonEmptyVec<ConfigurationError>>>,
}

impl<'a, C: MachineContext> Resolver<'a, C> {
    fn new(definition: &'a MachineDefinition<C>, options: &'a MachineOptions<C>) -> Self {
        Self {
            definition,
            options,
            declared: definition.states.iter().map(|(id, _)| id.as_str()).collect(),
            checks: Vec::new(),
        }
    }

    fn check(&mut self, ok: bool, error: impl FnOnce() -> ConfigurationError) {
        let check = if ok {
            Validation::success(())
        } else {
            Validation::fail(error())
        };
        self.checks.push(check);
    }

    fn fail(&mut self, error: ConfigurationError) {
        self.checks.push(Validation::fail(error));
    }

    fn finish(self) -> Result<(), MachineError> {
        match Validation::all_vec(self.checks).map(|_| ()) {
            Validation::Success(_) => Ok(()),
            Validation::Failure(errors) => Err(MachineError::Configuration {
                errors: errors.iter().cloned().collect(),
            }),
        }
    }

    fn check_delay_table(&mut self) {
        let options = self.options;
        let mut indirect: Vec<&String> = options
            .delays
            .iter()
            .filter(|(_, delay)| matches!(delay, Delay::Named(_)))
            .map(|(name, _)| name)
            .collect();
        indirect.sort();
        for name in indirect {
            self.fail(ConfigurationError::IndirectDelay(name.clone()));
        }
    }

    fn state(&mut self, id: &str, node: &StateNode<C>) -> ResolvedState<C> {
        let location = format!("state \"{id}\"");
        ResolvedState {
            entry: self.actions(&node.entry, &format!("{location} entry")),
            exit: self.actions(&node.exit, &format!("{location} exit")),
            on: self.handlers(&node.on, &location),
            activities: self.activities(&node.activities, &location),
            after: self.timers(&node.after, &location, "after"),
            every: self.timers(&node.every, &location, "every"),
            tags: node.tags.clone(),
        }
    }

    fn handlers(
        &mut self,
        on: &[(String, Vec<Transition<C>>)],
        owner: &str,
    ) -> HashMap<String, Vec<ResolvedTransition<C>>> {
        on.iter()
            .map(|(event, candidates)| {
                let location = format!("{owner} on \"{event}\"");
                (event.clone(), self.transitions(candidates, &location))
            })
            .collect()
    }

    fn timers(
        &mut self,
        timers: &[TimerNode<C>],
        owner: &str,
        kind: &str,
    ) -> Vec<ResolvedTimer<C>> {
        timers
            .iter()
            .enumerate()
            .map(|(index, timer)| {
                let label = match &timer.delay {
                    Delay::Fixed(duration) => format!("{}ms", duration.as_millis()),
                    Delay::Named(name) => name.clone(),
                    Delay::Dynamic(_) => format!("dynamic#{index}"),
                };
                let location = format!("{owner} {kind} \"{label}\"");
                ResolvedTimer {
                    delay: self.delay(&timer.delay, &location),
                    transitions: self.transitions(&timer.transitions, &location),
                    label,
                }
            })
            .collect()
    }

    fn transitions(
        &mut self,
        candidates: &[Transition<C>],
        location: &str,
    ) -> Vec<ResolvedTransition<C>> {
        candidates
            .iter()
            .map(|candidate| {
                if let Some(target) = &candidate.target {
                    self.check(self.declared.contains(target.as_str()), || {
                        ConfigurationError::UnknownTarget {
                            target: target.clone(),
                            location: location.to_string(),
                        }
                    });
                }
                ResolvedTransition {
                    guard: candidate.guard.as_ref().map(|g| self.guard(g, location)),
                    target: candidate.target.clone(),
                    actions: self.actions(&candidate.actions, location),
                }
            })
            .collect()
    }

    fn guard(&mut self, guard: &Guard<C>, location: &str) -> ResolvedGuard<C> {
        match guard {
            Guard::Named(name) => match self.options.guards.get(name) {
                Some(predicate) => ResolvedGuard::Predicate {
                    name: name.clone(),
                    predicate: Rc::clone(predicate),
                },
                None => {
                    self.fail(ConfigurationError::UnknownGuard {
                        name: name.clone(),
                        location: location.to_string(),
                    });
                    ResolvedGuard::Literal(false)
                }
            },
            Guard::Inline(predicate) => ResolvedGuard::Predicate {
                name: "<inline>".to_string(),
                predicate: Rc::clone(predicate),
            },
            Guard::Literal(value) => ResolvedGuard::Literal(*value),
            Guard::And(guards) => {
                ResolvedGuard::And(guards.iter().map(|g| self.guard(g, location)).collect())
            }
            Guard::Or(guards) => {
                ResolvedGuard::Or(guards.iter().map(|g| self.guard(g, location)).collect())
            }
            Guard::Not(guard) => ResolvedGuard::Not(Box::new(self.guard(guard, location))),
        }
    }

    fn actions(&mut self, actions: &[Action<C>], location: &str) -> Vec<ResolvedAction<C>> {
        actions
            .iter()
            .filter_map(|action| self.action(action, location))
            .collect()
    }

    fn action(&mut self, action: &Action<C>, location: &str) -> Option<ResolvedAction<C>> {
        match action {
            Action::Named(name) => match self.options.actions.get(name) {
                Some(f) => Some(ResolvedAction::Call {
                    name: name.clone(),
                    action: Rc::clone(f),
                }),
                None => {
                    self.fail(ConfigurationError::UnknownAction {
                        name: name.clone(),
                        location: location.to_string(),
                    });
                    None
                }
            },
            Action::Inline(f) => Some(ResolvedAction::Call {
                name: "<inline>".to_string(),
                action: Rc::clone(f),
            }),
            Action::Choose(choices) => Some(ResolvedAction::Choose(
                choices
                    .iter()
                    .map(|choice| ResolvedChoice {
                        guard: choice.guard.as_ref().map(|g| self.guard(g, location)),
                        actions: self.actions(&choice.actions, location),
                    })
                    .collect(),
            )),
        }
    }

    fn activities(
        &mut self,
        activities: &[Activity<C>],
        location: &str,
    ) -> Vec<ResolvedActivity<C>> {
        activities
            .iter()
            .filter_map(|activity| match activity {
                Activity::Named(name) => match self.options.activities.get(name) {
                    Some(f) => Some(ResolvedActivity {
                        name: name.clone(),
                        start: Rc::clone(f),
                    }),
                    None => {
                        self.fail(ConfigurationError::UnknownActivity {
                            name: name.clone(),
                            location: location.to_string(),
                        });
                        None
                    }
                },
                Activity::Inline(f) => Some(ResolvedActivity {
                    name: "<inline>".to_string(),
                    start: Rc::clone(f),
                }),
            })
            .collect()
    }

    fn delay(&mut self, delay: &Delay<C>, location: &str) -> ResolvedDelay<C> {
        match delay {
            Delay::Fixed(duration) => ResolvedDelay::Fixed(*duration),
            Delay::Dynamic(f) => ResolvedDelay::Dynamic(Rc::clone(f)),
            Delay::Named(name) => match self.options.delays.get(name) {
                Some(Delay::Fixed(duration)) => ResolvedDelay::Fixed(*duration),
                Some(Delay::Dynamic(f)) => ResolvedDelay::Dynamic(Rc::clone(f)),
                // Reported once by the delay table check.
                Some(Delay::Named(_)) => ResolvedDelay::Fixed(Duration::ZERO),
                None => {
                    self.fail(ConfigurationError::UnknownDelay {
                        name: name.clone(),
                        location: location.to_string(),
                    });
                    ResolvedDelay::Fixed(Duration::ZERO)
                }
            },
        }
    }

    /// Build the context store: derived fields in declaration order, then
    /// watched keys in declaration order, each with its compare function.
    fn store(&mut self) -> ContextStore<C> {
        let definition = self.definition;
        let options = self.options;
        let mut store = ContextStore::new(definition.context.clone());

        for computed in &definition.computed {
            match computed {
                Computed::Inline { name, compute } => {
                    store.push_computed(name.clone(), Rc::clone(compute));
                }
                Computed::Named(name) => match options.computed.get(name) {
                    Some(compute) => store.push_computed(name.clone(), Rc::clone(compute)),
                    None => self.fail(ConfigurationError::UnknownComputed {
                        name: name.clone(),
                        location: "computed".to_string(),
                    }),
                },
            }
        }

        for (key, _) in &definition.watch {
            let compare = options.compare_fns.get(key).cloned();
            store.push_watch(key.clone(), compare);
        }

        store.recompute_derived();
        match store.missing_watch_keys() {
            Ok(missing) => {
                let missing: Vec<String> = missing.into_iter().map(str::to_string).collect();
                for key in missing {
                    self.fail(ConfigurationError::UnknownWatchKey(key));
                }
            }
            Err(err) => self.fail(ConfigurationError::UnserializableContext(err.to_string())),
        }
        store
    }
}
