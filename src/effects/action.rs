//! Actions: side-effecting callbacks run on transitions, entry, exit and
//! watched-key changes.

use super::scope::Scope;
use crate::context::MachineContext;
use crate::core::{Guard, ResolvedGuard};
use crate::engine::MachineError;
use std::fmt;
use std::rc::Rc;

/// Error type returned by user callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An action callback.
pub type ActionFn<C> = Rc<dyn Fn(&mut Scope<'_, C>) -> Result<(), BoxError>>;

/// Reference to an action, as written in a machine definition.
pub enum Action<C> {
    /// Looked up in the action table of the machine options.
    Named(String),
    Inline(ActionFn<C>),
    /// Runs the actions of the first choice whose guard holds.
    Choose(Vec<Choice<C>>),
}

impl<C> Action<C> {
    pub fn new<F>(action: F) -> Self
    where
        F: Fn(&mut Scope<'_, C>) -> Result<(), BoxError> + 'static,
    {
        Action::Inline(Rc::new(action))
    }
}

impl<C> From<&str> for Action<C> {
    fn from(name: &str) -> Self {
        Action::Named(name.to_string())
    }
}

impl<C> From<String> for Action<C> {
    fn from(name: String) -> Self {
        Action::Named(name)
    }
}

impl<C> Clone for Action<C> {
    fn clone(&self) -> Self {
        match self {
            Action::Named(name) => Action::Named(name.clone()),
            Action::Inline(f) => Action::Inline(Rc::clone(f)),
            Action::Choose(choices) => Action::Choose(choices.clone()),
        }
    }
}

impl<C> fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Named(name) => f.write_str(name),
            Action::Inline(_) => f.write_str("<inline>"),
            Action::Choose(choices) => f.debug_list().entries(choices).finish(),
        }
    }
}

/// One branch of a [`choose`] action.
pub struct Choice<C> {
    pub guard: Option<Guard<C>>,
    pub actions: Vec<Action<C>>,
}

impl<C> Choice<C> {
    /// Branch taken when `guard` holds.
    pub fn when<G, I, A>(guard: G, actions: I) -> Self
    where
        G: Into<Guard<C>>,
        I: IntoIterator<Item = A>,
        A: Into<Action<C>>,
    {
        Self {
            guard: Some(guard.into()),
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }

    /// Unconditional branch.
    pub fn otherwise<I, A>(actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Action<C>>,
    {
        Self {
            guard: None,
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }
}

impl<C> Clone for Choice<C> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
            actions: self.actions.clone(),
        }
    }
}

impl<C> fmt::Debug for Choice<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Choice")
            .field("guard", &self.guard)
            .field("actions", &self.actions)
            .finish()
    }
}

/// Conditional action list: the first choice whose guard holds runs.
///
/// # Example
///
/// ```rust
/// use statecore::{choose, Action, Choice};
///
/// struct Ctx;
///
/// let entry: Action<Ctx> = choose([
///     Choice::when("isIncrementHint", ["increment"]),
///     Choice::when("isDecrementHint", ["decrement"]),
/// ]);
/// assert_eq!(
///     format!("{entry:?}"),
///     r#"[Choice { guard: Some(isIncrementHint), actions: [increment] }, Choice { guard: Some(isDecrementHint), actions: [decrement] }]"#
/// );
/// ```
pub fn choose<C, I>(choices: I) -> Action<C>
where
    I: IntoIterator<Item = Choice<C>>,
{
    Action::Choose(choices.into_iter().collect())
}

pub(crate) enum ResolvedAction<C> {
    Call { name: String, action: ActionFn<C> },
    Choose(Vec<ResolvedChoice<C>>),
}

pub(crate) struct ResolvedChoice<C> {
    pub(crate) guard: Option<ResolvedGuard<C>>,
    pub(crate) actions: Vec<ResolvedAction<C>>,
}

/// Run actions strictly in order. The first failure aborts the rest.
pub(crate) fn run_actions<C: MachineContext>(
    actions: &[ResolvedAction<C>],
    scope: &mut Scope<'_, C>,
) -> Result<(), MachineError> {
    for action in actions {
        match action {
            ResolvedAction::Call { name, action } => {
                tracing::trace!(machine = scope.machine_id(), action = %name, "running action");
                action(scope).map_err(|source| MachineError::Action {
                    name: name.clone(),
                    source,
                })?;
            }
            ResolvedAction::Choose(choices) => {
                let picked = choices.iter().find(|choice| {
                    choice
                        .guard
                        .as_ref()
                        .map_or(true, |guard| guard.check(scope.context(), scope.event()))
                });
                if let Some(choice) = picked {
                    run_actions(&choice.actions, scope)?;
                }
            }
        }
    }
    Ok(())
}
