//! Transition candidates.

use crate::core::{Event, Guard};
use crate::effects::Action;
use std::fmt;

/// One candidate for handling an event.
///
/// Without a target the candidate is an in-state transition: its actions
/// run and nothing else happens. With a target (even the current state)
/// the state is exited and re-entered.
///
/// # Example
///
/// ```rust
/// use statecore::guards::not;
/// use statecore::Transition;
///
/// struct Ctx {
///     hint: Option<String>,
/// }
///
/// let commit: Transition<Ctx> = Transition::to("idle")
///     .guard(not("isInRange"))
///     .actions(["clampValue", "syncInputElement"]);
/// assert_eq!(commit.target.as_deref(), Some("idle"));
/// assert_eq!(commit.actions.len(), 2);
///
/// let move_up: Transition<Ctx> = Transition::new()
///     .when(|ctx: &Ctx, _| ctx.hint.as_deref() == Some("increment"))
///     .action("increment");
/// assert!(move_up.is_internal());
/// ```
pub struct Transition<C> {
    pub guard: Option<Guard<C>>,
    pub target: Option<String>,
    pub actions: Vec<Action<C>>,
}

impl<C> Transition<C> {
    /// An in-state transition with no guard and no actions.
    pub fn new() -> Self {
        Self {
            guard: None,
            target: None,
            actions: Vec::new(),
        }
    }

    /// A transition to `target`.
    pub fn to(target: impl Into<String>) -> Self {
        Self::new().target(target)
    }

    /// Set the target state.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Add a guard reference.
    pub fn guard(mut self, guard: impl Into<Guard<C>>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    /// Add a guard using a closure.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&C, &Event) -> bool + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Append one action.
    pub fn action(mut self, action: impl Into<Action<C>>) -> Self {
        self.actions.push(action.into());
        self
    }

    /// Append several actions, keeping their order.
    pub fn actions<I, A>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Action<C>>,
    {
        self.actions.extend(actions.into_iter().map(Into::into));
        self
    }

    /// Whether this candidate leaves the state untouched.
    pub fn is_internal(&self) -> bool {
        self.target.is_none()
    }
}

impl<C> Default for Transition<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Target shorthand: `"focused"` is `Transition::to("focused")`.
impl<C> From<&str> for Transition<C> {
    fn from(target: &str) -> Self {
        Transition::to(target)
    }
}

impl<C> From<String> for Transition<C> {
    fn from(target: String) -> Self {
        Transition::to(target)
    }
}

impl<C> Clone for Transition<C> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
            target: self.target.clone(),
            actions: self.actions.clone(),
        }
    }
}

impl<C> fmt::Debug for Transition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("guard", &self.guard)
            .field("target", &self.target)
            .field("actions", &self.actions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ctx;

    #[test]
    fn shorthand_sets_target_only() {
        let transition: Transition<Ctx> = "focused".into();
        assert_eq!(transition.target.as_deref(), Some("focused"));
        assert!(transition.guard.is_none());
        assert!(transition.actions.is_empty());
        assert!(!transition.is_internal());
    }

    #[test]
    fn actions_keep_declared_order() {
        let transition: Transition<Ctx> = Transition::new()
            .action("focusInput")
            .actions(["invokeOnFocus", "setHint"])
            .action("setCursorPoint");
        let names: Vec<String> = transition.actions.iter().map(|a| format!("{a:?}")).collect();
        assert_eq!(names, ["focusInput", "invokeOnFocus", "setHint", "setCursorPoint"]);
    }

    #[test]
    fn later_guard_replaces_earlier() {
        let transition: Transition<Ctx> = Transition::to("B").guard("first").guard("second");
        assert_eq!(format!("{:?}", transition.guard), "Some(second)");
    }

    #[test]
    fn default_is_internal() {
        assert!(Transition::<Ctx>::default().is_internal());
    }
}
