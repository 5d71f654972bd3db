//! Guard predicates for controlling transitions.
//!
//! Guards are pure boolean functions of the context and the triggering
//! event. A definition refers to them by name, inline, as a literal, or
//! through the `and`/`or`/`not` combinators. Names are bound to functions
//! once, when the machine is created.

use super::event::Event;
use std::fmt;
use std::rc::Rc;

/// A guard predicate over context and event.
pub type GuardFn<C> = Rc<dyn Fn(&C, &Event) -> bool>;

/// Reference to a guard, as written in a machine definition.
///
/// # Example
///
/// ```rust
/// use statecore::guards::{and, not};
/// use statecore::Guard;
///
/// struct Ctx {
///     clamp_on_blur: bool,
/// }
///
/// let inline: Guard<Ctx> = Guard::new(|ctx: &Ctx, _| ctx.clamp_on_blur);
/// let combined: Guard<Ctx> = and([Guard::from("clampValueOnBlur"), not("isInRange")]);
///
/// assert_eq!(format!("{combined:?}"), "and(clampValueOnBlur, not(isInRange))");
/// # let _ = inline;
/// ```
pub enum Guard<C> {
    /// Looked up in the guard table of the machine options.
    Named(String),
    Inline(GuardFn<C>),
    Literal(bool),
    And(Vec<Guard<C>>),
    Or(Vec<Guard<C>>),
    Not(Box<Guard<C>>),
}

impl<C> Guard<C> {
    /// Create a guard from a pure predicate.
    ///
    /// The predicate must be deterministic and free of side effects.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&C, &Event) -> bool + 'static,
    {
        Guard::Inline(Rc::new(predicate))
    }

    /// Refer to a guard registered under `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Guard::Named(name.into())
    }
}

/// Guard that holds when every operand holds. An empty `and` holds.
pub fn and<C, I, G>(guards: I) -> Guard<C>
where
    I: IntoIterator<Item = G>,
    G: Into<Guard<C>>,
{
    Guard::And(guards.into_iter().map(Into::into).collect())
}

/// Guard that holds when any operand holds. An empty `or` does not hold.
pub fn or<C, I, G>(guards: I) -> Guard<C>
where
    I: IntoIterator<Item = G>,
    G: Into<Guard<C>>,
{
    Guard::Or(guards.into_iter().map(Into::into).collect())
}

/// Guard that inverts its operand.
pub fn not<C>(guard: impl Into<Guard<C>>) -> Guard<C> {
    Guard::Not(Box::new(guard.into()))
}

impl<C> From<&str> for Guard<C> {
    fn from(name: &str) -> Self {
        Guard::Named(name.to_string())
    }
}

impl<C> From<String> for Guard<C> {
    fn from(name: String) -> Self {
        Guard::Named(name)
    }
}

impl<C> From<bool> for Guard<C> {
    fn from(value: bool) -> Self {
        Guard::Literal(value)
    }
}

impl<C> Clone for Guard<C> {
    fn clone(&self) -> Self {
        match self {
            Guard::Named(name) => Guard::Named(name.clone()),
            Guard::Inline(f) => Guard::Inline(Rc::clone(f)),
            Guard::Literal(value) => Guard::Literal(*value),
            Guard::And(guards) => Guard::And(guards.clone()),
            Guard::Or(guards) => Guard::Or(guards.clone()),
            Guard::Not(guard) => Guard::Not(guard.clone()),
        }
    }
}

impl<C> fmt::Debug for Guard<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Named(name) => f.write_str(name),
            Guard::Inline(_) => f.write_str("<inline>"),
            Guard::Literal(value) => write!(f, "{value}"),
            Guard::And(guards) => write_list(f, "and", guards),
            Guard::Or(guards) => write_list(f, "or", guards),
            Guard::Not(guard) => write!(f, "not({guard:?})"),
        }
    }
}

fn write_list<C>(f: &mut fmt::Formatter<'_>, op: &str, guards: &[Guard<C>]) -> fmt::Result {
    write!(f, "{op}(")?;
    for (i, guard) in guards.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{guard:?}")?;
    }
    f.write_str(")")
}

/// A guard with every name bound to its function.
pub(crate) enum ResolvedGuard<C> {
    Predicate { name: String, predicate: GuardFn<C> },
    Literal(bool),
    And(Vec<ResolvedGuard<C>>),
    Or(Vec<ResolvedGuard<C>>),
    Not(Box<ResolvedGuard<C>>),
}

impl<C> ResolvedGuard<C> {
    /// Evaluate the guard. Pure: no context access beyond reading.
    pub(crate) fn check(&self, context: &C, event: &Event) -> bool {
        match self {
            ResolvedGuard::Predicate { predicate, .. } => predicate(context, event),
            ResolvedGuard::Literal(value) => *value,
            ResolvedGuard::And(guards) => guards.iter().all(|g| g.check(context, event)),
            ResolvedGuard::Or(guards) => guards.iter().any(|g| g.check(context, event)),
            ResolvedGuard::Not(guard) => !guard.check(context, event),
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            ResolvedGuard::Predicate { name, .. } => name.clone(),
            ResolvedGuard::Literal(value) => value.to_string(),
            ResolvedGuard::And(guards) => describe_list("and", guards),
            ResolvedGuard::Or(guards) => describe_list("or", guards),
            ResolvedGuard::Not(guard) => format!("not({})", guard.describe()),
        }
    }
}

fn describe_list<C>(op: &str, guards: &[ResolvedGuard<C>]) -> String {
    let inner: Vec<String> = guards.iter().map(ResolvedGuard::describe).collect();
    format!("{op}({})", inner.join(", "))
}
