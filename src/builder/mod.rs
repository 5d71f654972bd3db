//! Builder API for machine definitions.
//!
//! Definitions are plain data: states, candidates and references to named
//! guards, actions, activities and delays. Nothing is resolved until the
//! definition is handed to [`create_machine`](crate::create_machine).

pub mod error;
pub mod machine;
pub mod macros;
pub mod state;
pub mod transition;

pub use error::BuildError;
pub use machine::{MachineBuilder, MachineDefinition};
pub use state::{StateNode, TimerNode};
pub use transition::Transition;

use crate::core::Guard;

/// Create an unguarded transition to `target`.
///
/// # Example
///
/// ```
/// use statecore::builder::transition;
///
/// let t = transition::<()>("focused");
/// assert_eq!(t.target.as_deref(), Some("focused"));
/// assert!(t.guard.is_none());
/// ```
pub fn transition<C>(target: impl Into<String>) -> Transition<C> {
    Transition::to(target)
}

/// Create a transition to `target` taken only when `guard` holds.
///
/// # Example
///
/// ```
/// use statecore::builder::guarded;
/// use statecore::guards::not;
///
/// let t = guarded::<()>(not("isInRange"), "idle");
/// assert_eq!(format!("{:?}", t.guard), "Some(not(isInRange))");
/// ```
pub fn guarded<C>(guard: impl Into<Guard<C>>, target: impl Into<String>) -> Transition<C> {
    Transition::to(target).guard(guard)
}
