//! User-supplied effects and the handles around them.
//!
//! # Key Concepts
//!
//! - **Actions**: callbacks run in declared order on transitions, entry,
//!   exit, and watched-key changes
//! - **Activities**: effects started on state entry and released on exit
//! - **Delays**: timing values for `after` and `every` timers
//! - **Disposers**: idempotent release handles
//! - **Scope**: what a callback sees of the machine while it runs

mod action;
mod activity;
mod delay;
mod disposer;
mod scope;

pub use action::{choose, Action, ActionFn, BoxError, Choice};
pub use activity::{Activity, ActivityFn};
pub use delay::{Delay, DelayFn};
pub use disposer::Disposer;
pub use scope::Scope;

pub(crate) use action::{run_actions, ResolvedAction, ResolvedChoice};
pub(crate) use activity::{ActivityManager, ResolvedActivity};
pub(crate) use delay::ResolvedDelay;
