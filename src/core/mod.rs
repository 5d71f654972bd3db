//! Core value types of the runtime.
//!
//! This module contains the pieces that carry no behavior of their own:
//! - Events and their payloads
//! - Guard references and their evaluation
//! - The runtime state handed to subscribers
//! - Bounded transition history
//!
//! Everything here is pure; effects live in [`crate::effects`].

mod event;
mod guard;
mod history;
mod state;

pub use event::{Event, INIT_EVENT, STOP_EVENT};
pub use guard::{and, not, or, Guard, GuardFn};
pub use history::{StateHistory, TransitionRecord};
pub use state::{MachineStatus, RuntimeState};

pub(crate) use guard::ResolvedGuard;
