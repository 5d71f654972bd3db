//! The transition engine and the machine built on it.
//!
//! # Key Concepts
//!
//! - **Resolution**: named references are bound once, at creation, and all
//!   problems are reported together
//! - **Run-to-completion**: messages are processed one at a time from a
//!   FIFO queue; re-entrant sends are queued
//! - **Timers**: armed through a [`Scheduler`] and invalidated on state exit

mod error;
mod machine;
mod resolve;
mod scheduler;
mod transition;

pub use error::{ConfigurationError, MachineError};
pub use machine::{create_machine, Machine, MachineHandle};
#[cfg(feature = "tokio")]
pub use scheduler::TokioScheduler;
pub use scheduler::{ManualScheduler, Scheduler};

pub(crate) use resolve::{resolve, ResolvedMachine};
