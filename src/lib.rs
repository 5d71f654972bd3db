//! Statecore: a framework-agnostic state machine runtime for UI widgets
//!
//! Widget behavior (comboboxes, menus, number inputs, carousels) is written
//! once as a declarative machine definition and executed by this runtime,
//! independently of any rendering framework. Framework bindings subscribe to
//! the machine and funnel DOM events into `send`.
//!
//! # Core Concepts
//!
//! - **Definitions**: states, event candidates, entry/exit actions,
//!   activities, `after`/`every` timers and tags, built with [`MachineBuilder`]
//! - **Options**: named guards, actions, activities, delays and computed
//!   fields, resolved once when the machine is created
//! - **Context**: the widget's data, mutated only through [`Scope::set`],
//!   which recomputes derived fields and fires watch actions
//! - **Run-to-completion**: events sent while a transition runs are queued
//!   and processed after it completes
//!
//! # Example
//!
//! ```rust
//! use statecore::{create_machine, MachineBuilder, MachineOptions, StateNode, Transition};
//!
//! #[derive(Clone, serde::Serialize)]
//! struct Ctx {
//!     can_go: bool,
//! }
//!
//! let definition = MachineBuilder::new()
//!     .initial("A")
//!     .context(Ctx { can_go: false })
//!     .state(
//!         "A",
//!         StateNode::new()
//!             .on("GO", Transition::to("B").guard("canGo"))
//!             .on("GO", "C"),
//!     )
//!     .state("B", StateNode::new())
//!     .state("C", StateNode::new().tag("fallback"))
//!     .build()
//!     .unwrap();
//! let options = MachineOptions::<Ctx>::new().guard("canGo", |ctx, _| ctx.can_go);
//!
//! let machine = create_machine(&definition, &options).unwrap();
//! machine.start().unwrap();
//! machine.send("GO").unwrap();
//!
//! let state = machine.state();
//! assert_eq!(state.value(), Some("C"));
//! assert!(state.has_tag("fallback"));
//! ```

pub mod builder;
pub mod context;
pub mod core;
pub mod effects;
pub mod engine;
pub mod options;
pub mod snapshot;

/// Guard combinators.
pub mod guards {
    pub use crate::core::{and, not, or};
}

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder, MachineDefinition, StateNode, TimerNode, Transition};
pub use context::{Computed, ContextStore, MachineContext};
pub use core::{Event, Guard, MachineStatus, RuntimeState, StateHistory, TransitionRecord};
pub use effects::{choose, Action, Activity, BoxError, Choice, Delay, Disposer, Scope};
#[cfg(feature = "tokio")]
pub use engine::TokioScheduler;
pub use engine::{
    create_machine, ConfigurationError, Machine, MachineError, MachineHandle, ManualScheduler,
    Scheduler,
};
pub use options::{MachineConfig, MachineOptions};
pub use snapshot::{Snapshot, SnapshotError};
