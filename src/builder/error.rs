//! Build errors for machine definitions.

use thiserror::Error;

/// Errors that can occur when building a machine definition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("Context not specified. Call .context(value) before .build()")]
    MissingContext,

    #[error("No states defined. Add at least one state")]
    NoStates,

    #[error("State \"{0}\" is declared more than once")]
    DuplicateState(String),
}
