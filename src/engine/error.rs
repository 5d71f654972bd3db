//! Errors raised while resolving and running machines.

use crate::effects::BoxError;
use thiserror::Error;

/// One unresolvable reference or inconsistency in a machine definition.
///
/// `location` names where the reference was written, e.g.
/// `state "focused" on "INPUT.BLUR"` or `watch "value"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("unknown guard \"{name}\" referenced by {location}")]
    UnknownGuard { name: String, location: String },

    #[error("unknown action \"{name}\" referenced by {location}")]
    UnknownAction { name: String, location: String },

    #[error("unknown activity \"{name}\" referenced by {location}")]
    UnknownActivity { name: String, location: String },

    #[error("unknown delay \"{name}\" referenced by {location}")]
    UnknownDelay { name: String, location: String },

    #[error("unknown computed field \"{name}\" referenced by {location}")]
    UnknownComputed { name: String, location: String },

    #[error("unknown target state \"{target}\" referenced by {location}")]
    UnknownTarget { target: String, location: String },

    #[error("initial state \"{0}\" is not declared")]
    UnknownInitialState(String),

    #[error("watched key \"{0}\" does not exist in the context")]
    UnknownWatchKey(String),

    #[error("delay \"{0}\" is defined as another named delay")]
    IndirectDelay(String),

    #[error("context cannot be serialized: {0}")]
    UnserializableContext(String),
}

/// Errors surfaced by [`create_machine`](crate::create_machine) and by the
/// `start`, `send` and `stop` entry points of a machine.
#[derive(Debug, Error)]
pub enum MachineError {
    /// The definition references names the options do not provide.
    #[error("invalid machine definition ({} error(s)): {}", .errors.len(), summarize(.errors))]
    Configuration { errors: Vec<ConfigurationError> },

    /// An action returned an error. The transition stopped at that action.
    #[error("action \"{name}\" failed: {source}")]
    Action {
        name: String,
        #[source]
        source: BoxError,
    },

    /// An activity failed to start.
    #[error("activity \"{name}\" failed to start: {source}")]
    Activity {
        name: String,
        #[source]
        source: BoxError,
    },

    /// The context could not be serialized for watched-key diffing.
    #[error("context serialization failed: {0}")]
    Context(#[from] serde_json::Error),
}

impl MachineError {
    /// The configuration errors, if this is a configuration failure.
    pub fn configuration_errors(&self) -> &[ConfigurationError] {
        match self {
            MachineError::Configuration { errors } => errors,
            _ => &[],
        }
    }
}

fn summarize(errors: &[ConfigurationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_message_lists_every_error() {
        let err = MachineError::Configuration {
            errors: vec![
                ConfigurationError::UnknownGuard {
                    name: "canGo".into(),
                    location: "state \"A\" on \"GO\"".into(),
                },
                ConfigurationError::UnknownInitialState("start".into()),
            ],
        };
        assert_eq!(
            err.to_string(),
            "invalid machine definition (2 error(s)): unknown guard \"canGo\" referenced by \
             state \"A\" on \"GO\"; initial state \"start\" is not declared"
        );
        assert_eq!(err.configuration_errors().len(), 2);
    }

    #[test]
    fn action_error_keeps_source() {
        use std::error::Error as _;

        let err = MachineError::Action {
            name: "focusInput".into(),
            source: "element missing".into(),
        };
        assert_eq!(err.to_string(), "action \"focusInput\" failed: element missing");
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("element missing")
        );
        assert!(err.configuration_errors().is_empty());
    }
}
