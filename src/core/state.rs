//! Runtime state of a machine.
//!
//! `RuntimeState` is the value handed to subscribers after every completed
//! transition. It is only ever mutated by the transition engine.

use super::event::{Event, INIT_EVENT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lifecycle of a machine, outside of its declared states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    /// Created, `start` not called yet. Events are ignored.
    NotStarted,
    /// Accepting events.
    Running,
    /// Terminal. Events are ignored.
    Stopped,
}

/// Snapshot of where a machine is.
///
/// # Example
///
/// ```rust
/// use statecore::{Event, MachineStatus, RuntimeState};
///
/// let state = RuntimeState {
///     value: Some("focused".to_string()),
///     previous_value: Some("idle".to_string()),
///     event: Event::new("INPUT.FOCUS"),
///     tags: ["focus".to_string()].into_iter().collect(),
///     changed: true,
///     status: MachineStatus::Running,
/// };
///
/// assert!(state.matches(&["focused", "spinning"]));
/// assert!(state.has_tag("focus"));
/// assert!(state.changed);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuntimeState {
    /// Current state id. `None` only before `start`.
    pub value: Option<String>,
    /// State id before the last state-changing transition.
    pub previous_value: Option<String>,
    /// Last event processed, matched or not.
    pub event: Event,
    /// Tags of the current state node.
    pub tags: BTreeSet<String>,
    /// Whether the last processed transition changed `value`.
    pub changed: bool,
    pub status: MachineStatus,
}

impl RuntimeState {
    pub(crate) fn not_started() -> Self {
        Self {
            value: None,
            previous_value: None,
            event: Event::new(INIT_EVENT),
            tags: BTreeSet::new(),
            changed: false,
            status: MachineStatus::NotStarted,
        }
    }

    /// Current state id, if started.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Whether the current state is any of `ids`.
    pub fn matches(&self, ids: &[&str]) -> bool {
        self.value
            .as_deref()
            .is_some_and(|value| ids.contains(&value))
    }

    /// Whether the current state carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_running(&self) -> bool {
        self.status == MachineStatus::Running
    }

    pub fn is_stopped(&self) -> bool {
        self.status == MachineStatus::Stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(value: &str, tags: &[&str]) -> RuntimeState {
        RuntimeState {
            value: Some(value.to_string()),
            previous_value: None,
            event: Event::new("GO"),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            changed: false,
            status: MachineStatus::Running,
        }
    }

    #[test]
    fn not_started_has_no_value() {
        let state = RuntimeState::not_started();
        assert_eq!(state.value(), None);
        assert!(!state.matches(&["idle"]));
        assert!(!state.is_running());
        assert!(!state.is_stopped());
        assert_eq!(state.event.kind(), INIT_EVENT);
    }

    #[test]
    fn matches_any_of_ids() {
        let state = running("spinning", &[]);
        assert!(state.matches(&["before:spin", "spinning"]));
        assert!(!state.matches(&["idle"]));
        assert!(!state.matches(&[]));
    }

    #[test]
    fn tags_are_non_exclusive() {
        let state = running("scrubbing", &["focus", "pointer"]);
        assert!(state.has_tag("focus"));
        assert!(state.has_tag("pointer"));
        assert!(!state.has_tag("open"));
    }

    #[test]
    fn status_serializes_in_snake_case() {
        let json = serde_json::to_string(&MachineStatus::NotStarted).unwrap();
        assert_eq!(json, "\"not_started\"");
    }

    #[test]
    fn runtime_state_roundtrips_through_json() {
        let state = running("idle", &["focus"]);
        let json = serde_json::to_string(&state).unwrap();
        let parsed: RuntimeState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }
}
