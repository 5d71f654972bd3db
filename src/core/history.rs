//! State transition history tracking.
//!
//! Keeps a bounded, ordered record of the state-changing transitions a
//! machine went through, for introspection and debugging tools.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single state change.
///
/// # Example
///
/// ```rust
/// use statecore::TransitionRecord;
/// use chrono::Utc;
///
/// let record = TransitionRecord {
///     from: Some("idle".to_string()),
///     to: "focused".to_string(),
///     event: "INPUT.FOCUS".to_string(),
///     timestamp: Utc::now(),
/// };
/// assert_eq!(record.to, "focused");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// The state being left. `None` for the transition into the initial state.
    pub from: Option<String>,
    /// The state being entered.
    pub to: String,
    /// Type of the event that caused the change.
    pub event: String,
    /// When the change happened.
    pub timestamp: DateTime<Utc>,
}

/// Ordered, bounded history of state changes.
///
/// Once `limit` records are held, recording drops the oldest one. A limit
/// of zero disables recording.
///
/// # Example
///
/// ```rust
/// use statecore::{StateHistory, TransitionRecord};
/// use chrono::Utc;
///
/// let mut history = StateHistory::new(8);
/// history.record(TransitionRecord {
///     from: None,
///     to: "idle".to_string(),
///     event: "machine.init".to_string(),
///     timestamp: Utc::now(),
/// });
/// history.record(TransitionRecord {
///     from: Some("idle".to_string()),
///     to: "focused".to_string(),
///     event: "INPUT.FOCUS".to_string(),
///     timestamp: Utc::now(),
/// });
///
/// assert_eq!(history.path(), vec!["idle", "focused"]);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StateHistory {
    limit: usize,
    transitions: Vec<TransitionRecord>,
}

impl StateHistory {
    /// Create an empty history holding at most `limit` records.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            transitions: Vec::new(),
        }
    }

    /// Record a transition, evicting the oldest record when full.
    pub fn record(&mut self, transition: TransitionRecord) {
        if self.limit == 0 {
            return;
        }
        if self.transitions.len() == self.limit {
            self.transitions.remove(0);
        }
        self.transitions.push(transition);
    }

    /// The path of state ids traversed: the `from` of the oldest held record
    /// (when there is one), then the `to` of each record.
    pub fn path(&self) -> Vec<&str> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(from) = self.transitions.first().and_then(|t| t.from.as_deref()) {
            path.push(from);
        }
        path.extend(self.transitions.iter().map(|t| t.to.as_str()));
        path
    }

    /// Time between the oldest and the newest held record.
    ///
    /// Returns `None` when empty.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.transitions.first()?, self.transitions.last()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    /// All held records, oldest first.
    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.transitions.clear();
    }
}
