//! Serializable snapshots of a running machine.
//!
//! A snapshot is what state inspectors and visualizers consume: the runtime
//! state, the context and the recent transitions, stamped with an id and a
//! format version. Snapshots are read-only; they do not restore machines.

use crate::core::{RuntimeState, StateHistory};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod error;

pub use error::SnapshotError;

/// Version identifier for snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Point-in-time view of one machine.
///
/// Parse with `C = serde_json::Value` when the context type is unknown or
/// keys were omitted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot<C> {
    /// Snapshot format version
    pub version: u32,

    /// Unique snapshot identifier
    pub id: String,

    /// Id of the machine instance
    pub machine_id: String,

    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,

    pub state: RuntimeState,

    pub context: C,

    /// Recent transitions, oldest first
    pub history: StateHistory,
}

impl<C> Snapshot<C> {
    pub(crate) fn capture(
        machine_id: &str,
        state: RuntimeState,
        context: C,
        history: StateHistory,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            machine_id: machine_id.to_string(),
            timestamp: Utc::now(),
            state,
            context,
            history,
        }
    }
}

impl<C: Serialize> Snapshot<C> {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(SnapshotError::Encode)
    }

    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self)
            .map_err(SnapshotError::Encode)
    }

    /// Serialize with the given top-level context keys left out, e.g. large
    /// or sensitive fields a visualizer should not show.
    pub fn to_json_omitting(&self, keys: &[&str]) -> Result<String, SnapshotError> {
        let mut value = serde_json::to_value(self)
            .map_err(SnapshotError::Encode)?;
        if let Some(Value::Object(context)) = value.get_mut("context") {
            for key in keys {
                context.remove(*key);
            }
        }
        serde_json::to_string(&value).map_err(SnapshotError::Encode)
    }
}

impl<C: DeserializeOwned> Snapshot<C> {
    /// Parse a snapshot, rejecting formats newer than this crate knows.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let value: Value = serde_json::from_str(json)
            .map_err(SnapshotError::Malformed)?;
        let found = value
            .get("version")
            .and_then(Value::as_u64)
            .ok_or(SnapshotError::MissingVersion)?;
        if found != u64::from(SNAPSHOT_VERSION) {
            return Err(SnapshotError::VersionMismatch {
                found,
                expected: SNAPSHOT_VERSION,
            });
        }
        serde_json::from_value(value).map_err(SnapshotError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Event, MachineStatus};
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Ctx {
        value: String,
        accept: Vec<String>,
    }

    fn snapshot() -> Snapshot<Ctx> {
        let state = RuntimeState {
            value: Some("dragging".to_string()),
            previous_value: Some("idle".to_string()),
            event: Event::new("DROPZONE.DRAG_OVER").with("count", 2),
            tags: Default::default(),
            changed: true,
            status: MachineStatus::Running,
        };
        Snapshot::capture(
            "file-upload:1",
            state,
            Ctx {
                value: "report.pdf".to_string(),
                accept: vec!["application/pdf".to_string()],
            },
            StateHistory::new(4),
        )
    }

    #[test]
    fn json_round_trip_keeps_state_and_context() {
        let original = snapshot();
        let json = original.to_json().unwrap();
        let parsed: Snapshot<Ctx> = Snapshot::from_json(&json).unwrap();

        assert_eq!(parsed.version, SNAPSHOT_VERSION);
        assert_eq!(parsed.id, original.id);
        assert_eq!(parsed.machine_id, "file-upload:1");
        assert_eq!(parsed.state, original.state);
        assert_eq!(parsed.context, original.context);
    }

    #[test]
    fn event_is_written_with_type_field() {
        let json = snapshot().to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["state"]["event"], json!({ "type": "DROPZONE.DRAG_OVER", "count": 2 }));
        assert_eq!(value["state"]["status"], json!("running"));
    }

    #[test]
    fn omitted_keys_are_absent_from_context() {
        let json = snapshot().to_json_omitting(&["accept", "missing"]).unwrap();
        let parsed: Snapshot<Value> = Snapshot::from_json(&json).unwrap();
        assert_eq!(parsed.context, json!({ "value": "report.pdf" }));
    }

    #[test]
    fn newer_versions_are_rejected() {
        let mut value = serde_json::to_value(snapshot()).unwrap();
        value["version"] = json!(SNAPSHOT_VERSION + 1);

        let result = Snapshot::<Ctx>::from_json(&value.to_string());
        assert!(matches!(
            result,
            Err(SnapshotError::VersionMismatch { found, expected })
                if found == u64::from(SNAPSHOT_VERSION) + 1 && expected == SNAPSHOT_VERSION
        ));
    }

    #[test]
    fn unreadable_input_is_malformed_or_unversioned() {
        assert!(matches!(
            Snapshot::<Ctx>::from_json("not json"),
            Err(SnapshotError::Malformed(_))
        ));
        assert!(matches!(
            Snapshot::<Ctx>::from_json("{}"),
            Err(SnapshotError::MissingVersion)
        ));
    }

    #[test]
    fn wrong_context_shape_keeps_the_parser_error_as_source() {
        let mut value = serde_json::to_value(snapshot()).unwrap();
        value["context"] = json!(42);

        let err = Snapshot::<Ctx>::from_json(&value.to_string()).unwrap_err();
        assert_eq!(err.to_string(), "malformed snapshot");
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert!(source.is_some_and(|message| message.contains("invalid type")));
    }
}
