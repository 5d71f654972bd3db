//! Events delivered to a machine.
//!
//! An event always carries a type. Everything else is payload, read by
//! guards and actions.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Event type used for the transition into the initial state.
pub const INIT_EVENT: &str = "machine.init";

/// Event type recorded when a machine is stopped.
pub const STOP_EVENT: &str = "machine.stop";

/// An event: a type plus an arbitrary JSON payload.
///
/// On the wire the type is stored under `"type"` and the payload fields are
/// flattened next to it, so `{"type": "VALUE.SET", "value": "4"}` is an
/// event of type `VALUE.SET` with one payload field.
///
/// # Example
///
/// ```rust
/// use statecore::Event;
///
/// let event = Event::new("VALUE.SET").with("value", "4").with("step", 2);
///
/// assert_eq!(event.kind(), "VALUE.SET");
/// assert_eq!(event.get_as::<String>("value").as_deref(), Some("4"));
/// assert_eq!(event.get_as::<u32>("step"), Some(2));
/// assert!(event.get("missing").is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Event {
    /// Create an event with an empty payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Map::new(),
        }
    }

    /// Add a payload field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// The event type.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Raw payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Payload field decoded into `T`. Returns `None` when the field is
    /// missing, `null`, or of another shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.payload.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => T::deserialize(value).ok(),
        }
    }

    pub(crate) fn init() -> Self {
        Self::new(INIT_EVENT)
    }
}

impl From<&str> for Event {
    fn from(kind: &str) -> Self {
        Event::new(kind)
    }
}

impl From<String> for Event {
    fn from(kind: String) -> Self {
        Event::new(kind)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_from_str_has_empty_payload() {
        let event = Event::from("INC");
        assert_eq!(event.kind(), "INC");
        assert!(event.payload.is_empty());
    }

    #[test]
    fn payload_fields_are_flattened_on_the_wire() {
        let event = Event::new("SCRUBBER.POINTER_MOVE")
            .with("hint", "increment")
            .with("point", json!({ "x": 1, "y": 2 }));

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "SCRUBBER.POINTER_MOVE",
                "hint": "increment",
                "point": { "x": 1, "y": 2 }
            })
        );

        let parsed: Event = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn get_as_treats_null_as_missing() {
        let event = Event::new("SET").with("value", Value::Null);
        assert_eq!(event.get_as::<String>("value"), None);
        assert!(event.get("value").is_some());
    }

    #[test]
    fn get_as_rejects_wrong_shape() {
        let event = Event::new("SET").with("value", "abc");
        assert_eq!(event.get_as::<u32>("value"), None);
    }

    #[test]
    fn display_prints_type() {
        assert_eq!(Event::new("GO").to_string(), "GO");
    }
}
