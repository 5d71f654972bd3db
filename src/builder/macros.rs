//! Macros for ergonomic event construction.

/// Build an [`Event`](crate::Event) with payload fields.
///
/// Field names are identifiers or string literals; values are anything
/// convertible into `serde_json::Value`.
///
/// # Example
///
/// ```
/// use statecore::event;
///
/// let set = event!("VALUE.SET", value = "5", step = 2);
/// assert_eq!(set.kind(), "VALUE.SET");
/// assert_eq!(set.get_as::<String>("value").as_deref(), Some("5"));
/// assert_eq!(set.get_as::<i64>("step"), Some(2));
///
/// let point = event!("SCRUBBER.POINTER_MOVE", "point.x" = 10.5);
/// assert_eq!(point.get_as::<f64>("point.x"), Some(10.5));
/// ```
#[macro_export]
macro_rules! event {
    (@key $key:ident) => {
        stringify!($key)
    };
    (@key $key:literal) => {
        $key
    };
    ($kind:expr $(,)?) => {
        $crate::Event::new($kind)
    };
    ($kind:expr, $($key:tt = $value:expr),+ $(,)?) => {
        $crate::Event::new($kind)
            $(.with($crate::event!(@key $key), $value))+
    };
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    #[test]
    fn event_macro_without_payload() {
        let event = event!("INPUT.FOCUS");
        assert_eq!(event.kind(), "INPUT.FOCUS");
        assert!(event.payload.is_empty());
    }

    #[test]
    fn event_macro_builds_payload_in_order() {
        let event = event!("TRIGGER.PRESS_DOWN", hint = "increment", pointer_type = "mouse",);
        assert_eq!(event.get("hint"), Some(&json!("increment")));
        assert_eq!(event.get("pointer_type"), Some(&json!("mouse")));
        assert_eq!(event.payload.len(), 2);
    }

    #[test]
    fn event_macro_accepts_string_keys_and_json_values() {
        let event = event!("VALUE.SET", "value" = json!({ "raw": "1,000" }));
        assert_eq!(event.get("value"), Some(&json!({ "raw": "1,000" })));
    }
}
