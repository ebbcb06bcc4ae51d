//! Core protocol types: the decoded event and its payload.
//!
//! A [`StreamEvent`] is built once per complete frame on the wire, handed
//! to the dispatcher, and then dropped. Nothing in the client keeps it.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Event type used when a frame carries no `event:` line.
pub const DEFAULT_EVENT_TYPE: &str = "message";

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// The body of an event.
///
/// The upstream server usually sends JSON, but the decoder never rejects a
/// frame because its data isn't valid JSON: it keeps the raw text instead.
/// Liveness of the feed matters more than strictness.
///
/// `#[serde(untagged)]` serializes the inner value directly, so
/// `Payload::Json({"a":1})` becomes `{"a":1}` and `Payload::Text("hi")`
/// becomes `"hi"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// The joined `data:` text parsed as JSON.
    Json(serde_json::Value),
    /// The joined `data:` text, verbatim, because it wasn't valid JSON.
    Text(String),
}

impl Payload {
    /// Parses `text` as JSON, falling back to raw text on failure.
    pub fn parse(text: impl Into<String>) -> Self {
        let text = text.into();
        match serde_json::from_str(&text) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(text),
        }
    }

    /// Returns the JSON value, if this payload is structured.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Returns the raw text, if this payload failed to parse as JSON.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Json(_) => None,
            Self::Text(text) => Some(text),
        }
    }

    /// Looks up a top-level field of a JSON object payload.
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.as_json().and_then(|value| value.get(field))
    }

    /// Returns `true` for payloads that carry nothing to show:
    /// JSON `null`, `false`, `0`, `""`, or empty raw text.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Json(serde_json::Value::Null) => true,
            Self::Json(serde_json::Value::Bool(b)) => !b,
            Self::Json(serde_json::Value::Number(n)) => n.as_f64() == Some(0.0),
            Self::Json(serde_json::Value::String(s)) => s.is_empty(),
            Self::Json(_) => false,
            Self::Text(text) => text.is_empty(),
        }
    }

    /// Deserializes a JSON payload into `T`.
    ///
    /// # Errors
    /// - [`ProtocolError::InvalidMessage`] if the payload is raw text
    /// - [`ProtocolError::Decode`] if the JSON doesn't match `T`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        match self {
            Self::Json(value) => T::deserialize(value).map_err(ProtocolError::Decode),
            Self::Text(_) => Err(ProtocolError::InvalidMessage(
                "payload is raw text, not JSON".into(),
            )),
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

// ---------------------------------------------------------------------------
// StreamEvent
// ---------------------------------------------------------------------------

/// One decoded frame: an event type plus its payload.
///
/// Serializes as `{"type": "...", "payload": ...}`, the same shape
/// handlers receive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamEvent {
    /// The event kind, from the frame's `event:` line.
    #[serde(rename = "type")]
    pub event_type: String,
    /// The frame's data.
    pub payload: Payload,
}

impl StreamEvent {
    /// Creates an event.
    pub fn new(event_type: impl Into<String>, payload: Payload) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// CharacterId
// ---------------------------------------------------------------------------

/// Identifies the character whose feed is being followed.
///
/// The id ends up as a path segment (`/characters/<id>/events`), so it must
/// be non-empty and free of `/`, `?`, `#` and whitespace. Validation runs on
/// every construction path, including deserialization
/// (`#[serde(try_from = "String")]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CharacterId(String);

impl CharacterId {
    /// Validates and wraps a character id.
    pub fn parse(id: impl Into<String>) -> Result<Self, ProtocolError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "character id must not be empty".into(),
            ));
        }
        if id
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#'))
        {
            return Err(ProtocolError::InvalidMessage(format!(
                "character id {id:?} is not a valid path segment"
            )));
        }
        Ok(Self(id))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CharacterId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CharacterId> for String {
    fn from(id: CharacterId) -> Self {
        id.0
    }
}

impl FromStr for CharacterId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_payload_parse_json_object() {
        assert_eq!(Payload::parse(r#"{"a":1}"#), Payload::Json(json!({"a": 1})));
    }

    #[test]
    fn test_payload_parse_falls_back_to_text() {
        assert_eq!(
            Payload::parse("not-json"),
            Payload::Text("not-json".into())
        );
    }

    #[test]
    fn test_payload_parse_json_scalars() {
        // Any JSON value counts, not just objects.
        assert_eq!(Payload::parse("42"), Payload::Json(json!(42)));
        assert_eq!(Payload::parse("\"hi\""), Payload::Json(json!("hi")));
        assert_eq!(Payload::parse("null"), Payload::Json(json!(null)));
    }

    #[test]
    fn test_payload_is_blank() {
        assert!(Payload::Json(json!(null)).is_blank());
        assert!(Payload::Json(json!("")).is_blank());
        assert!(Payload::Json(json!(0)).is_blank());
        assert!(Payload::Json(json!(false)).is_blank());
        assert!(Payload::Text(String::new()).is_blank());
        assert!(!Payload::Json(json!({})).is_blank());
        assert!(!Payload::Json(json!(1)).is_blank());
        assert!(!Payload::Text("x".into()).is_blank());
    }

    #[test]
    fn test_payload_get_field() {
        let payload = Payload::parse(r#"{"message":"hello"}"#);
        assert_eq!(payload.get("message"), Some(&json!("hello")));
        assert_eq!(payload.get("missing"), None);
        assert_eq!(Payload::Text("x".into()).get("message"), None);
    }

    #[test]
    fn test_payload_decode_typed() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Hp {
            hp: u32,
        }
        let payload = Payload::parse(r#"{"hp":12}"#);
        assert_eq!(payload.decode::<Hp>().unwrap(), Hp { hp: 12 });
    }

    #[test]
    fn test_payload_decode_errors() {
        #[derive(Deserialize, Debug)]
        struct Hp {
            #[allow(dead_code)]
            hp: u32,
        }
        let wrong_shape = Payload::parse(r#"{"mp":1}"#);
        assert!(matches!(
            wrong_shape.decode::<Hp>(),
            Err(ProtocolError::Decode(_))
        ));

        let raw = Payload::Text("hp 12".into());
        assert!(matches!(
            raw.decode::<Hp>(),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_stream_event_serializes_as_type_and_payload() {
        let event = StreamEvent::new("Foo", Payload::parse(r#"{"a":1}"#));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"type": "Foo", "payload": {"a": 1}}));

        let event = StreamEvent::new("message", Payload::Text("raw".into()));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"type": "message", "payload": "raw"}));
    }

    #[test]
    fn test_character_id_accepts_uuid() {
        let id = CharacterId::parse("5c1f8f0e-0b7e-4b7c-9a55-4c3b2a1d0e9f").unwrap();
        assert_eq!(id.as_str(), "5c1f8f0e-0b7e-4b7c-9a55-4c3b2a1d0e9f");
        assert_eq!(id.to_string(), id.as_str());
    }

    #[test]
    fn test_character_id_rejects_bad_segments() {
        for bad in ["", "a/b", "a b", "a?b", "a#b", "tab\t"] {
            assert!(CharacterId::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_character_id_serde_validates() {
        let id: CharacterId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(id.as_str(), "abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        assert!(serde_json::from_str::<CharacterId>("\"a/b\"").is_err());
    }

    #[test]
    fn test_character_id_from_str() {
        let id: CharacterId = "hero".parse().unwrap();
        assert_eq!(id.as_str(), "hero");
    }
}
