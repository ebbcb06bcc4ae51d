//! Narrative messages sent by the game server.
//!
//! The server names each event after the message class it serialized, so
//! the event type tells us which struct the payload should decode into.
//! Only the narrative messages (things to show in the feed) are modelled
//! here; everything else stays a loosely typed [`Payload`](crate::Payload).

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, StreamEvent};

/// Inline text produced by the world or by an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub entity_name: Option<String>,
    pub message: String,
}

/// A full line of text, shown on its own row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub entity_name: Option<String>,
    pub message: String,
}

/// Something an entity said out loud.
///
/// The server always sends `entity_id`; it is optional here so that a
/// say without one still renders as speech instead of falling back to
/// plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SayMessage {
    #[serde(default)]
    pub entity_id: Option<String>,
    pub entity_name: String,
    pub message: String,
}

/// A decoded narrative message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameMessage {
    Text(Text),
    Line(Line),
    Say(SayMessage),
}

impl GameMessage {
    /// Event types that carry narrative messages.
    pub const NARRATIVE_TYPES: [&'static str; 3] = ["Text", "Line", "SayMessage"];

    /// Returns `true` if `event_type` names a narrative message.
    pub fn is_narrative(event_type: &str) -> bool {
        Self::NARRATIVE_TYPES.contains(&event_type)
    }

    /// Decodes a narrative event.
    ///
    /// - `None` — the event isn't a narrative type at all
    /// - `Some(Err(_))` — it claims to be one, but the payload doesn't fit
    /// - `Some(Ok(_))` — decoded
    pub fn from_event(event: &StreamEvent) -> Option<Result<Self, ProtocolError>> {
        let decoded = match event.event_type.as_str() {
            "Text" => event.payload.decode().map(Self::Text),
            "Line" => event.payload.decode().map(Self::Line),
            "SayMessage" => event.payload.decode().map(Self::Say),
            _ => return None,
        };
        Some(decoded)
    }

    /// The message text.
    pub fn message(&self) -> &str {
        match self {
            Self::Text(m) => &m.message,
            Self::Line(m) => &m.message,
            Self::Say(m) => &m.message,
        }
    }

    /// The name of the entity that produced the message, if any.
    pub fn entity_name(&self) -> Option<&str> {
        match self {
            Self::Text(m) => m.entity_name.as_deref(),
            Self::Line(m) => m.entity_name.as_deref(),
            Self::Say(m) => Some(&m.entity_name),
        }
    }
}
