//! Turns dispatched events and stream statuses into feed text.
//!
//! This is the presentation half of the client: no sockets, no retries,
//! just "what line does the player see for this event?" and "what does
//! the connection indicator show right now?".
//!
//! ```text
//! StreamClient ──events──→ Dispatcher ──→ attach() handlers ──→ FeedLine sink
//!      └──────status──────→ ConnectionIndicator::from_status / status_line
//! ```

use std::fmt;
use std::sync::Arc;

use muforge_dispatch::{Dispatcher, Subscription};
use muforge_protocol::{GameMessage, Payload, StreamEvent};
use muforge_stream::StreamStatus;
use serde_json::Value;

// ---------------------------------------------------------------------------
// FeedLine
// ---------------------------------------------------------------------------

/// How a feed line should be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    /// Output from the game world.
    System,
    /// Something went wrong (stream errors).
    Error,
}

/// One line of the narrative feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLine {
    pub text: String,
    pub kind: LineKind,
}

impl FeedLine {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: LineKind::System,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: LineKind::Error,
        }
    }
}

impl fmt::Display for FeedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LineKind::Error => write!(f, "! {}", self.text),
            LineKind::System => f.write_str(&self.text),
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// A non-empty string field of a JSON object payload.
fn text_field<'a>(payload: &'a Payload, field: &str) -> Option<&'a str> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Renders a narrative event (`Text`, `Line`, `SayMessage`).
///
/// Returns `None` for non-narrative types and for narrative events with
/// nothing to show. A payload that doesn't decode as its declared message
/// type still renders if it has a `message` field.
pub fn render_narrative(event: &StreamEvent) -> Option<FeedLine> {
    if !GameMessage::is_narrative(&event.event_type) || event.payload.is_blank() {
        return None;
    }

    match GameMessage::from_event(event)? {
        Ok(GameMessage::Say(say)) if !say.entity_name.is_empty() && !say.message.is_empty() => {
            return Some(FeedLine::system(format!(
                "{} says, \"{}\"",
                say.entity_name, say.message
            )));
        }
        Ok(msg) if !msg.message().is_empty() => {
            return Some(FeedLine::system(msg.message()));
        }
        Ok(_) => {}
        Err(e) => {
            tracing::trace!(event_type = %event.event_type, error = %e, "narrative payload did not decode");
        }
    }

    text_field(&event.payload, "message").map(FeedLine::system)
}

/// Renders any event as `[Type] ...`.
///
/// | payload                          | rendered              |
/// |----------------------------------|-----------------------|
/// | blank (`null`, `""`, ...)        | `[Type]`              |
/// | raw text or a JSON string        | `[Type] text`         |
/// | object with a `message` string   | `[Type] message`      |
/// | anything else                    | `[Type] {"compact":1}`|
pub fn render_generic(event: &StreamEvent) -> FeedLine {
    let kind = &event.event_type;
    let text = if event.payload.is_blank() {
        format!("[{kind}]")
    } else if let Some(text) = event.payload.as_text() {
        format!("[{kind}] {text}")
    } else if let Some(Value::String(text)) = event.payload.as_json() {
        format!("[{kind}] {text}")
    } else if let Some(message) = text_field(&event.payload, "message") {
        format!("[{kind}] {message}")
    } else {
        // Value's Display is compact JSON.
        format!("[{kind}] {}", event.payload)
    };
    FeedLine::system(text)
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// The handlers installed by [`attach`].
#[derive(Debug)]
pub struct FeedSubscriptions {
    subscriptions: Vec<Subscription>,
}

impl FeedSubscriptions {
    /// How many handlers were installed.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Removes every handler. Returns how many were still registered.
    pub fn detach(self) -> usize {
        self.subscriptions
            .into_iter()
            .map(Subscription::unsubscribe)
            .filter(|removed| *removed)
            .count()
    }
}

/// Registers feed rendering on `dispatcher`: one handler per narrative
/// type, plus a wildcard handler that renders every other type with
/// [`render_generic`]. Each rendered line goes to `sink`.
pub fn attach<F>(dispatcher: &Dispatcher, sink: F) -> FeedSubscriptions
where
    F: Fn(FeedLine) + Send + Sync + 'static,
{
    let sink = Arc::new(sink);
    let mut subscriptions = Vec::with_capacity(GameMessage::NARRATIVE_TYPES.len() + 1);

    for event_type in GameMessage::NARRATIVE_TYPES {
        let sink = Arc::clone(&sink);
        subscriptions.push(dispatcher.on(event_type, move |event| {
            if let Some(line) = render_narrative(event) {
                sink(line);
            }
        }));
    }

    subscriptions.push(dispatcher.on_any(move |event| {
        if GameMessage::is_narrative(&event.event_type) {
            return;
        }
        sink(render_generic(event));
    }));

    FeedSubscriptions { subscriptions }
}

// ---------------------------------------------------------------------------
// Connection indicator
// ---------------------------------------------------------------------------

/// The three-state connection badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionIndicator {
    Online,
    Connecting,
    Offline,
}

impl ConnectionIndicator {
    /// Maps a stream status to the indicator.
    ///
    /// A clean close counts as "connecting" while a character is active
    /// (a retry is on its way) and "offline" otherwise. Errors show as
    /// "connecting" because the client always retries after one.
    pub fn from_status(status: &StreamStatus, has_character: bool) -> Self {
        match status {
            StreamStatus::Open => Self::Online,
            StreamStatus::Connecting | StreamStatus::Error(_) => Self::Connecting,
            StreamStatus::Closed if has_character => Self::Connecting,
            StreamStatus::Closed | StreamStatus::Offline => Self::Offline,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Connecting => "connecting",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for ConnectionIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The feed line a status deserves, if any. Only errors get one.
pub fn status_line(status: &StreamStatus) -> Option<FeedLine> {
    status
        .error()
        .map(|e| FeedLine::error(format!("Stream error: {e}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use muforge_stream::StreamError;

    use super::*;

    fn event(event_type: &str, data: &str) -> StreamEvent {
        StreamEvent::new(event_type, Payload::parse(data))
    }

    // -- render_narrative --

    #[test]
    fn test_say_message_renders_speech() {
        let ev = event("SayMessage", r#"{"entity_name":"Bob","message":"hi"}"#);
        assert_eq!(
            render_narrative(&ev),
            Some(FeedLine::system("Bob says, \"hi\""))
        );
    }

    #[test]
    fn test_say_message_without_name_falls_back_to_message() {
        let ev = event("SayMessage", r#"{"message":"hi"}"#);
        assert_eq!(render_narrative(&ev), Some(FeedLine::system("hi")));

        let ev = event("SayMessage", r#"{"entity_name":"","message":"hi"}"#);
        assert_eq!(render_narrative(&ev), Some(FeedLine::system("hi")));
    }

    #[test]
    fn test_text_and_line_render_message_verbatim() {
        let ev = event("Text", r#"{"message":"The wind howls."}"#);
        assert_eq!(render_narrative(&ev), Some(FeedLine::system("The wind howls.")));
        let ev = event("Line", r#"{"entity_name":"Ann","message":"----"}"#);
        assert_eq!(render_narrative(&ev), Some(FeedLine::system("----")));
    }

    #[test]
    fn test_narrative_without_message_renders_nothing() {
        assert_eq!(render_narrative(&event("Text", "{}")), None);
        assert_eq!(render_narrative(&event("Text", r#"{"message":""}"#)), None);
        assert_eq!(render_narrative(&event("Line", "null")), None);
        assert_eq!(render_narrative(&event("Line", "")), None);
        assert_eq!(render_narrative(&event("Text", "plain words")), None);
    }

    #[test]
    fn test_non_narrative_is_not_rendered_as_narrative() {
        assert_eq!(render_narrative(&event("RoomChanged", r#"{"message":"x"}"#)), None);
    }

    // -- render_generic --

    #[test]
    fn test_generic_blank_payload() {
        assert_eq!(render_generic(&event("Ping", "null")).text, "[Ping]");
        assert_eq!(render_generic(&event("Ping", "")).text, "[Ping]");
    }

    #[test]
    fn test_generic_raw_text_and_json_string() {
        assert_eq!(render_generic(&event("Motd", "welcome back")).text, "[Motd] welcome back");
        assert_eq!(render_generic(&event("Motd", r#""quoted""#)).text, "[Motd] quoted");
    }

    #[test]
    fn test_generic_message_field() {
        let line = render_generic(&event("Notice", r#"{"message":"server restart","at":5}"#));
        assert_eq!(line.text, "[Notice] server restart");
        assert_eq!(line.kind, LineKind::System);
    }

    #[test]
    fn test_generic_compact_json() {
        let line = render_generic(&event("Stats", "{ \"hp\" : 10 }"));
        assert_eq!(line.text, r#"[Stats] {"hp":10}"#);
        assert_eq!(render_generic(&event("List", "[1, 2]")).text, "[List] [1,2]");
    }

    // -- attach --

    #[test]
    fn test_attach_routes_narrative_and_generic_once_each() {
        let dispatcher = Dispatcher::new();
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let subs = attach(&dispatcher, move |line| sink.lock().unwrap().push(line.text));
        assert_eq!(subs.len(), 4);

        dispatcher.dispatch("SayMessage", Payload::parse(r#"{"entity_name":"Bob","message":"hi"}"#));
        dispatcher.dispatch("Text", Payload::parse("{}"));
        dispatcher.dispatch("Notice", Payload::parse(r#"{"message":"m"}"#));

        assert_eq!(*lines.lock().unwrap(), ["Bob says, \"hi\"", "[Notice] m"]);
    }

    #[test]
    fn test_detach_removes_all_handlers() {
        let dispatcher = Dispatcher::new();
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let subs = attach(&dispatcher, move |line| sink.lock().unwrap().push(line));

        assert_eq!(subs.detach(), 4);
        dispatcher.dispatch("Notice", Payload::parse("x"));
        assert!(lines.lock().unwrap().is_empty());
    }

    // -- status --

    #[test]
    fn test_indicator_mapping() {
        let err = StreamStatus::Error(Arc::new(StreamError::UnexpectedStatus(500)));
        use ConnectionIndicator::*;
        assert_eq!(ConnectionIndicator::from_status(&StreamStatus::Open, true), Online);
        assert_eq!(ConnectionIndicator::from_status(&StreamStatus::Connecting, true), Connecting);
        assert_eq!(ConnectionIndicator::from_status(&err, true), Connecting);
        assert_eq!(ConnectionIndicator::from_status(&StreamStatus::Closed, true), Connecting);
        assert_eq!(ConnectionIndicator::from_status(&StreamStatus::Closed, false), Offline);
        assert_eq!(ConnectionIndicator::from_status(&StreamStatus::Offline, true), Offline);
    }

    #[test]
    fn test_status_line_only_for_errors() {
        let err = StreamStatus::Error(Arc::new(StreamError::UnexpectedStatus(401)));
        assert_eq!(
            status_line(&err),
            Some(FeedLine::error("Stream error: stream failed with status 401"))
        );
        assert_eq!(status_line(&StreamStatus::Closed), None);
    }

    #[test]
    fn test_feed_line_display() {
        assert_eq!(FeedLine::error("bad").to_string(), "! bad");
        assert_eq!(FeedLine::system("ok").to_string(), "ok");
    }
}
