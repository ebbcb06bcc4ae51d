//! Connection status: what the client reports, and what it is doing.

use std::fmt;
use std::sync::Arc;

use crate::StreamError;

// ---------------------------------------------------------------------------
// StreamStatus
// ---------------------------------------------------------------------------

/// A status notification delivered to the [`StatusListener`].
///
/// For one connection attempt the order is always
///
/// ```text
/// Connecting → Open → (Closed | Error)
/// Connecting → Error            (connect itself failed)
/// Connecting → Offline          (no token; no retry)
/// ```
///
/// and a retry starts with a fresh `Connecting`.
#[derive(Debug, Clone)]
pub enum StreamStatus {
    /// About to attempt (or re-attempt) a connection.
    Connecting,
    /// Connected and streaming.
    Open,
    /// The attempt failed. Wrapped in `Arc` so the status stays cheap to clone.
    Error(Arc<StreamError>),
    /// The server ended the stream without error.
    Closed,
    /// No credential available, so no attempt was made.
    Offline,
}

impl StreamStatus {
    /// A short lower-case name for logs and UIs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Error(_) => "error",
            Self::Closed => "closed",
            Self::Offline => "offline",
        }
    }

    /// The error detail, for [`StreamStatus::Error`].
    pub fn error(&self) -> Option<&StreamError> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(e) => write!(f, "error: {e}"),
            other => f.write_str(other.label()),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientState
// ---------------------------------------------------------------------------

/// The client's lifecycle state, as last observed.
///
/// ```text
/// Idle → Connecting → Open → (Closed | Error) → Connecting → ...
///                  └→ Offline
/// any ──stop()──→ Stopped ──start()──→ Connecting
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Constructed, never started.
    Idle,
    /// Connecting, or waiting out the retry delay before connecting again.
    Connecting,
    /// Streaming.
    Open,
    /// The last connection ended cleanly; a retry is pending.
    Closed,
    /// The last connection failed; a retry is pending.
    Error,
    /// No token was available; waiting for `start()`.
    Offline,
    /// Stopped by the caller.
    Stopped,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Error => "error",
            Self::Offline => "offline",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// StatusListener
// ---------------------------------------------------------------------------

/// Receives status notifications.
///
/// Called synchronously from the client's task, so it must be quick and
/// must not panic. It must also not call `start()`/`stop()` on the same
/// client re-entrantly and then rely on further notifications from the
/// attempt it was called from: that attempt is already superseded.
pub trait StatusListener: Send + Sync + 'static {
    /// Handles one status change.
    fn on_status(&self, status: &StreamStatus);
}

impl<F> StatusListener for F
where
    F: Fn(&StreamStatus) + Send + Sync + 'static,
{
    fn on_status(&self, status: &StreamStatus) {
        self(status)
    }
}

/// Default listener: does nothing (the client still logs every change).
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreStatus;

impl StatusListener for IgnoreStatus {
    fn on_status(&self, _status: &StreamStatus) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(StreamStatus::Connecting.label(), "connecting");
        assert_eq!(StreamStatus::Open.label(), "open");
        assert_eq!(StreamStatus::Closed.label(), "closed");
        assert_eq!(StreamStatus::Offline.label(), "offline");
        let err = StreamStatus::Error(Arc::new(StreamError::UnexpectedStatus(503)));
        assert_eq!(err.label(), "error");
    }

    #[test]
    fn test_display_includes_error_detail() {
        let err = StreamStatus::Error(Arc::new(StreamError::UnexpectedStatus(503)));
        assert_eq!(err.to_string(), "error: stream failed with status 503");
        assert!(err.error().is_some());
        assert!(StreamStatus::Open.error().is_none());
    }

    #[test]
    fn test_client_state_display() {
        assert_eq!(ClientState::Stopped.to_string(), "stopped");
        assert_eq!(ClientState::Idle.to_string(), "idle");
    }
}
