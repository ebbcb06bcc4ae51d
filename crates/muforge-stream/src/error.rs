//! Error types for the stream client.

use muforge_transport::TransportError;

/// Why a connection attempt failed.
///
/// These never escape the client as `Err` values: they are reported
/// through [`StreamStatus::Error`](crate::StreamStatus::Error) and
/// followed by a retry.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// No bearer token was available.
    #[error("missing token")]
    MissingToken,

    /// The server answered, but not with a 2xx status.
    #[error("stream failed with status {0}")]
    UnexpectedStatus(u16),

    /// An event handler panicked. The connection is dropped and retried.
    #[error("handler for {event_type} panicked: {message}")]
    HandlerPanicked { event_type: String, message: String },

    /// Connecting or reading failed at the transport level.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
