//! Error types for the protocol layer.
//!
//! Decoding the *frames* of the event stream never fails: malformed
//! payload text degrades to a raw-text payload instead. These errors only
//! show up when a caller asks for a payload as a specific Rust type, or
//! when an identifier fails validation.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The payload is JSON, but not the shape the caller asked for
    /// (missing fields, wrong types).
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The value is invalid at the protocol level: a raw-text payload
    /// where structured data was required, or a malformed identifier.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
