//! Unified error type for the Muforge client.

use muforge_protocol::ProtocolError;
use muforge_stream::StreamError;
use muforge_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `muforge` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum MuforgeError {
    /// A transport-level error (request, connect, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (bad payload, bad character id).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A stream-level error (missing token, unexpected status).
    #[error(transparent)]
    Stream(#[from] StreamError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ReceiveFailed("gone".into());
        let muforge_err: MuforgeError = err.into();
        assert!(matches!(muforge_err, MuforgeError::Transport(_)));
        assert!(muforge_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let muforge_err: MuforgeError = err.into();
        assert!(matches!(muforge_err, MuforgeError::Protocol(_)));
    }

    #[test]
    fn test_from_stream_error() {
        let muforge_err: MuforgeError = StreamError::UnexpectedStatus(403).into();
        assert!(matches!(muforge_err, MuforgeError::Stream(_)));
        assert_eq!(muforge_err.to_string(), "stream failed with status 403");
    }

    #[test]
    fn test_question_mark_converts() {
        fn parse(id: &str) -> Result<muforge_protocol::CharacterId, MuforgeError> {
            Ok(id.parse()?)
        }
        assert!(parse("c-1").is_ok());
        assert!(matches!(parse("a/b"), Err(MuforgeError::Protocol(_))));
    }
}
