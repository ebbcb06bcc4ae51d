//! Transport abstraction layer for the Muforge client.
//!
//! Provides the [`Transport`] trait: open one long-lived streaming GET and
//! hand back its status code plus an incremental [`ByteStream`] body. The
//! stream client above this layer never sees sockets or HTTP libraries.
//!
//! # Feature Flags
//!
//! - `http` (default) — HTTP transport via `reqwest`

mod error;
#[cfg(feature = "http")]
mod http;

pub use error::{BoxError, TransportError};
#[cfg(feature = "http")]
pub use http::HttpTransport;

use std::fmt;
use std::future::Future;

use bytes::Bytes;
use futures_util::stream::BoxStream;

/// The body of a streaming response: chunks of bytes as they arrive.
///
/// Chunk boundaries are arbitrary. They carry no meaning for the wire
/// format and may split a line, a block or even a UTF-8 character.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// A streaming GET request: a URL plus custom headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    /// Absolute URL of the resource to stream.
    pub url: String,
    /// Header name/value pairs, sent in insertion order.
    pub headers: Vec<(String, String)>,
}

impl StreamRequest {
    /// Creates a GET request for `url` with no headers.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Appends a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Appends an `Authorization: Bearer <token>` header.
    pub fn bearer_auth(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    /// Returns the first value of the named header (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The head of a streaming response plus its still-unread body.
pub struct StreamResponse {
    /// HTTP status code.
    pub status: u16,
    /// The response body, read incrementally.
    pub body: ByteStream,
}

impl StreamResponse {
    /// Returns `true` for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for StreamResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Opens streaming requests.
///
/// A non-success status code is NOT an error at this layer: it is
/// returned in [`StreamResponse::status`] and the caller decides what it
/// means. Errors are reserved for "no response at all" and for failures
/// while the body is being read.
///
/// Dropping the returned future (or the body stream) cancels the request.
pub trait Transport: Send + Sync + 'static {
    /// Sends `request` and resolves once the response head has arrived.
    fn open(
        &self,
        request: StreamRequest,
    ) -> impl Future<Output = Result<StreamResponse, TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_auth_sets_authorization_header() {
        let req = StreamRequest::get("http://localhost/events").bearer_auth("abc");
        assert_eq!(req.header_value("authorization"), Some("Bearer abc"));
    }

    #[test]
    fn test_headers_keep_insertion_order() {
        let req = StreamRequest::get("http://x")
            .header("Accept", "text/event-stream")
            .header("Cache-Control", "no-cache");
        let names: Vec<&str> = req.headers.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["Accept", "Cache-Control"]);
    }

    #[test]
    fn test_header_value_missing() {
        let req = StreamRequest::get("http://x");
        assert_eq!(req.header_value("Accept"), None);
    }

    #[test]
    fn test_is_success_range() {
        let make = |status| StreamResponse {
            status,
            body: Box::pin(futures_util::stream::empty::<Result<Bytes, TransportError>>()),
        };
        assert!(make(200).is_success());
        assert!(make(204).is_success());
        assert!(!make(199).is_success());
        assert!(!make(301).is_success());
        assert!(!make(401).is_success());
        assert!(!make(500).is_success());
    }
}
