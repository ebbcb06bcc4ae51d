/// Boxed source error carried by transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be built (bad URL, bad header value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Opening the connection or receiving the response head failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] BoxError),

    /// Reading the response body failed mid-stream.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] BoxError),
}
