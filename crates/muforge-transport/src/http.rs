//! HTTP transport implementation using `reqwest`.

use std::future::Future;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderName, HeaderValue};

use crate::{StreamRequest, StreamResponse, Transport, TransportError};

/// How long to wait for the TCP/TLS handshake before giving up.
///
/// Only the connect phase is bounded: a streaming body is expected to stay
/// open indefinitely, so there is no overall request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A `reqwest`-backed [`Transport`].
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a fresh client.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wraps an existing client (custom TLS roots, proxies, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn open(
        &self,
        request: StreamRequest,
    ) -> impl Future<Output = Result<StreamResponse, TransportError>> + Send {
        let client = self.client.clone();
        async move {
            let url = reqwest::Url::parse(&request.url).map_err(|e| {
                TransportError::InvalidRequest(format!("{}: {e}", request.url))
            })?;

            let mut builder = client.get(url);
            for (name, value) in &request.headers {
                let header_name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| {
                        TransportError::InvalidRequest(format!(
                            "invalid header name {name:?}"
                        ))
                    })?;
                // The value may be a credential, so it never goes into
                // the error message.
                let header_value = HeaderValue::from_str(value).map_err(|_| {
                    TransportError::InvalidRequest(format!(
                        "invalid value for header {name:?}"
                    ))
                })?;
                builder = builder.header(header_name, header_value);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| TransportError::ConnectFailed(Box::new(e)))?;

            let status = response.status().as_u16();
            tracing::debug!(url = %request.url, status, "stream response received");

            let body = response
                .bytes_stream()
                .map(|chunk| {
                    chunk.map_err(|e| TransportError::ReceiveFailed(Box::new(e)))
                })
                .boxed();

            Ok(StreamResponse { status, body })
        }
    }
}
