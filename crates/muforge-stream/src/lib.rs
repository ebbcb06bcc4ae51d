//! Resilient server-push event stream client for Muforge.
//!
//! This crate keeps one character's event feed flowing:
//!
//! 1. **Credentials** — a [`TokenProvider`] is asked for a bearer token
//!    before every attempt; no token means [`StreamStatus::Offline`]
//! 2. **Streaming** — the body is decoded incrementally and every event is
//!    handed to a [`Dispatcher`](muforge_dispatch::Dispatcher)
//! 3. **Recovery** — any end of the connection (error, non-2xx status or a
//!    clean close) is followed by a retry after [`StreamConfig::retry_delay`]
//! 4. **Status** — a [`StatusListener`] hears `connecting`, `open`,
//!    `error`, `closed` and `offline`
//!
//! # How it fits in the stack
//!
//! ```text
//! Feed / UI (above)  ← renders events, shows the connection indicator
//!     ↕
//! Stream Layer (this crate)  ← connect, decode, dispatch, retry
//!     ↕
//! Dispatch + Protocol  ← routing by event type, wire format
//!     ↕
//! Transport Layer (below)  ← one streaming GET
//! ```

mod auth;
mod client;
mod config;
mod error;
mod status;

pub use auth::{SharedToken, TokenProvider};
pub use client::{StreamClient, StreamClientBuilder};
pub use config::{EVENT_STREAM_CONTENT_TYPE, StreamConfig};
pub use error::StreamError;
pub use status::{ClientState, IgnoreStatus, StatusListener, StreamStatus};
