//! Wire protocol for the Muforge event feed.
//!
//! The game server pushes a per-character feed as a line-oriented text
//! stream (the "event stream" format). This crate knows how to turn that
//! text back into discrete, typed events:
//!
//! - **Types** ([`StreamEvent`], [`Payload`], [`CharacterId`]) — the unit
//!   of dispatch and the identifiers used to address a feed.
//! - **Codec** ([`FrameDecoder`], [`parse_block`]) — incremental decoding of
//!   arbitrarily chunked bytes into events.
//! - **Messages** ([`GameMessage`], [`Text`], [`Line`], [`SayMessage`]) —
//!   the narrative payloads the game server sends most often.
//! - **Errors** ([`ProtocolError`]) — what can go wrong when a payload is
//!   decoded into a typed message.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and dispatch
//! (handlers). It doesn't know about connections or retries.
//!
//! ```text
//! Transport (bytes) → Protocol (StreamEvent) → Dispatch (handlers)
//! ```
//!
//! # Wire format
//!
//! ```text
//! event: SayMessage
//! data: {"entity_name":"Bob","message":"hi"}
//!
//! : a comment line, ignored
//! data: plain text payload
//!
//! ```
//!
//! Each block ends with a blank line. `event:` names the event type
//! (default `"message"`), each `data:` line contributes one line of payload.

mod codec;
mod error;
mod messages;
mod types;

pub use codec::{parse_block, FrameDecoder};
pub use error::ProtocolError;
pub use messages::{GameMessage, Line, SayMessage, Text};
pub use types::{CharacterId, Payload, StreamEvent, DEFAULT_EVENT_TYPE};
