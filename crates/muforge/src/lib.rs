//! # Muforge
//!
//! Client-side event feed for a multi-user text game.
//!
//! The game server pushes a per-character stream of events. Muforge keeps
//! that stream connected ([`StreamClient`]), decodes it into typed events
//! ([`StreamEvent`]), routes them by type ([`Dispatcher`]) and renders them
//! as feed lines ([`feed`]). [`CharacterFeed`] ties it together: one live
//! stream for whichever character is active.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use muforge::prelude::*;
//!
//! # async fn demo() -> Result<(), MuforgeError> {
//! let dispatcher = Dispatcher::new();
//! let _feed = muforge::feed::attach(&dispatcher, |line| println!("{line}"));
//!
//! let mut characters = CharacterFeed::new("https://mud.example", HttpTransport::new()?)
//!     .tokens(SharedToken::with_token("secret"))
//!     .dispatcher(dispatcher);
//!
//! characters.activate("42".parse()?);
//! # Ok(())
//! # }
//! ```

pub mod character;
pub mod error;
pub mod feed;

pub use character::{CharacterFeed, feed_url};
pub use error::MuforgeError;

pub use muforge_dispatch as dispatch;
pub use muforge_protocol as protocol;
pub use muforge_stream as stream;
pub use muforge_transport as transport;

pub use muforge_dispatch::Dispatcher;
pub use muforge_protocol::{CharacterId, Payload, StreamEvent};
pub use muforge_stream::StreamClient;

/// Everything needed to follow a character's feed.
pub mod prelude {
    pub use crate::character::{CharacterFeed, feed_url};
    pub use crate::error::MuforgeError;
    pub use crate::feed::{ConnectionIndicator, FeedLine, LineKind};
    pub use muforge_dispatch::{Dispatcher, EventKey, Subscription};
    pub use muforge_protocol::{CharacterId, GameMessage, Payload, StreamEvent};
    pub use muforge_stream::{
        ClientState, SharedToken, StatusListener, StreamClient, StreamConfig, StreamStatus,
        TokenProvider,
    };
    pub use muforge_transport::{HttpTransport, Transport};
}
