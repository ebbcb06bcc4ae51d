//! One live stream, bound to the active character.
//!
//! Selecting a character opens that character's feed; selecting another
//! one (or logging out) closes it first. There is never more than one
//! [`StreamClient`] running per [`CharacterFeed`].

use std::sync::Arc;

use muforge_dispatch::Dispatcher;
use muforge_protocol::CharacterId;
use muforge_stream::{
    ClientState, IgnoreStatus, SharedToken, StatusListener, StreamClient, StreamConfig,
    TokenProvider,
};
use muforge_transport::Transport;

/// Builds the feed URL for a character: `<base>/characters/<id>/events`.
///
/// Trailing slashes on `base` are ignored. An empty base gives a
/// root-relative path.
pub fn feed_url(base: &str, character: &CharacterId) -> String {
    format!("{}/characters/{}/events", base.trim_end_matches('/'), character)
}

/// Owns the stream for whichever character is active.
pub struct CharacterFeed<T: Transport> {
    base_url: String,
    transport: T,
    tokens: Arc<dyn TokenProvider>,
    dispatcher: Dispatcher,
    listener: Arc<dyn StatusListener>,
    config: StreamConfig,
    current: Option<(CharacterId, StreamClient<T>)>,
}

impl<T: Transport + Clone> CharacterFeed<T> {
    /// Creates a feed with no active character. Until [`tokens`](Self::tokens)
    /// is set every stream goes offline immediately.
    pub fn new(base_url: impl Into<String>, transport: T) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
            tokens: Arc::new(SharedToken::new()),
            dispatcher: Dispatcher::new(),
            listener: Arc::new(IgnoreStatus),
            config: StreamConfig::default(),
            current: None,
        }
    }

    pub fn tokens(mut self, provider: impl TokenProvider) -> Self {
        self.tokens = Arc::new(provider);
        self
    }

    /// Shares `dispatcher` with every stream this feed opens, so handlers
    /// survive character switches.
    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn on_status(mut self, listener: impl StatusListener) -> Self {
        self.listener = Arc::new(listener);
        self
    }

    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Switches the stream to `character` and starts it.
    ///
    /// The previous stream, if any, is stopped first (silently), even when
    /// `character` is the one already active: activating again reconnects.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn activate(&mut self, character: CharacterId) -> &StreamClient<T> {
        self.deactivate();

        let url = feed_url(&self.base_url, &character);
        tracing::info!(%character, %url, "activating character feed");

        let client = StreamClient::builder(url)
            .token_provider(Arc::clone(&self.tokens))
            .dispatcher(self.dispatcher.clone())
            .status_listener(Arc::clone(&self.listener))
            .config(self.config.clone())
            .build(self.transport.clone());
        client.start();

        let (_, client) = self.current.insert((character, client));
        client
    }

    /// Stops the current stream and forgets the character (logout).
    /// Returns the character that was active.
    pub fn deactivate(&mut self) -> Option<CharacterId> {
        let (character, client) = self.current.take()?;
        client.stop();
        tracing::info!(%character, "character feed deactivated");
        Some(character)
    }

    pub fn active_character(&self) -> Option<&CharacterId> {
        self.current.as_ref().map(|(character, _)| character)
    }

    /// The current stream, if a character is active.
    pub fn client(&self) -> Option<&StreamClient<T>> {
        self.current.as_ref().map(|(_, client)| client)
    }

    /// State of the current stream; [`ClientState::Idle`] when no
    /// character is active.
    pub fn state(&self) -> ClientState {
        self.client().map_or(ClientState::Idle, StreamClient::state)
    }

    /// The dispatcher shared by every stream.
    pub fn event_dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl<T: Transport> Drop for CharacterFeed<T> {
    fn drop(&mut self) {
        if let Some((_, client)) = self.current.take() {
            client.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> CharacterId {
        CharacterId::parse(s).unwrap()
    }

    #[test]
    fn test_feed_url_joins_segments() {
        assert_eq!(
            feed_url("http://mud.test", &id("42")),
            "http://mud.test/characters/42/events"
        );
    }

    #[test]
    fn test_feed_url_trims_trailing_slashes() {
        assert_eq!(
            feed_url("http://mud.test/api//", &id("c-1")),
            "http://mud.test/api/characters/c-1/events"
        );
        assert_eq!(feed_url("", &id("7")), "/characters/7/events");
    }
}
