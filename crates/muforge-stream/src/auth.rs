//! Bearer-token supply for the stream client.
//!
//! The stream client doesn't know where credentials live (browser storage,
//! a config file, an OAuth refresh loop...). It is handed a
//! [`TokenProvider`] and asks it for the current token right before each
//! connection attempt. That keeps the client free of hidden global state
//! and trivial to test: a closure returning `Some("t".into())` will do.

use std::sync::{Arc, PoisonError, RwLock};

/// Supplies the bearer token for the next connection attempt.
///
/// Returning `None` (or an empty string) means "not signed in": the client
/// reports [`Offline`](crate::StreamStatus::Offline) and stops trying until
/// `start()` is called again.
///
/// # Example
///
/// ```rust
/// use muforge_stream::TokenProvider;
///
/// let from_env = || std::env::var("MUFORGE_TOKEN").ok();
/// let _ = from_env.token();
/// ```
pub trait TokenProvider: Send + Sync + 'static {
    /// Returns the current token, if any. Must not block.
    fn token(&self) -> Option<String>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> Option<String> + Send + Sync + 'static,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// A shared, mutable token cell.
///
/// Clones share the same slot: the login flow keeps one clone to
/// [`set`](Self::set)/[`clear`](Self::clear) the token, the stream client
/// keeps another to read it.
#[derive(Debug, Clone, Default)]
pub struct SharedToken {
    inner: Arc<RwLock<Option<String>>>,
}

impl SharedToken {
    /// Creates an empty cell (signed out).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cell holding `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        let cell = Self::new();
        cell.set(token);
        cell
    }

    /// Stores a new token, replacing any previous one.
    pub fn set(&self, token: impl Into<String>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    /// Forgets the token (sign out).
    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns a copy of the current token.
    pub fn get(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TokenProvider for SharedToken {
    fn token(&self) -> Option<String> {
        self.get()
    }
}

/// Reads a token from `provider`, treating an empty string as absent.
pub(crate) fn current_token(provider: &dyn TokenProvider) -> Option<String> {
    provider.token().filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_a_provider() {
        let provider = || Some("abc".to_string());
        assert_eq!(current_token(&provider), Some("abc".into()));
    }

    #[test]
    fn test_empty_token_counts_as_absent() {
        let provider = || Some(String::new());
        assert_eq!(current_token(&provider), None);
    }

    #[test]
    fn test_shared_token_clones_share_state() {
        let login = SharedToken::new();
        let reader = login.clone();
        assert_eq!(current_token(&reader), None);

        login.set("t1");
        assert_eq!(current_token(&reader), Some("t1".into()));

        login.clear();
        assert_eq!(reader.get(), None);
    }

    #[test]
    fn test_with_token() {
        assert_eq!(SharedToken::with_token("x").get(), Some("x".into()));
    }
}
