//! In-process publish/subscribe for decoded stream events.
//!
//! The [`Dispatcher`] is the meeting point between the stream client
//! (which *produces* events) and the UI layer (which *consumes* them).
//! Neither owns the other: both just hold a clone of the same dispatcher.
//!
//! ```text
//! StreamClient ──dispatch──→ Dispatcher ──→ handlers for "SayMessage"
//!                                       └─→ wildcard handlers
//! ```
//!
//! # Keys
//!
//! Handlers are registered under an [`EventKey`]: either one exact event
//! type, or the wildcard that matches every type. The wildcard is its own
//! enum variant, so an event that happens to be *named* `"*"` can't be
//! confused with it.

mod dispatcher;
mod key;

pub use dispatcher::{Dispatcher, Handler, Subscription};
pub use key::EventKey;
