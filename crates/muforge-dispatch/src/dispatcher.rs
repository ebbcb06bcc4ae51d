//! The handler registry and fan-out.
//!
//! # Concurrency note
//!
//! The registry sits behind a `std::sync::Mutex`, but the lock is only held
//! long enough to copy out the handler list. Handlers always run with the
//! lock released, so a handler may subscribe or unsubscribe (even itself)
//! without deadlocking. Such changes apply from the next dispatch on.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use muforge_protocol::{Payload, StreamEvent};

use crate::EventKey;

/// A subscriber callback.
///
/// Handler *identity* is the allocation behind the `Arc`: subscribing the
/// same `Arc` twice under one key registers it once, while two separate
/// `Arc::new(...)` of identical closures are two different handlers.
pub type Handler = Arc<dyn Fn(&StreamEvent) + Send + Sync>;

fn same_handler(a: &Handler, b: &Handler) -> bool {
    // Compare data pointers only; vtable pointers for the same closure
    // type are not guaranteed to be unique.
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Exact and wildcard handlers live in separate places: two lookups per
/// dispatch, no sentinel key.
#[derive(Default)]
struct Registry {
    exact: HashMap<String, Vec<Handler>>,
    wildcard: Vec<Handler>,
}

impl Registry {
    fn slot_mut(&mut self, key: &EventKey) -> &mut Vec<Handler> {
        match key {
            EventKey::Exact(t) => self.exact.entry(t.clone()).or_default(),
            EventKey::Wildcard => &mut self.wildcard,
        }
    }

    fn slot(&self, key: &EventKey) -> Option<&Vec<Handler>> {
        match key {
            EventKey::Exact(t) => self.exact.get(t),
            EventKey::Wildcard => Some(&self.wildcard),
        }
    }

    fn insert(&mut self, key: &EventKey, handler: &Handler) {
        let slot = self.slot_mut(key);
        if !slot.iter().any(|h| same_handler(h, handler)) {
            slot.push(Arc::clone(handler));
        }
    }

    fn remove(&mut self, key: &EventKey, handler: &Handler) -> bool {
        match key {
            EventKey::Exact(t) => {
                let Some(slot) = self.exact.get_mut(t) else {
                    return false;
                };
                let removed = remove_from(slot, handler);
                if slot.is_empty() {
                    self.exact.remove(t);
                }
                removed
            }
            EventKey::Wildcard => remove_from(&mut self.wildcard, handler),
        }
    }
}

fn remove_from(slot: &mut Vec<Handler>, handler: &Handler) -> bool {
    match slot.iter().position(|h| same_handler(h, handler)) {
        Some(index) => {
            slot.remove(index);
            true
        }
        None => false,
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // A poisoned lock only means some thread panicked while holding it.
    // Every mutation is a single push/remove, so the data is still whole.
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Publish/subscribe registry for [`StreamEvent`]s.
///
/// Cloning is cheap and every clone shares the same registry, so the same
/// dispatcher can be handed to a stream client (as its event sink) and to
/// the UI (to register handlers).
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// use muforge_dispatch::Dispatcher;
/// use muforge_protocol::Payload;
///
/// let dispatcher = Dispatcher::new();
/// let seen = Arc::new(AtomicUsize::new(0));
///
/// let counter = Arc::clone(&seen);
/// let sub = dispatcher.on("SayMessage", move |_| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// dispatcher.dispatch("SayMessage", Payload::parse(r#"{"message":"hi"}"#));
/// dispatcher.dispatch("Other", Payload::parse("{}"));
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
///
/// sub.unsubscribe();
/// dispatcher.dispatch("SayMessage", Payload::parse("{}"));
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone, Default)]
pub struct Dispatcher {
    registry: Arc<Mutex<Registry>>,
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `key`.
    ///
    /// Never fails. Registering a handler that is already present under the
    /// same key is a no-op (it will still be called once per dispatch).
    pub fn subscribe(&self, key: impl Into<EventKey>, handler: Handler) -> Subscription {
        let key = key.into();
        lock(&self.registry).insert(&key, &handler);
        tracing::trace!(%key, "handler subscribed");
        Subscription {
            registry: Arc::downgrade(&self.registry),
            key,
            handler,
        }
    }

    /// Registers a closure for one event type.
    pub fn on<F>(&self, event_type: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.subscribe(EventKey::Exact(event_type.into()), Arc::new(handler))
    }

    /// Registers a closure for every event type.
    pub fn on_any<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.subscribe(EventKey::Wildcard, Arc::new(handler))
    }

    /// Removes `handler` from `key`. Returns `false` if it wasn't there.
    pub fn unsubscribe(&self, key: &EventKey, handler: &Handler) -> bool {
        lock(&self.registry).remove(key, handler)
    }

    /// Removes every subscription.
    pub fn clear(&self) {
        let mut registry = lock(&self.registry);
        registry.exact.clear();
        registry.wildcard.clear();
    }

    /// Number of handlers currently registered under `key`.
    pub fn handler_count(&self, key: &EventKey) -> usize {
        lock(&self.registry).slot(key).map_or(0, Vec::len)
    }

    /// Builds a [`StreamEvent`] and delivers it. See [`dispatch_event`](Self::dispatch_event).
    pub fn dispatch(&self, event_type: &str, payload: Payload) {
        self.dispatch_event(&StreamEvent::new(event_type, payload));
    }

    /// Delivers `event` to every handler registered for its type, then to
    /// every wildcard handler. Each handler is called exactly once.
    ///
    /// A panicking handler is a bug in that handler: the panic is not
    /// caught here and unwinds into the caller.
    pub fn dispatch_event(&self, event: &StreamEvent) {
        let (exact, wildcard) = {
            let registry = lock(&self.registry);
            (
                registry
                    .exact
                    .get(&event.event_type)
                    .cloned()
                    .unwrap_or_default(),
                registry.wildcard.clone(),
            )
        };

        tracing::trace!(
            event_type = %event.event_type,
            exact = exact.len(),
            wildcard = wildcard.len(),
            "dispatching event"
        );

        for handler in exact.iter().chain(wildcard.iter()) {
            handler(event);
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = lock(&self.registry);
        f.debug_struct("Dispatcher")
            .field("event_types", &registry.exact.len())
            .field("wildcard_handlers", &registry.wildcard.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Returned by [`Dispatcher::subscribe`]; call [`unsubscribe`](Self::unsubscribe)
/// to remove exactly that handler from exactly that key.
///
/// Dropping a `Subscription` does NOT unsubscribe. It only holds a weak
/// reference to the registry, so it never keeps a dispatcher alive.
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    key: EventKey,
    handler: Handler,
}

impl Subscription {
    /// The key this handler was registered under.
    pub fn key(&self) -> &EventKey {
        &self.key
    }

    /// Removes the handler. Returns `false` if it was already gone (or the
    /// dispatcher no longer exists).
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => lock(&registry).remove(&self.key, &self.handler),
            None => false,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

// =========================================================================
// Tests
// =========================================================================
