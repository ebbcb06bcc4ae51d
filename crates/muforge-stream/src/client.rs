//! The resilient stream client.
//!
//! One [`StreamClient`] owns at most one live connection. `start()` spawns
//! a worker task that connects, decodes the body into events, hands every
//! event to the [`Dispatcher`] and, when the connection ends for any
//! reason, waits out the retry delay and connects again. `stop()` tears all
//! of that down.
//!
//! # Superseded attempts
//!
//! Every `start()` bumps a generation counter. The worker carries the
//! generation it was spawned for and re-checks it (together with the
//! `active` flag) before every status notification and before every single
//! dispatched event. A worker that lost the race (because `stop()` or a
//! newer `start()` ran while it was awaiting, or because a handler called
//! `stop()` halfway through a chunk) goes quiet immediately: it never
//! notifies, dispatches, or schedules a retry again.
//!
//! The generation check hides stale work. The worker's
//! [`CancellationToken`] and `JoinHandle::abort` make it actually stop.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use muforge_dispatch::Dispatcher;
use muforge_protocol::FrameDecoder;
use muforge_transport::{StreamRequest, Transport};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::auth::current_token;
use crate::{
    ClientState, IgnoreStatus, SharedToken, StatusListener, StreamConfig, StreamError,
    StreamStatus, TokenProvider,
};

// ---------------------------------------------------------------------------
// StreamClient
// ---------------------------------------------------------------------------

/// A self-healing subscription to one server-push event feed.
///
/// Cheap to clone: clones share the same connection.
///
/// Dropping the last handle does not stop a running worker (the worker
/// keeps its own reference). Call [`stop`](Self::stop) when done.
///
/// # Example
///
/// ```rust,no_run
/// use muforge_dispatch::Dispatcher;
/// use muforge_stream::{SharedToken, StreamClient};
/// use muforge_transport::HttpTransport;
///
/// # async fn demo() -> Result<(), muforge_transport::TransportError> {
/// let dispatcher = Dispatcher::new();
/// let _sub = dispatcher.on("SayMessage", |event| println!("{}", event.payload));
///
/// let client = StreamClient::builder("https://mud.example/characters/7/events")
///     .tokens(SharedToken::with_token("secret"))
///     .dispatcher(dispatcher)
///     .on_status(|status: &muforge_stream::StreamStatus| println!("{status}"))
///     .build(HttpTransport::new()?);
///
/// client.start();
/// // ... later
/// client.stop();
/// # Ok(())
/// # }
/// ```
pub struct StreamClient<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for StreamClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> fmt::Debug for StreamClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let conn = self.inner.lock();
        f.debug_struct("StreamClient")
            .field("url", &self.inner.url)
            .field("state", &conn.state)
            .field("active", &conn.active)
            .field("generation", &conn.generation)
            .finish_non_exhaustive()
    }
}

impl StreamClient<()> {
    /// Starts building a client for the feed at `url`.
    pub fn builder(url: impl Into<String>) -> StreamClientBuilder {
        StreamClientBuilder::new(url)
    }
}

impl<T: Transport> StreamClient<T> {
    /// Begins (or restarts) streaming.
    ///
    /// Any current connection or pending retry is abandoned first. Reports
    /// [`StreamStatus::Connecting`] right away; everything after that
    /// happens on a spawned task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&self) {
        let (generation, cancel) = {
            let mut conn = self.inner.lock();
            conn.shutdown();
            conn.generation += 1;
            conn.active = true;
            let cancel = CancellationToken::new();
            conn.cancel = Some(cancel.clone());
            (conn.generation, cancel)
        };

        debug!(url = %self.inner.url, generation, "stream starting");
        self.inner.notify(generation, StreamStatus::Connecting);

        let inner = Arc::clone(&self.inner);
        let worker = tokio::spawn(async move { inner.run(generation, cancel).await });

        // The listener may already have called stop() or start() again.
        let mut conn = self.inner.lock();
        if conn.is_current(generation) {
            conn.worker = Some(worker);
        } else {
            worker.abort();
        }
    }

    /// Stops streaming: closes the connection, cancels any pending retry and
    /// silences the worker. Emits no status. Safe to call at any time, any
    /// number of times.
    pub fn stop(&self) {
        let mut conn = self.inner.lock();
        if conn.active {
            debug!(url = %self.inner.url, generation = conn.generation, "stream stopping");
        }
        conn.active = false;
        conn.shutdown();
        conn.state = ClientState::Stopped;
    }

    /// Whether the client has been started and not stopped since.
    ///
    /// Stays `true` while [`Offline`](ClientState::Offline): nothing is
    /// running, but the caller never asked the client to stop.
    pub fn is_active(&self) -> bool {
        self.inner.lock().active
    }

    /// The last observed lifecycle state.
    pub fn state(&self) -> ClientState {
        self.inner.lock().state
    }

    /// The feed URL.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// The dispatcher events are delivered to.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// The (validated) configuration in use.
    pub fn config(&self) -> &StreamConfig {
        &self.inner.config
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`StreamClient`]. See [`StreamClient::builder`].
pub struct StreamClientBuilder {
    url: String,
    tokens: Option<Arc<dyn TokenProvider>>,
    dispatcher: Option<Dispatcher>,
    listener: Arc<dyn StatusListener>,
    config: StreamConfig,
}

impl StreamClientBuilder {
    fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tokens: None,
            dispatcher: None,
            listener: Arc::new(IgnoreStatus),
            config: StreamConfig::default(),
        }
    }

    /// Where bearer tokens come from. Without one, every attempt is
    /// [`Offline`](StreamStatus::Offline).
    pub fn tokens(mut self, provider: impl TokenProvider) -> Self {
        self.tokens = Some(Arc::new(provider));
        self
    }

    /// Like [`tokens`](Self::tokens), for a provider that is already shared.
    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(provider);
        self
    }

    /// Like [`on_status`](Self::on_status), for a listener that is already shared.
    pub fn status_listener(mut self, listener: Arc<dyn StatusListener>) -> Self {
        self.listener = listener;
        self
    }

    /// The dispatcher to deliver events to. Defaults to a fresh one,
    /// reachable afterwards through [`StreamClient::dispatcher`].
    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Receives status notifications.
    pub fn on_status(mut self, listener: impl StatusListener) -> Self {
        self.listener = Arc::new(listener);
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets only the retry delay.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Finishes the client. It is idle until [`StreamClient::start`].
    pub fn build<T: Transport>(self, transport: T) -> StreamClient<T> {
        let tokens: Arc<dyn TokenProvider> = match self.tokens {
            Some(tokens) => tokens,
            None => Arc::new(SharedToken::new()),
        };
        StreamClient {
            inner: Arc::new(Inner {
                url: self.url,
                transport,
                tokens,
                dispatcher: self.dispatcher.unwrap_or_default(),
                listener: self.listener,
                config: self.config.validated(),
                conn: Mutex::new(Connection::default()),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

struct Inner<T> {
    url: String,
    transport: T,
    tokens: Arc<dyn TokenProvider>,
    dispatcher: Dispatcher,
    listener: Arc<dyn StatusListener>,
    config: StreamConfig,
    conn: Mutex<Connection>,
}

/// Mutable connection bookkeeping. Never held across an `.await` or while
/// user code (listener, handlers) runs.
struct Connection {
    active: bool,
    generation: u64,
    cancel: Option<CancellationToken>,
    worker: Option<JoinHandle<()>>,
    state: ClientState,
}

impl Default for Connection {
    fn default() -> Self {
        Self {
            active: false,
            generation: 0,
            cancel: None,
            worker: None,
            state: ClientState::Idle,
        }
    }
}

impl Connection {
    fn is_current(&self, generation: u64) -> bool {
        self.active && self.generation == generation
    }

    /// Cancels the worker, if any. Leaves `active` and `generation` alone.
    fn shutdown(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

/// How one connection attempt ended.
enum Outcome {
    /// Superseded by `stop()`/`start()`. Say nothing, do nothing.
    Cancelled,
    /// No token. Report it and end the worker.
    Offline,
    /// The server ended the body cleanly.
    Closed,
    Failed(StreamError),
}

impl<T: Transport> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().is_current(generation)
    }

    /// Records and reports `status` if `generation` is still current.
    /// Returns whether it was reported.
    fn notify(&self, generation: u64, status: StreamStatus) -> bool {
        {
            let mut conn = self.lock();
            if !conn.is_current(generation) {
                return false;
            }
            conn.state = match &status {
                StreamStatus::Connecting => ClientState::Connecting,
                StreamStatus::Open => ClientState::Open,
                StreamStatus::Error(_) => ClientState::Error,
                StreamStatus::Closed => ClientState::Closed,
                StreamStatus::Offline => ClientState::Offline,
            };
        }
        debug!(url = %self.url, generation, status = %status, "stream status");
        self.listener.on_status(&status);
        true
    }

    /// The worker loop: attempt, report, wait, repeat.
    async fn run(self: Arc<Self>, generation: u64, cancel: CancellationToken) {
        loop {
            match self.attempt(generation, &cancel).await {
                Outcome::Cancelled => return,
                Outcome::Offline => {
                    debug!(url = %self.url, reason = %StreamError::MissingToken, "stream offline");
                    self.notify(generation, StreamStatus::Offline);
                    return;
                }
                Outcome::Closed => {
                    self.notify(generation, StreamStatus::Closed);
                }
                Outcome::Failed(err) => {
                    if self.is_current(generation) {
                        warn!(url = %self.url, error = %err, "stream attempt failed");
                    }
                    self.notify(generation, StreamStatus::Error(Arc::new(err)));
                }
            }

            let delay = self.config.next_retry_delay();
            if !self.notify(generation, StreamStatus::Connecting) {
                return;
            }
            debug!(url = %self.url, delay_ms = delay.as_millis() as u64, "retry scheduled");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// One connection: open, stream until the body ends, report nothing.
    async fn attempt(&self, generation: u64, cancel: &CancellationToken) -> Outcome {
        if !self.is_current(generation) {
            return Outcome::Cancelled;
        }
        let Some(token) = current_token(self.tokens.as_ref()) else {
            return Outcome::Offline;
        };

        // Each attempt gets its own token; it is cancelled when the attempt
        // ends however it ends, and whenever the parent is cancelled.
        let cancel = cancel.child_token();
        let _cancel_on_exit = cancel.clone().drop_guard();

        let request = StreamRequest::get(self.url.as_str())
            .bearer_auth(&token)
            .header("Accept", self.config.accept.as_str())
            .header("Cache-Control", "no-cache");

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Outcome::Cancelled,
            opened = self.transport.open(request) => opened,
        };
        let response = match opened {
            Ok(response) => response,
            Err(e) => return Outcome::Failed(e.into()),
        };
        if !response.is_success() {
            return Outcome::Failed(StreamError::UnexpectedStatus(response.status));
        }
        if !self.notify(generation, StreamStatus::Open) {
            return Outcome::Cancelled;
        }

        let mut body = response.body;
        let mut decoder = FrameDecoder::new();
        loop {
            if !self.is_current(generation) {
                return Outcome::Cancelled;
            }
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Outcome::Cancelled,
                next = body.next() => next,
            };
            match next {
                None => {
                    // A trailing block without its blank line is incomplete.
                    decoder.finish();
                    return Outcome::Closed;
                }
                Some(Err(e)) => return Outcome::Failed(e.into()),
                Some(Ok(chunk)) => {
                    for event in decoder.push(&chunk) {
                        // A handler may have stopped us mid-chunk.
                        if !self.is_current(generation) {
                            return Outcome::Cancelled;
                        }
                        let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
                            self.dispatcher.dispatch_event(&event)
                        }));
                        if let Err(payload) = delivered {
                            return Outcome::Failed(StreamError::HandlerPanicked {
                                event_type: event.event_type,
                                message: panic_message(payload.as_ref()),
                            });
                        }
                    }
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
