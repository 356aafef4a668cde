//! The robot: listener registry, adapter registry and dispatch loop.
//!
//! A [`Robot`] owns the ordered list of listeners and the map of active
//! adapters. Adapters hand inbound messages to [`Robot::receive`] (usually via
//! the [`Dispatcher`] impl and an `AdapterContext`); listener callbacks answer
//! through [`Robot::send`] and [`Robot::reply`], which resolve the adapter
//! named in the envelope.
//!
//! # Dispatch Order
//!
//! 1. Unrecognised messages are logged and dropped
//! 2. The listener list is snapshotted; listeners registered from now on only
//!    see later messages
//! 3. Ordinary listeners are tested in registration order, and each matching
//!    callback is awaited before the next listener is tested
//! 4. If none matched, catch-all listeners are invoked in registration order
//! 5. The completion callback, if any, is invoked
//!
//! ```rust,ignore
//! let robot = Robot::new("hubot");
//!
//! robot.hear(Pattern::with_flags("ping", "i"), (), |res: Response| async move {
//!     res.send("PONG").await
//! })?;
//!
//! robot.respond(r"deploy (\w+)", "deploy", |res: Response| async move {
//!     format!("deploying {}", res.group(1).unwrap_or("nothing"))
//! })?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use switchboard_core::{
    BoxedAdapter, Completion, DispatchError, DispatchResult, Dispatcher, Envelope, Message,
};
use tracing::{Instrument, debug, debug_span, error, info, trace, warn};

use crate::error::PatternResult;
use crate::handler::{ListenerReturn, into_callback};
use crate::listener::{
    Listener, ListenerId, ListenerKind, ListenerMatcher, ListenerOptions, MatchData,
};
use crate::pattern::{Pattern, compile_hear, compile_respond};
use crate::response::{IntoStrings, Response};

struct RobotInner {
    name: String,
    alias: Option<String>,
    listeners: RwLock<Vec<Arc<Listener>>>,
    adapters: RwLock<HashMap<String, BoxedAdapter>>,
    next_id: AtomicU64,
}

/// The central dispatcher of the Switchboard framework.
///
/// `Robot` is a cheap-to-clone handle; all clones share the same registries.
#[derive(Clone)]
pub struct Robot {
    inner: Arc<RobotInner>,
}

impl Robot {
    /// Creates a robot addressed as `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), None)
    }

    /// Creates a robot addressed as `name` or by `alias`.
    pub fn with_alias(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::build(name.into(), Some(alias.into()))
    }

    fn build(name: String, alias: Option<String>) -> Self {
        Self {
            inner: Arc::new(RobotInner {
                name,
                alias,
                listeners: RwLock::new(Vec::new()),
                adapters: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn alias(&self) -> Option<&str> {
        self.inner.alias.as_deref()
    }

    // ========================================================================
    // Listener registration
    // ========================================================================

    /// Registers a listener for any text message matching `pattern`.
    pub fn hear<P, O, F, Fut, R>(
        &self,
        pattern: P,
        options: O,
        callback: F,
    ) -> PatternResult<ListenerId>
    where
        P: Into<Pattern>,
        O: Into<ListenerOptions>,
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ListenerReturn + 'static,
    {
        let regex = compile_hear(&pattern.into())?;
        Ok(self.register(
            ListenerKind::Hear,
            ListenerMatcher::Text(regex),
            options.into(),
            callback,
        ))
    }

    /// Registers a listener for text messages addressed to the robot.
    ///
    /// The message must start with the robot's name or alias, optionally
    /// preceded by `@` and followed by `:` or `,`. See [`compile_respond`].
    pub fn respond<P, O, F, Fut, R>(
        &self,
        pattern: P,
        options: O,
        callback: F,
    ) -> PatternResult<ListenerId>
    where
        P: Into<Pattern>,
        O: Into<ListenerOptions>,
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ListenerReturn + 'static,
    {
        let regex = compile_respond(&pattern.into(), self.name(), self.alias())?;
        Ok(self.register(
            ListenerKind::Respond,
            ListenerMatcher::Text(regex),
            options.into(),
            callback,
        ))
    }

    /// Registers a listener with a custom predicate over any message variant.
    pub fn listen<M, O, F, Fut, R>(&self, matcher: M, options: O, callback: F) -> ListenerId
    where
        M: Fn(&Message) -> Option<MatchData> + Send + Sync + 'static,
        O: Into<ListenerOptions>,
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ListenerReturn + 'static,
    {
        self.register(
            ListenerKind::Custom,
            ListenerMatcher::Predicate(Arc::new(matcher)),
            options.into(),
            callback,
        )
    }

    /// Registers a listener invoked only for messages no other listener matched.
    pub fn catch_all<O, F, Fut, R>(&self, options: O, callback: F) -> ListenerId
    where
        O: Into<ListenerOptions>,
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ListenerReturn + 'static,
    {
        self.register(ListenerKind::CatchAll, ListenerMatcher::CatchAll, options.into(), callback)
    }

    /// Presence listeners are not supported at the robot level; use
    /// [`listen`](Self::listen) with a predicate on [`Message::Enter`].
    pub fn enter<O: Into<ListenerOptions>, F>(&self, options: O, _callback: F) {
        let options = options.into();
        warn!(action = "enter", listener = ?options.id, "Unsupported action");
    }

    /// See [`enter`](Self::enter).
    pub fn leave<O: Into<ListenerOptions>, F>(&self, options: O, _callback: F) {
        let options = options.into();
        warn!(action = "leave", listener = ?options.id, "Unsupported action");
    }

    fn register<F, Fut, R>(
        &self,
        kind: ListenerKind,
        matcher: ListenerMatcher,
        options: ListenerOptions,
        callback: F,
    ) -> ListenerId
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ListenerReturn + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let listener = Listener::new(id, kind, matcher, options, into_callback(callback));
        debug!(listener = %listener.label(), kind = kind.as_str(), "Listener registered");
        self.inner.listeners.write().push(Arc::new(listener));
        id
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    // ========================================================================
    // Adapter registry
    // ========================================================================

    /// Registers an adapter under its [`name`](switchboard_core::Adapter::name).
    ///
    /// Returns the adapter previously registered under that name, if any.
    pub fn add_adapter(&self, adapter: BoxedAdapter) -> Option<BoxedAdapter> {
        let name = adapter.name().to_string();
        let previous = self.inner.adapters.write().insert(name.clone(), adapter);
        if previous.is_some() {
            warn!(adapter = %name, "Replacing an already registered adapter");
        } else {
            info!(adapter = %name, "Adapter registered");
        }
        previous
    }

    /// Returns the adapter registered under `name`.
    pub fn adapter(&self, name: &str) -> Option<BoxedAdapter> {
        self.inner.adapters.read().get(name).cloned()
    }

    /// Returns the names of all registered adapters, sorted.
    pub fn adapter_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.inner.adapters.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolves the adapter named in `envelope`.
    pub fn resolve(&self, envelope: &Envelope) -> DispatchResult<BoxedAdapter> {
        self.adapter(envelope.adapter_name())
            .ok_or_else(|| DispatchError::unknown_adapter(envelope.adapter_name()))
    }

    // ========================================================================
    // Inbound dispatch
    // ========================================================================

    /// Dispatches `message`, received by `origin`, to the registered listeners.
    ///
    /// `done` is invoked once every listener has been tested. Unrecognised
    /// messages are logged and dropped without invoking `done`.
    pub async fn receive(&self, message: Message, origin: &BoxedAdapter, done: Option<Completion>) {
        if !message.is_recognized() {
            debug!(
                kind = message.kind(),
                adapter = origin.name(),
                "Ignoring unrecognized message"
            );
            return;
        }

        let adapter_name = origin.name().to_string();
        if !self.inner.adapters.read().contains_key(&adapter_name) {
            warn!(
                adapter = %adapter_name,
                "Message received from an unregistered adapter, replies will fail"
            );
        }

        let span = debug_span!("receive", kind = message.kind(), adapter = %adapter_name);
        let matched = self.dispatch(message, adapter_name).instrument(span).await;
        trace!(matched, "Dispatch finished");

        if let Some(done) = done {
            done();
        }
    }

    async fn dispatch(&self, message: Message, adapter_name: String) -> usize {
        let envelope = Envelope::from_message(&message, adapter_name);
        let message = Arc::new(message);
        let snapshot: Vec<Arc<Listener>> = self.inner.listeners.read().clone();

        let mut matched = 0;
        for listener in snapshot.iter().filter(|l| !l.is_catch_all()) {
            if listener.call(self, &message, &envelope).await {
                matched += 1;
            }
        }

        if matched == 0 {
            for listener in snapshot.iter().filter(|l| l.is_catch_all()) {
                if listener.call(self, &message, &envelope).await {
                    matched += 1;
                }
            }
        }

        matched
    }

    // ========================================================================
    // Outbound routing
    // ========================================================================

    /// Sends strings through the adapter named in `envelope`.
    ///
    /// Fails with [`DispatchError::UnknownAdapter`] before any adapter is
    /// called if the name is not registered.
    pub async fn send(&self, envelope: &Envelope, strings: impl IntoStrings) -> DispatchResult<()> {
        let adapter = self.resolve(envelope)?;
        adapter.send(envelope, &strings.into_strings()).await?;
        Ok(())
    }

    /// Replies through the adapter named in `envelope`.
    ///
    /// Whether the reply is addressed to the envelope's user is up to the
    /// adapter.
    pub async fn reply(
        &self,
        envelope: &Envelope,
        strings: impl IntoStrings,
    ) -> DispatchResult<()> {
        let adapter = self.resolve(envelope)?;
        adapter.reply(envelope, &strings.into_strings()).await?;
        Ok(())
    }

    /// Plays a sound or media item through the adapter named in `envelope`.
    pub async fn play(&self, envelope: &Envelope, strings: impl IntoStrings) -> DispatchResult<()> {
        let adapter = self.resolve(envelope)?;
        adapter.play(envelope, &strings.into_strings()).await?;
        Ok(())
    }

    /// Not supported at the robot level; logs a warning.
    ///
    /// [`Response::emote`] calls the adapter directly.
    pub async fn emote(
        &self,
        envelope: &Envelope,
        strings: impl IntoStrings,
    ) -> DispatchResult<()> {
        let strings = strings.into_strings();
        warn!(
            action = "emote",
            adapter = envelope.adapter_name(),
            count = strings.len(),
            "Unsupported action"
        );
        Ok(())
    }

    /// Not supported at the robot level; logs a warning.
    ///
    /// [`Response::topic`] calls the adapter directly.
    pub async fn topic(
        &self,
        envelope: &Envelope,
        strings: impl IntoStrings,
    ) -> DispatchResult<()> {
        let strings = strings.into_strings();
        warn!(
            action = "topic",
            adapter = envelope.adapter_name(),
            count = strings.len(),
            "Unsupported action"
        );
        Ok(())
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Closes and unregisters every adapter.
    ///
    /// Each adapter is closed once; calling `shutdown` again is a no-op.
    pub async fn shutdown(&self) {
        let adapters: Vec<BoxedAdapter> = self
            .inner
            .adapters
            .write()
            .drain()
            .map(|(_, a)| a)
            .collect();
        for adapter in adapters {
            match adapter.close().await {
                Ok(()) => info!(adapter = adapter.name(), "Adapter closed"),
                Err(e) => error!(adapter = adapter.name(), error = %e, "Failed to close adapter"),
            }
        }
    }
}

#[async_trait]
impl Dispatcher for Robot {
    async fn receive(&self, message: Message, origin: BoxedAdapter, done: Option<Completion>) {
        Robot::receive(self, message, &origin, done).await;
    }
}

impl fmt::Debug for Robot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Robot")
            .field("name", &self.inner.name)
            .field("alias", &self.inner.alias)
            .field("listener_count", &self.listener_count())
            .field("adapters", &self.adapter_names())
            .finish()
    }
}
