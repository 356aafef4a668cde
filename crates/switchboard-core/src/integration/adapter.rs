//! Adapter trait and runtime context.
//!
//! This module defines the adapter interface that bridges chat backends with
//! the Switchboard dispatcher.
//!
//! # Capability Set
//!
//! An adapter exposes five outbound primitives (`send`, `reply`, `emote`,
//! `topic`, `play`) and a lifecycle pair (`run`, `close`). Every outbound
//! primitive has a no-op default, so an adapter overrides only the actions
//! that mean something to its backend:
//!
//! ```rust,ignore
//! #[async_trait]
//! impl Adapter for ConsoleAdapter {
//!     fn name(&self) -> &str {
//!         "console"
//!     }
//!
//!     async fn send(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
//!         for line in strings {
//!             println!("[{}] {line}", envelope.room());
//!         }
//!         Ok(())
//!     }
//!
//!     async fn run(&self, ctx: AdapterContext) -> AdapterResult<()> {
//!         while let Some(line) = next_line().await {
//!             ctx.receive(Message::text(User::new("console"), "console", line)).await;
//!         }
//!         Ok(())
//!     }
//! }
//! ```
//!
//! # Inbound Flow
//!
//! `run` receives an [`AdapterContext`]. Calling [`AdapterContext::receive`]
//! hands the message to the dispatcher together with a reference to the
//! originating adapter, so replies can be routed back.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::foundation::envelope::Envelope;
use crate::foundation::error::AdapterResult;
use crate::foundation::message::Message;
use crate::integration::dispatcher::{BoxedDispatcher, Completion};

/// The core adapter trait.
///
/// Adapters normalise a chat backend. They are responsible for:
///
/// - Connecting to the backend in [`run`](Adapter::run)
/// - Translating platform events into [`Message`]s
/// - Delivering outbound strings for the actions the backend supports
/// - Releasing everything acquired by `run` in [`close`](Adapter::close)
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Returns the adapter name (e.g. "shell").
    ///
    /// This name is the key in the dispatcher's adapter registry and the value
    /// stored in every [`Envelope`] built from this adapter's messages.
    fn name(&self) -> &str;

    /// Sends strings to the envelope's room.
    async fn send(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        trace!(
            adapter = self.name(),
            room = envelope.room(),
            count = strings.len(),
            "send ignored"
        );
        Ok(())
    }

    /// Sends strings addressed to the envelope's user.
    async fn reply(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        trace!(
            adapter = self.name(),
            room = envelope.room(),
            count = strings.len(),
            "reply ignored"
        );
        Ok(())
    }

    /// Sends strings as an emote/action.
    async fn emote(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        trace!(
            adapter = self.name(),
            room = envelope.room(),
            count = strings.len(),
            "emote ignored"
        );
        Ok(())
    }

    /// Sets the room topic.
    async fn topic(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        trace!(
            adapter = self.name(),
            room = envelope.room(),
            count = strings.len(),
            "topic ignored"
        );
        Ok(())
    }

    /// Plays a sound or media item.
    async fn play(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        trace!(
            adapter = self.name(),
            room = envelope.room(),
            count = strings.len(),
            "play ignored"
        );
        Ok(())
    }

    /// Runs the adapter's connection/event loop.
    ///
    /// May be long-lived. Implementations should return promptly once
    /// [`AdapterContext::shutdown_token`] is cancelled.
    async fn run(&self, ctx: AdapterContext) -> AdapterResult<()>;

    /// Releases all resources acquired by `run`.
    ///
    /// Must be safe to call before `run`, and more than once.
    async fn close(&self) -> AdapterResult<()> {
        Ok(())
    }
}

/// A shared adapter trait object.
pub type BoxedAdapter = Arc<dyn Adapter>;

/// Trait for adapters that can be created from configuration.
///
/// This is a separate trait so that [`Adapter`] stays object safe.
pub trait ConfigurableAdapter: Adapter {
    /// The configuration type for this adapter.
    type Config: serde::de::DeserializeOwned + Default;

    /// Returns the name under which this adapter is configured.
    ///
    /// ```toml
    /// adapters = ["shell"]   # <- adapter_name()
    ///
    /// [adapter.shell]        # <- deserialized into Self::Config
    /// user = "me"
    /// ```
    fn adapter_name() -> &'static str
    where
        Self: Sized;

    /// Creates an adapter from its configuration.
    fn from_config(config: Self::Config) -> AdapterResult<Arc<Self>>
    where
        Self: Sized;
}

// =============================================================================
// AdapterContext
// =============================================================================

/// Context handed to [`Adapter::run`].
///
/// Provides:
/// - The inbound entry point ([`receive`](Self::receive)) wired to the dispatcher
/// - A reference to the originating adapter for reply routing
/// - A cancellation token fired when the adapter is closed
///
/// The context holds a strong reference to its adapter; adapters should keep
/// it on the stack of `run` rather than storing it in a field.
#[derive(Clone)]
pub struct AdapterContext {
    dispatcher: BoxedDispatcher,
    origin: BoxedAdapter,
    shutdown: CancellationToken,
}

impl AdapterContext {
    /// Creates a new adapter context.
    pub fn new(
        dispatcher: BoxedDispatcher,
        origin: BoxedAdapter,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            dispatcher,
            origin,
            shutdown,
        }
    }

    /// Returns the name of the adapter this context belongs to.
    pub fn adapter_name(&self) -> &str {
        self.origin.name()
    }

    /// Returns the originating adapter.
    pub fn adapter(&self) -> &BoxedAdapter {
        &self.origin
    }

    /// Hands an inbound message to the dispatcher.
    ///
    /// Returns once every listener has been tested against the message.
    pub async fn receive(&self, message: Message) {
        self.dispatcher
            .receive(message, Arc::clone(&self.origin), None)
            .await;
    }

    /// Hands an inbound message to the dispatcher, invoking `done` once
    /// matching completes.
    pub async fn receive_with<F>(&self, message: Message, done: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let done: Completion = Box::new(done);
        self.dispatcher
            .receive(message, Arc::clone(&self.origin), Some(done))
            .await;
    }

    /// Returns the token cancelled when the adapter is closed.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Returns `true` once shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl std::fmt::Debug for AdapterContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterContext")
            .field("adapter", &self.origin.name())
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::message::User;
    use crate::integration::dispatcher::Dispatcher;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct SilentAdapter;

    #[async_trait]
    impl Adapter for SilentAdapter {
        fn name(&self) -> &str {
            "silent"
        }

        async fn run(&self, _ctx: AdapterContext) -> AdapterResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Dispatcher for RecordingDispatcher {
        async fn receive(&self, message: Message, origin: BoxedAdapter, done: Option<Completion>) {
            self.seen
                .lock()
                .push((origin.name().to_string(), message.kind().to_string()));
            if let Some(done) = done {
                done();
            }
        }
    }

    #[tokio::test]
    async fn test_default_actions_are_noops() {
        let adapter = SilentAdapter;
        let envelope = Envelope::new(User::new("u1"), "room", "silent");
        let strings = vec!["hi".to_string()];

        assert!(adapter.send(&envelope, &strings).await.is_ok());
        assert!(adapter.reply(&envelope, &strings).await.is_ok());
        assert!(adapter.emote(&envelope, &strings).await.is_ok());
        assert!(adapter.topic(&envelope, &strings).await.is_ok());
        assert!(adapter.play(&envelope, &strings).await.is_ok());
        assert!(adapter.close().await.is_ok());
        assert!(adapter.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_context_forwards_origin_and_completion() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let ctx = AdapterContext::new(
            dispatcher.clone(),
            Arc::new(SilentAdapter),
            CancellationToken::new(),
        );

        let acked = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&acked);
        ctx.receive_with(Message::text(User::new("u1"), "room", "hi"), move || {
            flag.store(true, Ordering::SeqCst);
        })
        .await;

        assert!(acked.load(Ordering::SeqCst));
        assert_eq!(
            dispatcher.seen.lock().as_slice(),
            &[("silent".to_string(), "text".to_string())]
        );
        assert_eq!(ctx.adapter_name(), "silent");
    }

    #[test]
    fn test_shutdown_token_is_shared() {
        let token = CancellationToken::new();
        let ctx = AdapterContext::new(
            Arc::new(RecordingDispatcher::default()),
            Arc::new(SilentAdapter),
            token.clone(),
        );

        assert!(!ctx.is_shutdown());
        token.cancel();
        assert!(ctx.is_shutdown());
    }
}
