//! Inbound dispatch boundary.
//!
//! Adapters never see the listener machinery. They hand messages to a
//! [`Dispatcher`] trait object through their [`AdapterContext`], and the
//! framework's robot implements the trait.
//!
//! [`AdapterContext`]: crate::integration::adapter::AdapterContext

use std::sync::Arc;

use async_trait::async_trait;

use crate::foundation::message::Message;
use crate::integration::adapter::BoxedAdapter;

/// Completion signal invoked once matching for a message has finished.
///
/// Adapters use it to acknowledge delivery to their backend.
pub type Completion = Box<dyn FnOnce() + Send>;

/// Receives inbound messages and drives listener matching.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Dispatch `message`, received by `origin`, to every registered listener.
    ///
    /// `done` is invoked once all listeners have been tested.
    async fn receive(&self, message: Message, origin: BoxedAdapter, done: Option<Completion>);
}

/// A shared dispatcher trait object.
pub type BoxedDispatcher = Arc<dyn Dispatcher>;
