//! Listener callbacks.
//!
//! Any async function or closure taking a [`Response`] can be registered as a
//! listener callback, as long as its output implements [`ListenerReturn`]:
//!
//! ```rust,ignore
//! // No return value
//! robot.hear("ping", (), |res: Response| async move {
//!     let _ = res.send("PONG").await;
//! })?;
//!
//! // Errors are logged by the dispatcher
//! robot.respond("deploy (\\w+)", "deploy", |res: Response| async move {
//!     let app = res.group(1).unwrap_or_default().to_string();
//!     start_deploy(&app).await?;
//!     res.reply(format!("deploying {app}")).await?;
//!     Ok::<_, BoxError>(())
//! })?;
//!
//! // A returned String is sent as a reply
//! robot.respond("time", (), |_res: Response| async move {
//!     current_time().to_string()
//! })?;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::BoxError;
use crate::response::Response;

// ============================================================================
// ListenerReturn - Handle callback return values
// ============================================================================

/// A trait for types a listener callback may return.
#[async_trait]
pub trait ListenerReturn: Send {
    /// Acts on the returned value, yielding the callback's final outcome.
    async fn into_outcome(self, res: &Response) -> Result<(), BoxError>;
}

/// `()` - nothing to do.
#[async_trait]
impl ListenerReturn for () {
    async fn into_outcome(self, _res: &Response) -> Result<(), BoxError> {
        Ok(())
    }
}

/// `String` - sent as a reply to the matched message.
#[async_trait]
impl ListenerReturn for String {
    async fn into_outcome(self, res: &Response) -> Result<(), BoxError> {
        res.reply(self).await?;
        Ok(())
    }
}

/// `Option<T>` - `None` is a no-op.
#[async_trait]
impl<T: ListenerReturn> ListenerReturn for Option<T> {
    async fn into_outcome(self, res: &Response) -> Result<(), BoxError> {
        match self {
            Some(t) => t.into_outcome(res).await,
            None => Ok(()),
        }
    }
}

/// `Result<T, E>` - `Err` becomes the callback's failure.
#[async_trait]
impl<T, E> ListenerReturn for Result<T, E>
where
    T: ListenerReturn,
    E: Into<BoxError> + Send,
{
    async fn into_outcome(self, res: &Response) -> Result<(), BoxError> {
        match self {
            Ok(t) => t.into_outcome(res).await,
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// ListenerCallback - type-erased callback stored in a listener
// ============================================================================

/// A type-erased listener callback.
pub type ListenerCallback =
    Arc<dyn Fn(Response) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Converts an async function into a [`ListenerCallback`].
///
/// The function is only called once the returned future is polled, so a
/// panic in its synchronous prologue is caught with the rest of the callback.
pub fn into_callback<F, Fut, R>(f: F) -> ListenerCallback
where
    F: Fn(Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: ListenerReturn + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |res: Response| {
        let f = Arc::clone(&f);
        Box::pin(async move {
            let output = f(res.clone()).await;
            output.into_outcome(&res).await
        })
    })
}
