//! Unified error types for the Switchboard core.
//!
//! This module provides the error types shared by adapters and the dispatcher.
//! Framework-level errors (pattern compilation, plugin loading) are defined in
//! `switchboard-framework`; configuration errors live in `switchboard-runtime`.

use thiserror::Error;

// =============================================================================
// Adapter Errors
// =============================================================================

/// Errors raised by an adapter while running or delivering outbound messages.
///
/// Adapters own their recovery policy: the dispatcher propagates these to the
/// caller of `send`/`reply` but never retries on the adapter's behalf.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// The backend does not support the requested action.
    #[error("action '{action}' is not supported by adapter '{adapter}'")]
    Unsupported {
        /// The adapter that rejected the action.
        adapter: String,
        /// The action name (e.g. "emote").
        action: &'static str,
    },

    /// Delivering an outbound message failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// The adapter has already been closed.
    #[error("adapter '{0}' is closed")]
    Closed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal adapter error.
    #[error("adapter error: {0}")]
    Internal(String),
}

impl AdapterError {
    /// Creates an internal adapter error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Creates a send failure.
    pub fn send_failed(msg: impl Into<String>) -> Self {
        Self::SendFailed(msg.into())
    }
}

impl From<std::io::Error> for AdapterError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Errors raised when routing an outbound call through the dispatcher.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The envelope names an adapter that was never registered.
    #[error("no adapter named '{name}' is registered")]
    UnknownAdapter {
        /// The unresolved adapter name.
        name: String,
    },

    /// The resolved adapter failed to deliver the message.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl DispatchError {
    /// Creates an unknown-adapter error.
    pub fn unknown_adapter(name: impl Into<String>) -> Self {
        Self::UnknownAdapter { name: name.into() }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Result type for dispatcher routing operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
