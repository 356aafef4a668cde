//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use crate::lifecycle::LifecycleError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An adapter's configuration section could not be deserialized.
    #[error("Failed to deserialize config for adapter '{name}': {message}")]
    AdapterConfig { name: String, message: String },

    #[error("Adapter error: {0}")]
    Adapter(#[from] switchboard_core::AdapterError),

    /// The configuration names an adapter no factory was registered for.
    #[error("Unknown adapter type: {0}")]
    UnknownAdapterType(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Plugin(#[from] switchboard_framework::PluginError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
