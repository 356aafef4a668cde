//! Error types for the Switchboard framework.

use thiserror::Error;

/// Type-erased error returned by listener callbacks and plugin hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while compiling a listener pattern.
#[derive(Debug, Error)]
pub enum PatternError {
    /// A modifier outside the supported set (`i`, `m`, `s`, `x`, `U`).
    #[error("unsupported regex modifier '{0}'")]
    InvalidFlag(char),

    /// The pattern is not a valid regular expression.
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

/// Errors that can occur while loading a plugin.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The descriptor provides neither a `register` nor an `init` entry point.
    #[error("plugin '{name}' exposes no recognised entry point")]
    UnrecognizedShape {
        /// The plugin name.
        name: String,
    },

    /// The plugin's `init` hook failed.
    #[error("plugin '{name}' failed to initialise: {source}")]
    Init {
        /// The plugin name.
        name: String,
        /// The error returned by the hook.
        source: BoxError,
    },

    /// A listener declared by the plugin could not be compiled.
    #[error("plugin '{name}' registered an invalid pattern: {source}")]
    Pattern {
        /// The plugin name.
        name: String,
        /// The compilation error.
        source: PatternError,
    },
}

/// Result type for pattern compilation.
pub type PatternResult<T> = Result<T, PatternError>;
