//! Switchboard Runtime - Orchestration layer for the Switchboard bot framework.
//!
//! This crate provides:
//! - Layered configuration loading and validation ([`config`])
//! - Logging setup ([`LoggingBuilder`], [`logging::init_from_config`])
//! - The lifecycle state machine ([`Lifecycle`], [`LifecycleState`])
//! - Runtime orchestration ([`SwitchboardRuntime`])
//!
//! ```ignore
//! use switchboard_runtime::SwitchboardRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = SwitchboardRuntime::builder().build()?;
//!
//!     runtime.register_adapter::<ShellAdapter>();
//!     runtime.register_plugin(ping::PLUGIN);
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod runtime;

pub use config::{
    BotConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, SwitchboardConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use lifecycle::{Lifecycle, LifecycleError, LifecycleHook, LifecycleState};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{RuntimeBuilder, SwitchboardRuntime};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
