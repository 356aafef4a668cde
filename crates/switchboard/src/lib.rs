//! # Switchboard
//!
//! A chat-bot message routing framework.
//!
//! ## Overview
//!
//! A [`Robot`](framework::Robot) sits between chat backends and the code that
//! answers them:
//!
//! ```text
//! ┌─────────────┐     ┌───────────┐     ┌─────────────────────────────┐
//! │   Adapter   │────▶│   Robot   │────▶│ hear   /ping/i              │
//! │   (shell)   │     │           │────▶│ respond /deploy (\w+)/      │
//! └─────────────┘     └───────────┘────▶│ catch_all                   │
//!        ▲                  │           └─────────────────────────────┘
//!        └──── send/reply ──┘◀──────────── Response
//! ```
//!
//! - **Adapters** normalize a backend into [`Message`](core::Message)s and
//!   deliver outbound strings
//! - **Listeners** pair a matcher (`hear`, `respond`, a predicate) with an
//!   async callback
//! - **Plugins** register listeners at startup, either through a plain
//!   `register` function or an `init`/`handle` pair
//! - **Runtime** loads configuration, adapters and plugins, and drives the
//!   lifecycle
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use switchboard::prelude::*;
//!
//! fn register(robot: &Robot) -> Result<(), BoxError> {
//!     robot.respond("ping", "ping", |res: Response| async move { res.reply("PONG").await })?;
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = SwitchboardRuntime::builder().build()?;
//!     runtime.register_adapter::<ShellAdapter>();
//!     runtime.register_plugin(PluginDescriptor::legacy("ping", register));
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `shell` *(default)*: the stdin/stdout adapter
//! - `toml-config` *(default)* / `yaml-config`: configuration file formats
//! - `json-log`: JSON log output

pub use switchboard_core as core;
pub use switchboard_framework as framework;
pub use switchboard_runtime as runtime;

#[cfg(feature = "shell")]
pub use switchboard_adapter_shell as shell;

/// Prelude module for convenient imports.
pub mod prelude {
    // Runtime - main entry point
    pub use switchboard_runtime::{LifecycleState, SwitchboardRuntime};

    // Listener registration and responses
    pub use switchboard_framework::prelude::*;

    // Data model and adapter contract
    pub use switchboard_core::{
        Adapter, AdapterContext, AdapterError, AdapterResult, ConfigurableAdapter, Envelope,
        Message, User,
    };

    #[cfg(feature = "shell")]
    pub use switchboard_adapter_shell::{ShellAdapter, ShellConfig};
}
