//! Plugin loading.
//!
//! A plugin crate exposes a static [`PluginDescriptor`]. Two shapes exist:
//!
//! - **Legacy**: a `register(&Robot)` function that adds listeners itself.
//! - **Modern**: an async `init(Robot, ctx)` hook run with a
//!   [`PluginLoadContext`], plus an optional `handle(Response)` that sees
//!   every text message.
//!
//! [`classify`] resolves a descriptor into a [`PluginKind`] once, at load
//! time; the resulting [`Plugin`] has a single entry point,
//! [`Plugin::initialize`].
//!
//! ```rust,ignore
//! fn register(robot: &Robot) -> Result<(), BoxError> {
//!     robot.hear("ping", (), |res: Response| async move { res.send("PONG").await })?;
//!     Ok(())
//! }
//!
//! pub static PING: PluginDescriptor = PluginDescriptor::legacy("ping", register);
//! ```
//!
//! # Configuration
//!
//! Plugin configuration is loaded from `switchboard.toml` under
//! `[plugins.<name>]` and handed to `init` through the load context:
//!
//! ```toml
//! [plugins.greet]
//! greeting = "hi there"
//! ```

mod core;
mod descriptor;

pub use self::core::{Plugin, PluginLoadContext};
pub use self::descriptor::{HandleFn, InitFn, PluginDescriptor, PluginKind, RegisterFn, classify};
