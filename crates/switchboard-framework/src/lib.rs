//! # Switchboard Framework
//!
//! Listener matching, dispatch and plugin loading on top of
//! `switchboard-core`.
//!
//! This layer provides:
//! - Pattern compilation for `hear` and `respond` listeners ([`Pattern`])
//! - The [`Robot`], which owns the listener and adapter registries and drives
//!   dispatch
//! - The per-match [`Response`] handed to listener callbacks
//! - Plugin classification and loading ([`PluginDescriptor`], [`Plugin`])
//! - Opaque service boundaries ([`ConfigLookup`], [`UserStore`])
//!
//! ```rust,ignore
//! use switchboard_framework::prelude::*;
//!
//! let robot = Robot::new("hubot");
//! robot.respond("ping", (), |res: Response| async move { res.reply("PONG").await })?;
//! ```

pub mod error;
pub mod handler;
pub mod listener;
pub mod pattern;
pub mod plugin;
pub mod response;
pub mod robot;
pub mod service;

#[cfg(test)]
mod testing;

pub use error::{BoxError, PatternError, PatternResult, PluginError};
pub use handler::{ListenerCallback, ListenerReturn, into_callback};
pub use listener::{Listener, ListenerId, ListenerKind, ListenerMatcher, ListenerOptions, MatchData};
pub use pattern::{Pattern, compile_hear, compile_respond};
pub use plugin::{
    HandleFn, InitFn, Plugin, PluginDescriptor, PluginKind, PluginLoadContext, RegisterFn,
};
pub use response::{IntoStrings, Response};
pub use robot::Robot;
pub use service::{ConfigLookup, MemoryUserStore, Services, UserStore, ValueLookup};

/// Prelude for writing plugins.
pub mod prelude {
    pub use crate::error::BoxError;
    pub use crate::listener::{ListenerOptions, MatchData};
    pub use crate::pattern::Pattern;
    pub use crate::plugin::{PluginDescriptor, PluginLoadContext};
    pub use crate::response::Response;
    pub use crate::robot::Robot;
    pub use futures::future::BoxFuture;
}
