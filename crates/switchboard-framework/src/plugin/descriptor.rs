//! Plugin descriptor: the static, `Copy` shape a plugin crate exposes.

use std::sync::Arc;

use futures::future::BoxFuture;

use super::core::{Plugin, PluginLoadContext};
use crate::error::{BoxError, PluginError};
use crate::response::Response;
use crate::robot::Robot;

/// Old-style entry point: registers listeners directly on the robot.
pub type RegisterFn = fn(&Robot) -> Result<(), BoxError>;

/// New-style entry point, run once at load time.
pub type InitFn = fn(Robot, Arc<PluginLoadContext>) -> BoxFuture<'static, Result<(), BoxError>>;

/// New-style message handler, offered every text message.
pub type HandleFn = fn(Response) -> BoxFuture<'static, Result<(), BoxError>>;

/// A static descriptor naming a plugin and its entry points.
///
/// Which entry points are set decides the plugin's [`PluginKind`]; see
/// [`classify`].
///
/// ```rust,ignore
/// pub static PING: PluginDescriptor = PluginDescriptor::legacy("ping", register);
///
/// pub static GREET: PluginDescriptor = PluginDescriptor::modern("greet", init)
///     .with_handle(handle)
///     .with_description("Greets people who say hello");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PluginDescriptor {
    /// Plugin name (used in logs and as config lookup key).
    pub name: &'static str,
    pub description: &'static str,
    pub register: Option<RegisterFn>,
    pub init: Option<InitFn>,
    pub handle: Option<HandleFn>,
}

impl PluginDescriptor {
    /// Creates a descriptor with no entry points.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            description: "",
            register: None,
            init: None,
            handle: None,
        }
    }

    /// Creates an old-style descriptor.
    pub const fn legacy(name: &'static str, register: RegisterFn) -> Self {
        Self::new(name).with_register(register)
    }

    /// Creates a new-style descriptor.
    pub const fn modern(name: &'static str, init: InitFn) -> Self {
        Self::new(name).with_init(init)
    }

    pub const fn with_register(mut self, register: RegisterFn) -> Self {
        self.register = Some(register);
        self
    }

    pub const fn with_init(mut self, init: InitFn) -> Self {
        self.init = Some(init);
        self
    }

    pub const fn with_handle(mut self, handle: HandleFn) -> Self {
        self.handle = Some(handle);
        self
    }

    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Resolves the descriptor's shape. See [`classify`].
    pub fn classify(&self) -> Result<PluginKind, PluginError> {
        classify(self)
    }

    /// Creates the live plugin.
    pub fn instantiate(&self) -> Result<Plugin, PluginError> {
        Ok(Plugin::new(self.name, self.description, self.classify()?))
    }
}

/// The resolved shape of a plugin.
#[derive(Debug, Clone, Copy)]
pub enum PluginKind {
    /// Registers its listeners itself.
    Legacy(RegisterFn),
    /// Initialised with a load context; `handle`, if set, becomes a listener
    /// for every text message.
    Modern {
        init: InitFn,
        handle: Option<HandleFn>,
    },
}

impl PluginKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy(_) => "legacy",
            Self::Modern { .. } => "modern",
        }
    }
}

/// Resolves a descriptor into a [`PluginKind`].
///
/// An `init` entry point wins over `register`; a descriptor with neither is
/// rejected.
pub fn classify(descriptor: &PluginDescriptor) -> Result<PluginKind, PluginError> {
    match (descriptor.init, descriptor.register) {
        (Some(init), _) => Ok(PluginKind::Modern {
            init,
            handle: descriptor.handle,
        }),
        (None, Some(register)) => Ok(PluginKind::Legacy(register)),
        (None, None) => Err(PluginError::UnrecognizedShape {
            name: descriptor.name.to_string(),
        }),
    }
}
