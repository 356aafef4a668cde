//! Configuration module for the Switchboard runtime.
//!
//! This module provides figment-based configuration loading and validation
//! for the bot identity, the adapter list, per-adapter and per-plugin
//! sections, free-form settings and logging.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, SpanEventConfig,
    SwitchboardConfig,
};
pub use validation::validate_config;
