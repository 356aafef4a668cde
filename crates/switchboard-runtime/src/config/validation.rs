//! Configuration validation utilities.

use std::collections::HashSet;

use tracing::warn;

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, LogOutput, LoggingConfig, SwitchboardConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &SwitchboardConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_adapters(config)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates the robot identity.
fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.name.trim().is_empty() {
        return Err(ConfigError::missing_field("bot.name"));
    }

    if let Some(alias) = &bot.alias
        && alias.trim().is_empty()
    {
        return Err(ConfigError::validation("bot.alias cannot be empty"));
    }

    Ok(())
}

/// Validates the adapter list.
fn validate_adapters(config: &SwitchboardConfig) -> ConfigResult<()> {
    if config.adapters.is_empty() {
        return Err(ConfigError::missing_field("adapters"));
    }

    let mut seen = HashSet::new();
    for name in &config.adapters {
        if name.trim().is_empty() {
            return Err(ConfigError::validation("Adapter names cannot be empty"));
        }
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::DuplicateAdapter(name.clone()));
        }
    }

    for name in config.adapter.keys() {
        if !seen.contains(name.as_str()) {
            warn!(adapter = %name, "Configuration section for an adapter that is not loaded");
        }
    }

    Ok(())
}

/// Validates logging configuration.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}
