//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{CommandsConfig, KgemConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &KgemConfig) -> ConfigResult<()> {
    validate_logging(&config.logging)?;
    validate_commands(&config.commands)?;
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation("File output requires `logging.file_path`"));
    }

    if let Some(target) = logging.filters.keys().find(|t| t.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Log filter target cannot be blank: {target:?}"
        )));
    }

    Ok(())
}

fn validate_commands(commands: &CommandsConfig) -> ConfigResult<()> {
    if commands.default_prefixes.is_empty() {
        return Err(ConfigError::validation(
            "`commands.default_prefixes` must contain at least one character",
        ));
    }

    if commands.default_prefixes.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(
            "`commands.default_prefixes` cannot contain whitespace",
        ));
    }

    if commands.timeout_ms == Some(0) {
        return Err(ConfigError::validation("`commands.timeout_ms` must be greater than 0"));
    }

    Ok(())
}
