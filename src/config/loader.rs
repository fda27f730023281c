//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::BlogConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Why a configuration file could not be turned into a [`BlogConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BlogConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: BlogConfig = toml::from_str(&content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::debug!(path = %path.display(), "Configuration file loaded");
    Ok(config)
}
