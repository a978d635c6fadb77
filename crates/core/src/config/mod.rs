//! Service configuration.
//!
//! A TOML file provides the base values; a fixed set of environment
//! variables overrides individual keys. Every field has a default, so an
//! empty file is a valid configuration.

mod loader;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_str};
pub use types::*;
pub use validate::validate_config;

use thiserror::Error;

/// Errors for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Validation(String),
}
