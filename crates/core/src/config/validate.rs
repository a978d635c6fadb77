use super::{types::Config, ConfigError};

/// Validate configuration invariants that serde defaults cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.api.address.port() == 0 {
        return Err(ConfigError::Validation(
            "api.address port cannot be 0".to_string(),
        ));
    }

    if config.api.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "api.timeout_secs must be positive".to_string(),
        ));
    }

    if config.xkcd.url.is_empty() {
        return Err(ConfigError::Validation(
            "xkcd.url cannot be empty".to_string(),
        ));
    }

    if config.xkcd.concurrency < 1 {
        return Err(ConfigError::Validation(
            "xkcd.concurrency must be at least 1".to_string(),
        ));
    }

    if config.index.ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "index.ttl_secs must be positive".to_string(),
        ));
    }

    if config.limits.search_concurrency < 1 {
        return Err(ConfigError::Validation(
            "limits.search_concurrency must be at least 1".to_string(),
        ));
    }

    if config.limits.search_rate < 0 {
        return Err(ConfigError::Validation(
            "limits.search_rate cannot be negative".to_string(),
        ));
    }

    if config.auth.token_ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "auth.token_ttl_secs must be positive".to_string(),
        ));
    }

    Ok(())
}
