use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment variables recognized as overrides, mapped onto their nested
/// config keys.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("LOG_LEVEL", "log_level"),
    ("API_ADDRESS", "api.address"),
    ("API_TIMEOUT", "api.timeout_secs"),
    ("DB_PATH", "database.path"),
    ("XKCD_URL", "xkcd.url"),
    ("XKCD_CONCURRENCY", "xkcd.concurrency"),
    ("XKCD_TIMEOUT", "xkcd.timeout_secs"),
    ("INDEX_TTL", "index.ttl_secs"),
    ("BROKER_SUBJECT", "broker.subject"),
    ("ADMIN_USER", "auth.admin_user"),
    ("ADMIN_PASSWORD", "auth.admin_password"),
    ("ADMIN_JWT_KEY", "auth.jwt_secret"),
    ("TOKEN_TTL", "auth.token_ttl_secs"),
    ("SEARCH_CONCURRENCY", "limits.search_concurrency"),
    ("SEARCH_RATE", "limits.search_rate"),
];

/// Load configuration from a TOML file with environment variable overrides.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let env_names: Vec<&str> = ENV_OVERRIDES.iter().map(|(name, _)| *name).collect();
    let env = Env::raw()
        .only(&env_names)
        .map(|key| {
            let upper = key.as_str().to_ascii_uppercase();
            match ENV_OVERRIDES.iter().find(|(name, _)| *name == upper) {
                Some((_, mapped)) => (*mapped).into(),
                None => upper.into(),
            }
        })
        .split(".");

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(env)
        .extract()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    Ok(config)
}

/// Load configuration from a TOML string (useful for testing).
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[limits]
search_rate = 25
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.limits.search_rate, 25);
    }

    #[test]
    fn test_load_config_from_str_invalid() {
        let result = load_config_from_str("limits = \"nonsense\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
log_level = "warn"

[xkcd]
concurrency = 4
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.xkcd.concurrency, 4);
    }
}
