use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub xkcd: XkcdConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api: ApiConfig::default(),
            database: DatabaseConfig::default(),
            xkcd: XkcdConfig::default(),
            index: IndexConfig::default(),
            broker: BrokerConfig::default(),
            auth: AuthConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_address")]
    pub address: SocketAddr,
    /// Per-request deadline in seconds; also bounds rate-limiter waits.
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            timeout_secs: default_api_timeout(),
        }
    }
}

fn default_address() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

fn default_api_timeout() -> u64 {
    5
}

/// Catalog database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("comics.db")
}

/// Upstream source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct XkcdConfig {
    #[serde(default = "default_xkcd_url")]
    pub url: String,
    /// Number of fetch workers during an update.
    #[serde(default = "default_xkcd_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_xkcd_timeout")]
    pub timeout_secs: u64,
}

impl Default for XkcdConfig {
    fn default() -> Self {
        Self {
            url: default_xkcd_url(),
            concurrency: default_xkcd_concurrency(),
            timeout_secs: default_xkcd_timeout(),
        }
    }
}

fn default_xkcd_url() -> String {
    "https://xkcd.com".to_string()
}

fn default_xkcd_concurrency() -> usize {
    1
}

fn default_xkcd_timeout() -> u64 {
    10
}

/// Search index configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Interval between periodic index rebuilds, in seconds.
    #[serde(default = "default_index_ttl")]
    pub ttl_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_index_ttl(),
        }
    }
}

fn default_index_ttl() -> u64 {
    120
}

/// Event bus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_subject")]
    pub subject: String,
    /// Per-subscriber buffer of in-flight payloads.
    #[serde(default = "default_broker_capacity")]
    pub capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            subject: default_broker_subject(),
            capacity: default_broker_capacity(),
        }
    }
}

fn default_broker_subject() -> String {
    "xkcd.db.updated".to_string()
}

fn default_broker_capacity() -> usize {
    256
}

/// Admin authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default = "default_admin_user")]
    pub admin_user: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_user: default_admin_user(),
            admin_password: default_admin_password(),
            jwt_secret: default_jwt_secret(),
            token_ttl_secs: default_token_ttl(),
        }
    }
}

fn default_admin_user() -> String {
    "admin".to_string()
}

fn default_admin_password() -> String {
    "password".to_string()
}

fn default_jwt_secret() -> String {
    "your-secret-key".to_string()
}

fn default_token_ttl() -> u64 {
    120
}

/// Search admission limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Concurrent full-scan searches admitted at once.
    #[serde(default = "default_search_concurrency")]
    pub search_concurrency: usize,
    /// Indexed searches admitted per second; zero rejects all traffic.
    #[serde(default = "default_search_rate")]
    pub search_rate: i64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            search_concurrency: default_search_concurrency(),
            search_rate: default_search_rate(),
        }
    }
}

fn default_search_concurrency() -> usize {
    10
}

fn default_search_rate() -> i64 {
    100
}

/// Config view for the API with secrets redacted.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub log_level: String,
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub xkcd: XkcdConfig,
    pub index: IndexConfig,
    pub broker: BrokerConfig,
    pub auth: SanitizedAuthConfig,
    pub limits: LimitsConfig,
}

/// Auth config with the password and signing key hidden.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub admin_user: String,
    pub password_configured: bool,
    pub jwt_secret_configured: bool,
    pub token_ttl_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            log_level: config.log_level.clone(),
            api: config.api.clone(),
            database: config.database.clone(),
            xkcd: config.xkcd.clone(),
            index: config.index.clone(),
            broker: config.broker.clone(),
            auth: SanitizedAuthConfig {
                admin_user: config.auth.admin_user.clone(),
                password_configured: !config.auth.admin_password.is_empty(),
                jwt_secret_configured: !config.auth.jwt_secret.is_empty(),
                token_ttl_secs: config.auth.token_ttl_secs,
            },
            limits: config.limits.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.api.address.port(), 8080);
        assert_eq!(config.database.path.to_str().unwrap(), "comics.db");
        assert_eq!(config.xkcd.url, "https://xkcd.com");
        assert_eq!(config.xkcd.concurrency, 1);
        assert_eq!(config.index.ttl_secs, 120);
        assert_eq!(config.broker.subject, "xkcd.db.updated");
        assert_eq!(config.limits.search_concurrency, 10);
        assert_eq!(config.limits.search_rate, 100);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let toml = r#"
log_level = "debug"

[api]
address = "127.0.0.1:9000"

[xkcd]
url = "http://localhost:8123"
concurrency = 8
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.api.address.port(), 9000);
        assert_eq!(config.xkcd.concurrency, 8);
        // untouched sections keep their defaults
        assert_eq!(config.auth.admin_user, "admin");
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let config = Config::default();
        let sanitized = SanitizedConfig::from(&config);
        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("password\""));
        assert!(!json.contains("your-secret-key"));
        assert!(json.contains("password_configured"));
        assert!(sanitized.auth.password_configured);
    }
}
