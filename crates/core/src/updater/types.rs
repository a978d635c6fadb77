//! Types for the catalog updater.

use serde::Serialize;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::xkcd::XkcdError;

/// Whether an update or drop is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    Idle,
    Running,
}

/// Catalog statistics combined with the upstream's highest known id.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ServiceStats {
    pub words_total: i64,
    pub words_unique: i64,
    pub comics_fetched: i64,
    pub comics_total: i64,
}

/// Errors for update operations.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("an update or reset is already in progress")]
    AlreadyInProgress,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("upstream source failed: {0}")]
    Upstream(#[from] XkcdError),

    #[error("storage failed: {0}")]
    Storage(#[from] CatalogError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&UpdateStatus::Idle).unwrap(), "\"idle\"");
        assert_eq!(
            serde_json::to_string(&UpdateStatus::Running).unwrap(),
            "\"running\""
        );
    }
}
