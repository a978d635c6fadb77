//! Types for the upstream comic source.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The upstream's view of one comic (`info.0.json`), used transiently
/// during ingest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XkcdInfo {
    /// Comic number.
    #[serde(rename = "num")]
    pub id: i64,
    /// Image URL.
    #[serde(rename = "img", default)]
    pub url: String,
    #[serde(default)]
    pub safe_title: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub transcript: String,
}

impl XkcdInfo {
    /// The text fed to the normalizer: title fields joined by single spaces.
    pub fn description(&self) -> String {
        [
            self.safe_title.as_str(),
            self.title.as_str(),
            self.transcript.as_str(),
            self.alt.as_str(),
        ]
        .join(" ")
    }
}

/// Errors for upstream fetches.
#[derive(Debug, Error)]
pub enum XkcdError {
    #[error("comic not found")]
    NotFound,

    #[error("unexpected status code {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("client is not configured: {0}")]
    NotConfigured(String),
}
