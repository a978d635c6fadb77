//! Upstream comic source.
//!
//! The updater reconciles the catalog against this read-only HTTP API:
//! `GET {base}/{id}/info.0.json` for one comic, `GET {base}/info.0.json`
//! for the latest one (whose number is the last known id).

mod client;
mod types;

pub use client::XkcdClient;
pub use types::*;

use async_trait::async_trait;

/// Port for the upstream comic source.
#[async_trait]
pub trait ComicSource: Send + Sync {
    /// Fetch one comic by id. Upstream 404 maps to [`XkcdError::NotFound`].
    async fn get(&self, id: i64) -> Result<XkcdInfo, XkcdError>;

    /// The highest comic id the upstream knows about.
    async fn last_id(&self) -> Result<i64, XkcdError>;
}
