//! HTTP client for the upstream comic source.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::debug;

use super::types::{XkcdError, XkcdInfo};
use super::ComicSource;

const INFO_ENDPOINT: &str = "info.0.json";

/// Read-only client for the upstream JSON API.
pub struct XkcdClient {
    client: Client,
    base_url: String,
}

impl XkcdClient {
    /// Create a client for the given base URL. A URL without a scheme gets
    /// `https://` prepended.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, XkcdError> {
        if base_url.is_empty() {
            return Err(XkcdError::NotConfigured("empty base url".to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
        })
    }

    async fn fetch_info(&self, url: &str) -> Result<XkcdInfo, XkcdError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(XkcdError::NotFound);
        }
        if !status.is_success() {
            return Err(XkcdError::Status(status.as_u16()));
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl ComicSource for XkcdClient {
    async fn get(&self, id: i64) -> Result<XkcdInfo, XkcdError> {
        let url = format!("{}/{}/{}", self.base_url, id, INFO_ENDPOINT);
        debug!(comic_id = id, "fetching comic info");
        self.fetch_info(&url).await
    }

    async fn last_id(&self) -> Result<i64, XkcdError> {
        let url = format!("{}/{}", self.base_url, INFO_ENDPOINT);
        debug!("fetching latest comic info");
        let info = self.fetch_info(&url).await?;
        Ok(info.id)
    }
}

fn normalize_base_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}
