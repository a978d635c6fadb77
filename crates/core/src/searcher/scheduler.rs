//! Periodic index rebuild scheduler.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::service::SearchService;
use super::types::SearchError;

/// Rebuilds the search index once at startup and then on a fixed interval
/// until shutdown.
pub struct IndexScheduler {
    searcher: Arc<SearchService>,
    interval: Duration,
}

impl IndexScheduler {
    pub fn new(searcher: Arc<SearchService>, interval: Duration) -> Self {
        Self { searcher, interval }
    }

    /// Run the initial rebuild synchronously, then spawn the interval loop.
    ///
    /// A failure of the initial rebuild is returned to the caller; failures
    /// inside the loop are logged and the previous index stays in use.
    pub async fn start(
        &self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<JoinHandle<()>, SearchError> {
        info!("starting index scheduler");
        self.searcher.update_index().await?;

        let searcher = Arc::clone(&self.searcher);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // the first tick fires immediately; the startup rebuild covered it
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        info!("index scheduler stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = searcher.update_index().await {
                            error!(error = %e, "failed to update index");
                        }
                    }
                }
            }
        });

        Ok(handle)
    }
}
