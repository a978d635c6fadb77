//! Catalog update orchestration.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::catalog::{Comic, ComicCatalog};
use crate::events::{Event, EventPublisher};
use crate::words::Normalizer;
use crate::xkcd::{ComicSource, XkcdError};

use super::types::{ServiceStats, UpdateError, UpdateStatus};

/// Id of the comic that does not exist upstream. It is stored as an empty
/// placeholder so the reconciler counts it as present and never fetches it.
const TOMBSTONE_ID: i64 = 404;

/// Orchestrates catalog synchronization against the upstream source.
///
/// At most one update or drop runs at a time, guarded by an atomic flag;
/// concurrent attempts fail with [`UpdateError::AlreadyInProgress`] instead
/// of queueing.
pub struct UpdateService {
    catalog: Arc<dyn ComicCatalog>,
    source: Arc<dyn ComicSource>,
    words: Arc<dyn Normalizer>,
    publisher: EventPublisher,
    concurrency: usize,
    in_progress: AtomicBool,
}

/// Clears the busy flag when the guarded operation finishes, however it
/// finishes.
struct InProgressGuard<'a>(&'a AtomicBool);

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl UpdateService {
    pub fn new(
        catalog: Arc<dyn ComicCatalog>,
        source: Arc<dyn ComicSource>,
        words: Arc<dyn Normalizer>,
        publisher: EventPublisher,
        concurrency: usize,
    ) -> Result<Self, UpdateError> {
        if concurrency < 1 {
            return Err(UpdateError::Config(format!(
                "wrong concurrency specified: {concurrency}"
            )));
        }
        Ok(Self {
            catalog,
            source,
            words,
            publisher,
            concurrency,
            in_progress: AtomicBool::new(false),
        })
    }

    /// Reconcile the catalog with the upstream source.
    ///
    /// Missing ids are fetched by a pool of workers, normalized and written
    /// in a single batch; per-comic failures are skipped, not fatal. An
    /// `update` event is published only when new comics were written.
    pub async fn update(&self) -> Result<(), UpdateError> {
        let _guard = self.try_begin()?;

        info!("update started");
        let started = Instant::now();

        let existing: HashSet<i64> = self.catalog.ids()?.into_iter().collect();
        debug!(count = existing.len(), "existing comics in catalog");

        let last_id = self.source.last_id().await?;
        debug!(last_id, "last comic id upstream");

        let missing: Vec<i64> = (1..=last_id).filter(|id| !existing.contains(id)).collect();
        if missing.is_empty() {
            debug!("no new comics to add");
            return Ok(());
        }

        let comics = self.fetch_missing(missing).await;
        if comics.is_empty() {
            debug!("no new comics to add");
            return Ok(());
        }

        self.catalog.add(&comics)?;
        debug!(count = comics.len(), "added new comics");

        if let Err(e) = self.publisher.publish(Event::Update).await {
            error!(error = %e, "failed to publish update event");
        }

        info!(duration = ?started.elapsed(), "update finished");
        Ok(())
    }

    /// Remove every comic and zero the stats, then publish a `reset` event.
    pub async fn drop_all(&self) -> Result<(), UpdateError> {
        let _guard = self.try_begin()?;

        self.catalog.drop_all()?;
        info!("catalog dropped");

        if let Err(e) = self.publisher.publish(Event::Reset).await {
            error!(error = %e, "failed to publish reset event");
        }
        Ok(())
    }

    /// `Running` iff an update or drop is in flight. Never blocks.
    pub fn status(&self) -> UpdateStatus {
        if self.in_progress.load(Ordering::SeqCst) {
            UpdateStatus::Running
        } else {
            UpdateStatus::Idle
        }
    }

    /// Catalog statistics plus the upstream's last id. May be called while
    /// an update is running; it does not take the busy flag.
    pub async fn stats(&self) -> Result<ServiceStats, UpdateError> {
        let stats = self.catalog.stats()?;
        let comics_total = self.source.last_id().await?;
        Ok(ServiceStats {
            words_total: stats.words_total,
            words_unique: stats.words_unique,
            comics_fetched: stats.comics_fetched,
            comics_total,
        })
    }

    /// Liveness probe against the backing store.
    pub fn ping(&self) -> Result<(), UpdateError> {
        self.catalog.ping().map_err(Into::into)
    }

    fn try_begin(&self) -> Result<InProgressGuard<'_>, UpdateError> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(UpdateError::AlreadyInProgress);
        }
        Ok(InProgressGuard(&self.in_progress))
    }

    /// Fan the missing ids out to exactly `concurrency` workers and collect
    /// one result per job. Channel capacities match the job count, so the
    /// enumerator never blocks against the workers.
    async fn fetch_missing(&self, missing: Vec<i64>) -> Vec<Comic> {
        let job_count = missing.len();
        let (job_tx, job_rx) = mpsc::channel::<i64>(job_count);
        let (result_tx, mut result_rx) = mpsc::channel::<Option<Comic>>(job_count);
        let job_rx = Arc::new(tokio::sync::Mutex::new(job_rx));

        for id in missing {
            // Capacity equals the job count, so this cannot block.
            if job_tx.send(id).await.is_err() {
                break;
            }
        }
        drop(job_tx);

        for _ in 0..self.concurrency {
            let job_rx = Arc::clone(&job_rx);
            let result_tx = result_tx.clone();
            let source = Arc::clone(&self.source);
            let words = Arc::clone(&self.words);
            tokio::spawn(async move {
                loop {
                    let id = {
                        let mut rx = job_rx.lock().await;
                        match rx.recv().await {
                            Some(id) => id,
                            None => break,
                        }
                    };
                    let produced = produce_comic(source.as_ref(), words.as_ref(), id).await;
                    if result_tx.send(produced).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut comics = Vec::new();
        for _ in 0..job_count {
            match result_rx.recv().await {
                Some(Some(comic)) => comics.push(comic),
                Some(None) => {}
                None => break,
            }
        }
        comics
    }
}

/// Fetch and normalize one comic. Any per-comic failure yields `None`; the
/// batch carries on without it.
async fn produce_comic(
    source: &dyn ComicSource,
    words: &dyn Normalizer,
    id: i64,
) -> Option<Comic> {
    if id == TOMBSTONE_ID {
        return Some(Comic {
            id,
            url: String::new(),
            words: Vec::new(),
        });
    }

    let info = match source.get(id).await {
        Ok(info) => info,
        Err(XkcdError::NotFound) => {
            debug!(comic_id = id, "comic not found upstream");
            return None;
        }
        Err(e) => {
            error!(comic_id = id, error = %e, "failed to fetch comic");
            return None;
        }
    };

    match words.norm(&info.description()) {
        Ok(keywords) => Some(Comic {
            id: info.id,
            url: info.url,
            words: keywords,
        }),
        Err(e) => {
            error!(comic_id = id, error = %e, "failed to normalize comic description");
            None
        }
    }
}
