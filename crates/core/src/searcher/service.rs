//! Search service with a shared in-memory inverted index.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::catalog::{ComicCatalog, ComicRef};
use crate::events::{Event, EventHandler};
use crate::words::Normalizer;

use super::types::SearchError;

/// A scanned comic with its match rank.
struct ComicRank {
    comic: ComicRef,
    matched: i64,
    total: i64,
}

/// Serves ranked search over the catalog and maintains the inverted index.
///
/// The index maps keyword -> posting list of comic ids and is only ever
/// mutated under the writer lock; readers see either the old or the new
/// index atomically at the lock boundary.
pub struct SearchService {
    catalog: Arc<dyn ComicCatalog>,
    words: Arc<dyn Normalizer>,
    index: RwLock<HashMap<String, Vec<i64>>>,
}

impl SearchService {
    pub fn new(catalog: Arc<dyn ComicCatalog>, words: Arc<dyn Normalizer>) -> Self {
        Self {
            catalog,
            words,
            index: RwLock::new(HashMap::new()),
        }
    }

    /// Full-scan ranked search.
    ///
    /// Reads the whole catalog and ranks every comic by the number of
    /// distinct phrase keywords it contains, breaking ties by the
    /// matched-to-total ratio (compared cross-multiplied, no floats).
    /// Does not touch the index.
    pub fn search(&self, phrase: &str, limit: i64) -> Result<Vec<ComicRef>, SearchError> {
        if phrase.is_empty() || limit <= 0 {
            return Err(SearchError::BadArguments);
        }

        debug!("search started");
        let started = Instant::now();

        let keywords = self.words.norm(phrase)?;
        let phrase_set: HashSet<&str> = keywords.iter().map(String::as_str).collect();

        let comics = self.catalog.all_comics()?;

        let mut ranks: Vec<ComicRank> = Vec::new();
        for comic in comics {
            let matched = comic
                .words
                .iter()
                .filter(|w| phrase_set.contains(w.as_str()))
                .count() as i64;
            if matched == 0 {
                continue;
            }
            ranks.push(ComicRank {
                total: comic.words.len() as i64,
                comic: ComicRef {
                    id: comic.id,
                    url: comic.url,
                },
                matched,
            });
        }

        ranks.sort_by(|a, b| {
            b.matched
                .cmp(&a.matched)
                .then_with(|| (b.matched * a.total).cmp(&(a.matched * b.total)))
        });
        ranks.truncate(limit as usize);

        debug!(
            returned = ranks.len(),
            duration = ?started.elapsed(),
            "search finished"
        );
        Ok(ranks.into_iter().map(|r| r.comic).collect())
    }

    /// Indexed ranked search.
    ///
    /// Walks the posting lists of the phrase keywords under the reader
    /// lock, accumulating one point per keyword occurrence, then loads the
    /// matched rows and sorts by score. Ids removed from the catalog after
    /// the index snapshot are silently absent.
    pub async fn isearch(&self, phrase: &str, limit: i64) -> Result<Vec<ComicRef>, SearchError> {
        if phrase.is_empty() || limit <= 0 {
            return Err(SearchError::BadArguments);
        }

        debug!("isearch started");
        let started = Instant::now();

        let keywords = self.words.norm(phrase)?;

        let mut scores: HashMap<i64, i64> = HashMap::new();
        let mut order: Vec<i64> = Vec::new();
        {
            let index = self.index.read().await;
            for keyword in &keywords {
                let Some(posting) = index.get(keyword) else {
                    continue;
                };
                for &id in posting {
                    match scores.entry(id) {
                        Entry::Occupied(mut entry) => *entry.get_mut() += 1,
                        Entry::Vacant(entry) => {
                            entry.insert(1);
                            order.push(id);
                        }
                    }
                }
                debug!(keyword = %keyword, count = posting.len(), "matched posting list");
            }
        }

        let mut comics = self.catalog.comics_by_ids(&order)?;
        // Stable sort: equal scores keep their first-seen order.
        comics.sort_by(|a, b| {
            let score_a = scores.get(&a.id).copied().unwrap_or(0);
            let score_b = scores.get(&b.id).copied().unwrap_or(0);
            score_b.cmp(&score_a)
        });
        comics.truncate(limit as usize);

        debug!(
            returned = comics.len(),
            duration = ?started.elapsed(),
            "isearch finished"
        );
        Ok(comics)
    }

    /// Rebuild the index from the catalog under the writer lock.
    ///
    /// The catalog is read before the old index is cleared, so a failed
    /// read leaves the previous index usable.
    pub async fn update_index(&self) -> Result<(), SearchError> {
        let mut index = self.index.write().await;

        info!("index update started");
        let started = Instant::now();

        let comics = self.catalog.all_comics()?;

        index.clear();
        for comic in comics {
            let mut seen: HashSet<&str> = HashSet::new();
            for word in &comic.words {
                if seen.insert(word) {
                    index.entry(word.clone()).or_default().push(comic.id);
                }
            }
        }

        info!(
            keywords = index.len(),
            duration = ?started.elapsed(),
            "index update finished"
        );
        Ok(())
    }

    /// Clear the index under the writer lock.
    pub async fn reset_index(&self) {
        let mut index = self.index.write().await;
        index.clear();
        info!("index has been reset");
    }

    /// Liveness probe against the backing store.
    pub fn ping(&self) -> Result<(), SearchError> {
        self.catalog.ping().map_err(Into::into)
    }
}

#[async_trait]
impl EventHandler for SearchService {
    type Error = SearchError;

    async fn handle_event(&self, event: Event) -> Result<(), SearchError> {
        match event {
            Event::Update => self.update_index().await,
            Event::Reset => {
                self.reset_index().await;
                Ok(())
            }
        }
    }
}
