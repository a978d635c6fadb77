//! Mock upstream comic source with controllable responses.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::xkcd::{ComicSource, XkcdError, XkcdInfo};

/// Build an upstream info fixture with sensible defaults.
pub fn comic_info(id: i64, title: &str, transcript: &str) -> XkcdInfo {
    XkcdInfo {
        id,
        url: format!("https://imgs.example.org/comics/{id}.png"),
        safe_title: title.to_string(),
        title: title.to_string(),
        alt: String::new(),
        transcript: transcript.to_string(),
    }
}

/// In-memory [`ComicSource`] for tests.
///
/// Known comics resolve, ids in the failure set return a server error, and
/// everything else is a 404. All calls to `get` are recorded.
pub struct MockComicSource {
    last_id: Mutex<Option<i64>>,
    comics: Mutex<HashMap<i64, XkcdInfo>>,
    failing: Mutex<HashSet<i64>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<i64>>,
}

impl MockComicSource {
    /// A source whose latest comic has the given id.
    pub fn new(last_id: i64) -> Self {
        Self {
            last_id: Mutex::new(Some(last_id)),
            comics: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            delay: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A source that cannot even report its latest comic.
    pub fn unavailable() -> Self {
        let source = Self::new(0);
        source.set_unavailable();
        source
    }

    /// Register a comic the source knows about.
    pub fn insert(&self, info: XkcdInfo) {
        self.comics.lock().unwrap().insert(info.id, info);
    }

    /// Make fetches of the given id fail with a server error.
    pub fn fail(&self, id: i64) {
        self.failing.lock().unwrap().insert(id);
    }

    /// Stop answering `last_id` from now on.
    pub fn set_unavailable(&self) {
        *self.last_id.lock().unwrap() = None;
    }

    /// Delay every call by the given duration.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Ids passed to `get`, in call order.
    pub fn calls(&self) -> Vec<i64> {
        self.calls.lock().unwrap().clone()
    }

    async fn maybe_delay(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ComicSource for MockComicSource {
    async fn get(&self, id: i64) -> Result<XkcdInfo, XkcdError> {
        self.calls.lock().unwrap().push(id);
        self.maybe_delay().await;

        if self.failing.lock().unwrap().contains(&id) {
            return Err(XkcdError::Status(500));
        }
        match self.comics.lock().unwrap().get(&id) {
            Some(info) => Ok(info.clone()),
            None => Err(XkcdError::NotFound),
        }
    }

    async fn last_id(&self) -> Result<i64, XkcdError> {
        self.maybe_delay().await;
        let last_id = *self.last_id.lock().unwrap();
        last_id.ok_or(XkcdError::NotFound)
    }
}
