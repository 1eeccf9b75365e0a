//! In-memory stand-ins for the feed and the renderer, shared by the
//! pipeline tests.

use crate::api::{FetchError, FetchPage};
use crate::models::{FeedItem, RawFeedItem};
use crate::outputs::{PersistError, Renderer};
use chrono::{Local, NaiveDate, TimeZone};
use rand::Rng;
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Build an item published at local noon on `date`.
pub fn item(id: i64, favorites_count: u32, comments_count: u32, date: NaiveDate) -> FeedItem {
    let noon = Local
        .from_local_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
        .single()
        .unwrap();
    FeedItem::from(RawFeedItem {
        id,
        title: format!("News {id}"),
        favorites_count,
        comments_count,
        publication_date: noon.timestamp(),
        ..Default::default()
    })
}

/// A feed that serves `items_per_page` items for every page.
///
/// Item ids are `page * 1000 + index`, so the originating page of any item
/// is `id / 1000`.
#[derive(Debug, Default)]
pub struct StubFeed {
    items_per_page: usize,
    failing: HashSet<u32>,
    empty: HashSet<u32>,
    latency: Option<Duration>,
    requested: Mutex<Vec<u32>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl StubFeed {
    pub fn new(items_per_page: usize) -> Self {
        Self {
            items_per_page,
            ..Default::default()
        }
    }

    pub fn failing_on(mut self, pages: impl IntoIterator<Item = u32>) -> Self {
        self.failing.extend(pages);
        self
    }

    pub fn empty_on(mut self, pages: impl IntoIterator<Item = u32>) -> Self {
        self.empty.extend(pages);
        self
    }

    /// Sleep roughly `latency` (plus up to 5ms of jitter) inside each fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn page_of(item: &FeedItem) -> u32 {
        (item.id() / 1000) as u32
    }

    /// Pages requested so far, in request order.
    pub fn requested_pages(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }

    /// Highest number of fetches running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl FetchPage for StubFeed {
    async fn fetch_page(&self, page: u32, _page_size: u32) -> Result<Vec<FeedItem>, FetchError> {
        self.requested.lock().unwrap().push(page);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            let jitter = Duration::from_millis(rand::rng().random_range(0..=5));
            tokio::time::sleep(latency + jitter).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&page) {
            return Err(FetchError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body_preview: format!("page {page} unavailable"),
            });
        }
        if self.empty.contains(&page) {
            return Ok(Vec::new());
        }

        let published = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        Ok((0..self.items_per_page)
            .map(|i| item(i64::from(page) * 1000 + i as i64, i as u32, 0, published))
            .collect())
    }
}

/// A renderer that keeps persisted collections in memory.
#[derive(Debug, Default)]
pub struct MemoryRenderer {
    stored: Mutex<HashMap<String, Vec<FeedItem>>>,
}

impl MemoryRenderer {
    /// Mark `destination` as already populated (with no items).
    pub fn with_existing(self, destination: &str) -> Self {
        self.stored
            .lock()
            .unwrap()
            .insert(destination.to_string(), Vec::new());
        self
    }

    pub fn stored(&self, destination: &str) -> Option<Vec<FeedItem>> {
        self.stored.lock().unwrap().get(destination).cloned()
    }
}

impl Renderer for MemoryRenderer {
    async fn persist(&self, destination: &str, items: &[FeedItem]) -> Result<PathBuf, PersistError> {
        let mut stored = self.stored.lock().unwrap();
        if stored.contains_key(destination) {
            return Err(PersistError::DestinationExists(PathBuf::from(destination)));
        }
        stored.insert(destination.to_string(), items.to_vec());
        Ok(PathBuf::from(destination))
    }
}
