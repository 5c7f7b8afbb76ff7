//! Test doubles shared by the sync and scheduler tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::app::{FreshetError, Result};
use crate::domain::{Feed, FeedUpdate, Item};
use crate::fetcher::{FetchResult, Fetcher};
use crate::store::{ItemFilter, SqliteStore, Store};

type FetchHook = Box<dyn Fn(&str) + Send + Sync>;

/// Canned-response fetcher. URLs without a body fail like a dead host.
pub struct MockFetcher {
    bodies: HashMap<String, String>,
    always_not_modified: bool,
    fetched: Mutex<Vec<String>>,
    on_fetch: Option<FetchHook>,
}

impl MockFetcher {
    pub fn empty() -> Self {
        Self {
            bodies: HashMap::new(),
            always_not_modified: false,
            fetched: Mutex::new(Vec::new()),
            on_fetch: None,
        }
    }

    pub fn returning(url: &str, body: &str) -> Self {
        let mut fetcher = Self::empty();
        fetcher.bodies.insert(url.to_string(), body.to_string());
        fetcher
    }

    pub fn add(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }

    pub fn not_modified() -> Self {
        let mut fetcher = Self::empty();
        fetcher.always_not_modified = true;
        fetcher
    }

    /// Run a side effect on every fetch; lets tests mutate the store
    /// mid-sweep.
    pub fn with_hook(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_fetch = Some(Box::new(hook));
        self
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(
        &self,
        url: &str,
        _etag: Option<&str>,
        _last_modified: Option<&str>,
    ) -> Result<FetchResult> {
        self.fetched.lock().unwrap().push(url.to_string());
        if let Some(hook) = &self.on_fetch {
            hook(url);
        }

        if self.always_not_modified {
            return Ok(FetchResult::NotModified);
        }

        match self.bodies.get(url) {
            Some(body) => Ok(FetchResult::Content {
                body: body.clone().into_bytes(),
                etag: None,
                last_modified: None,
            }),
            None => Err(FreshetError::Other(format!("connection refused: {url}"))),
        }
    }
}

/// Delegating store that fails `insert_item_if_absent` for one item title,
/// for exercising per-entry fault containment.
pub struct FlakyStore {
    inner: Arc<SqliteStore>,
    fail_title: String,
}

impl FlakyStore {
    pub fn failing_on_title(inner: Arc<SqliteStore>, title: &str) -> Self {
        Self {
            inner,
            fail_title: title.to_string(),
        }
    }
}

impl Store for FlakyStore {
    fn add_feed(&self, url: &str, category: Option<&str>) -> Result<Feed> {
        self.inner.add_feed(url, category)
    }

    fn get_feed(&self, id: i64) -> Result<Option<Feed>> {
        self.inner.get_feed(id)
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        self.inner.get_feed_by_url(url)
    }

    fn list_feeds(&self) -> Result<Vec<Feed>> {
        self.inner.list_feeds()
    }

    fn update_feed(&self, id: i64, update: &FeedUpdate) -> Result<()> {
        self.inner.update_feed(id, update)
    }

    fn set_category(&self, id: i64, category: Option<&str>) -> Result<()> {
        self.inner.set_category(id, category)
    }

    fn delete_feed(&self, id: i64) -> Result<()> {
        self.inner.delete_feed(id)
    }

    fn categories(&self) -> Result<Vec<String>> {
        self.inner.categories()
    }

    fn insert_item_if_absent(&self, item: &Item) -> Result<bool> {
        if item.title == self.fail_title {
            return Err(FreshetError::Other("simulated write failure".into()));
        }
        self.inner.insert_item_if_absent(item)
    }

    fn items_by_feed(&self, feed_id: i64) -> Result<Vec<Item>> {
        self.inner.items_by_feed(feed_id)
    }

    fn recent_items(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        self.inner.recent_items(filter)
    }

    fn count_items(&self, feed_id: i64) -> Result<i64> {
        self.inner.count_items(feed_id)
    }
}
