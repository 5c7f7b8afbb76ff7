//! Per-feed synchronization: fetch, parse, normalize, merge.
//!
//! [`SyncEngine::sync_feed`] contains every per-feed and per-entry fault and
//! reports plain success/failure; nothing it does can take down the
//! scheduler loop or a request-triggered caller.

use std::sync::Arc;

use chrono::Utc;
use url::Url;

use crate::app::{FreshetError, Result};
use crate::domain::{Feed, FeedUpdate};
use crate::fetcher::{FetchResult, Fetcher};
use crate::normalizer::normalize;
use crate::parser;
use crate::store::Store;

pub struct SyncEngine {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    store: Arc<dyn Store + Send + Sync>,
}

impl SyncEngine {
    pub fn new(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        store: Arc<dyn Store + Send + Sync>,
    ) -> Self {
        Self { fetcher, store }
    }

    /// Sync one feed. Returns true when the run finished; a fetch, parse, or
    /// metadata-update fault is logged and reported as false, leaving the
    /// next sweep to retry.
    pub async fn sync_feed(&self, feed: &Feed) -> bool {
        tracing::debug!(url = %feed.url, "Syncing feed");

        match self.try_sync(feed).await {
            Ok(new_items) => {
                if new_items > 0 {
                    tracing::info!(url = %feed.url, new_items, "Feed synced");
                } else {
                    tracing::debug!(url = %feed.url, "Feed synced, nothing new");
                }
                true
            }
            Err(e) => {
                tracing::warn!(url = %feed.url, error = %e, "Feed sync failed");
                false
            }
        }
    }

    async fn try_sync(&self, feed: &Feed) -> Result<usize> {
        let fetched = self
            .fetcher
            .fetch(
                &feed.url,
                feed.etag.as_deref(),
                feed.last_modified.as_deref(),
            )
            .await?;

        match fetched {
            FetchResult::NotModified => {
                let update = FeedUpdate {
                    last_updated: Some(Utc::now()),
                    ..Default::default()
                };
                self.store.update_feed(feed.id, &update)?;
                Ok(0)
            }
            FetchResult::Content {
                body,
                etag,
                last_modified,
            } => {
                let document = parser::parse(&body)?;
                self.merge(feed.id, &feed.url, document, etag, last_modified)
            }
        }
    }

    /// Update feed metadata, then insert entries. The metadata update lands
    /// even when individual entry inserts fail; insert-if-absent makes the
    /// next sweep's retry idempotent.
    fn merge(
        &self,
        feed_id: i64,
        feed_url: &str,
        document: parser::Document,
        etag: Option<String>,
        last_modified: Option<String>,
    ) -> Result<usize> {
        let update = FeedUpdate {
            title: Some(document.title.unwrap_or_else(|| feed_url.to_string())),
            etag,
            last_modified,
            last_updated: Some(Utc::now()),
            ..Default::default()
        };
        self.store.update_feed(feed_id, &update)?;

        let now = Utc::now();
        let mut new_items = 0;

        for raw in document.entries {
            let item = normalize(feed_id, raw, now);
            match self.store.insert_item_if_absent(&item) {
                Ok(true) => new_items += 1,
                Ok(false) => {}
                Err(e) => {
                    // One bad entry does not abort the rest of the merge.
                    tracing::warn!(url = %feed_url, link = %item.link, error = %e,
                        "Skipping entry");
                }
            }
        }

        Ok(new_items)
    }

    /// Add a feed and sync it immediately.
    ///
    /// The URL is fetched and parsed before any row is written, so a
    /// malformed source is rejected with [`FreshetError::FeedParse`] and a
    /// URL already present with [`FreshetError::DuplicateFeed`].
    pub async fn add_feed(&self, url: &str, category: Option<&str>) -> Result<Feed> {
        Url::parse(url)?;

        if self.store.get_feed_by_url(url)?.is_some() {
            return Err(FreshetError::DuplicateFeed(url.to_string()));
        }

        let fetched = self.fetcher.fetch(url, None, None).await?;

        let document = match &fetched {
            FetchResult::Content { body, .. } => Some(parser::parse(body)?),
            FetchResult::NotModified => None,
        };

        let feed = self.store.add_feed(url, category)?;

        if let (
            Some(document),
            FetchResult::Content {
                etag,
                last_modified,
                ..
            },
        ) = (document, fetched)
        {
            self.merge(feed.id, url, document, etag, last_modified)?;
        }

        // Return the stored row with title and last_updated filled in.
        self.store
            .get_feed(feed.id)?
            .ok_or_else(|| FreshetError::FeedNotFound(url.to_string()))
    }

    /// Sync one feed on demand, by URL.
    pub async fn refresh_feed(&self, url: &str) -> Result<bool> {
        let feed = self
            .store
            .get_feed_by_url(url)?
            .ok_or_else(|| FreshetError::FeedNotFound(url.to_string()))?;

        Ok(self.sync_feed(&feed).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ItemFilter, SqliteStore, Store};
    use crate::testing::{FlakyStore, MockFetcher};

    const FEED_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Feed</title>
    <item>
      <title>Hello</title>
      <link>http://x/1</link>
      <description>First post</description>
    </item>
  </channel>
</rss>"#;

    const THREE_ENTRY_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Three</title>
    <item><title>entry-1</title><link>http://t/1</link></item>
    <item><title>entry-2</title><link>http://t/2</link></item>
    <item><title>entry-3</title><link>http://t/3</link></item>
  </channel>
</rss>"#;

    fn engine_with(
        fetcher: MockFetcher,
    ) -> (SyncEngine, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let engine = SyncEngine::new(Arc::new(fetcher), store.clone());
        (engine, store)
    }

    #[tokio::test]
    async fn test_add_feed_and_immediate_sync() {
        let fetcher = MockFetcher::returning("https://example.com/feed.xml", FEED_XML);
        let (engine, store) = engine_with(fetcher);

        let feed = engine
            .add_feed("https://example.com/feed.xml", None)
            .await
            .unwrap();

        assert_eq!(feed.title, Some("Example Feed".into()));
        assert!(feed.last_updated.is_some());

        assert_eq!(store.list_feeds().unwrap().len(), 1);
        let items = store.items_by_feed(feed.id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Hello");
        assert_eq!(items[0].link, "http://x/1");
    }

    #[tokio::test]
    async fn test_add_malformed_feed_rejected_without_row() {
        let fetcher = MockFetcher::returning("https://bad.example/feed", "<html>nope</html>");
        let (engine, store) = engine_with(fetcher);

        let err = engine
            .add_feed("https://bad.example/feed", None)
            .await
            .unwrap_err();

        assert!(matches!(err, FreshetError::FeedParse(_)));
        assert!(store.list_feeds().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_duplicate_feed_rejected() {
        let fetcher = MockFetcher::returning("https://example.com/feed.xml", FEED_XML);
        let (engine, _store) = engine_with(fetcher);

        engine
            .add_feed("https://example.com/feed.xml", None)
            .await
            .unwrap();
        let err = engine
            .add_feed("https://example.com/feed.xml", None)
            .await
            .unwrap_err();

        assert!(matches!(err, FreshetError::DuplicateFeed(_)));
    }

    #[tokio::test]
    async fn test_add_invalid_url_rejected() {
        let fetcher = MockFetcher::empty();
        let (engine, store) = engine_with(fetcher);

        let err = engine.add_feed("not a url", None).await.unwrap_err();
        assert!(matches!(err, FreshetError::InvalidUrl(_)));
        assert!(store.list_feeds().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let fetcher = MockFetcher::returning("https://example.com/feed.xml", FEED_XML);
        let (engine, store) = engine_with(fetcher);

        let feed = engine
            .add_feed("https://example.com/feed.xml", None)
            .await
            .unwrap();

        assert!(engine.sync_feed(&feed).await);
        assert!(engine.sync_feed(&feed).await);

        assert_eq!(store.items_by_feed(feed.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_malformed_leaves_store_untouched() {
        let fetcher = MockFetcher::returning("https://example.com/feed.xml", FEED_XML);
        let (engine, store) = engine_with(fetcher);

        let feed = engine
            .add_feed("https://example.com/feed.xml", None)
            .await
            .unwrap();
        let before = store.get_feed(feed.id).unwrap().unwrap();

        let broken = MockFetcher::returning("https://example.com/feed.xml", "garbage");
        let engine = SyncEngine::new(Arc::new(broken), store.clone());

        assert!(!engine.sync_feed(&feed).await);

        let after = store.get_feed(feed.id).unwrap().unwrap();
        assert_eq!(
            before.last_updated.map(|d| d.timestamp()),
            after.last_updated.map(|d| d.timestamp())
        );
        assert_eq!(store.items_by_feed(feed.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_fetch_error_returns_false() {
        let fetcher = MockFetcher::empty();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let feed = store.add_feed("https://down.example/feed", None).unwrap();
        let engine = SyncEngine::new(Arc::new(fetcher), store.clone());

        assert!(!engine.sync_feed(&feed).await);
        assert!(store
            .get_feed(feed.id)
            .unwrap()
            .unwrap()
            .last_updated
            .is_none());
    }

    #[tokio::test]
    async fn test_partial_entry_failure_keeps_rest() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let feed = store.add_feed("https://t.example/feed", None).unwrap();

        let flaky = Arc::new(FlakyStore::failing_on_title(store.clone(), "entry-2"));
        let fetcher = MockFetcher::returning("https://t.example/feed", THREE_ENTRY_XML);
        let engine = SyncEngine::new(Arc::new(fetcher), flaky);

        assert!(engine.sync_feed(&feed).await);

        let titles: Vec<_> = store
            .items_by_feed(feed.id)
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert!(titles.contains(&"entry-1".to_string()));
        assert!(titles.contains(&"entry-3".to_string()));
        assert!(!titles.contains(&"entry-2".to_string()));

        let feed = store.get_feed(feed.id).unwrap().unwrap();
        assert!(feed.last_updated.is_some());
        assert_eq!(feed.title, Some("Three".into()));
    }

    #[tokio::test]
    async fn test_not_modified_touches_last_updated_only() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let feed = store.add_feed("https://example.com/feed.xml", None).unwrap();
        let engine = SyncEngine::new(Arc::new(MockFetcher::not_modified()), store.clone());

        assert!(engine.sync_feed(&feed).await);

        let feed = store.get_feed(feed.id).unwrap().unwrap();
        assert!(feed.last_updated.is_some());
        assert!(store.items_by_feed(feed.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_title_falls_back_to_url() {
        const UNTITLED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item><title>Only</title><link>http://u/1</link></item>
</channel></rss>"#;

        let fetcher = MockFetcher::returning("https://untitled.example/feed", UNTITLED);
        let (engine, _) = engine_with(fetcher);

        let feed = engine
            .add_feed("https://untitled.example/feed", None)
            .await
            .unwrap();
        assert_eq!(feed.title, Some("https://untitled.example/feed".into()));
    }

    #[tokio::test]
    async fn test_refresh_feed_by_url() {
        let fetcher = MockFetcher::returning("https://example.com/feed.xml", FEED_XML);
        let (engine, _) = engine_with(fetcher);

        engine
            .add_feed("https://example.com/feed.xml", None)
            .await
            .unwrap();

        assert!(engine
            .refresh_feed("https://example.com/feed.xml")
            .await
            .unwrap());
        let err = engine.refresh_feed("https://nope.example/").await.unwrap_err();
        assert!(matches!(err, FreshetError::FeedNotFound(_)));
    }

    #[tokio::test]
    async fn test_items_listing_after_sync() {
        let fetcher = MockFetcher::returning("https://t.example/feed", THREE_ENTRY_XML);
        let (engine, store) = engine_with(fetcher);

        engine
            .add_feed("https://t.example/feed", Some("Technology"))
            .await
            .unwrap();

        let filter = ItemFilter {
            categories: vec!["Technology".into()],
            ..Default::default()
        };
        assert_eq!(store.recent_items(&filter).unwrap().len(), 3);
    }
}
