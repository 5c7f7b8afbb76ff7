pub mod sqlite;

use crate::app::Result;
use crate::domain::{Feed, FeedUpdate, Item};

pub use sqlite::SqliteStore;

/// Filter for the recent-items listing. Empty vecs mean "no filter".
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub feed_ids: Vec<i64>,
    pub categories: Vec<String>,
    pub limit: Option<usize>,
}

/// Default cap on the recent-items listing.
pub const DEFAULT_ITEM_LIMIT: usize = 50;

pub trait Store {
    // Feed operations
    fn add_feed(&self, url: &str, category: Option<&str>) -> Result<Feed>;
    fn get_feed(&self, id: i64) -> Result<Option<Feed>>;
    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>>;
    fn list_feeds(&self) -> Result<Vec<Feed>>;
    fn update_feed(&self, id: i64, update: &FeedUpdate) -> Result<()>;
    fn set_category(&self, id: i64, category: Option<&str>) -> Result<()>;
    fn delete_feed(&self, id: i64) -> Result<()>;
    fn categories(&self) -> Result<Vec<String>>;

    // Item operations
    fn insert_item_if_absent(&self, item: &Item) -> Result<bool>;
    fn items_by_feed(&self, feed_id: i64) -> Result<Vec<Item>>;
    fn recent_items(&self, filter: &ItemFilter) -> Result<Vec<Item>>;
    fn count_items(&self, feed_id: i64) -> Result<i64>;
}
