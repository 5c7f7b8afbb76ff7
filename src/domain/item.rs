use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Maximum stored description length before the "..." suffix is applied.
pub const DESCRIPTION_LIMIT: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub feed_id: i64,
    pub title: String,
    pub link: String,
    pub description: String,
    pub published: DateTime<Utc>,
}

impl Item {
    pub fn new(
        feed_id: i64,
        title: String,
        link: String,
        description: String,
        published: DateTime<Utc>,
    ) -> Self {
        let id = Self::fingerprint(feed_id, &link, &title);
        Self {
            id,
            feed_id,
            title,
            link,
            description,
            published,
        }
    }

    /// Deterministic content fingerprint over (feed_id, link, title).
    ///
    /// Doubles as the primary key, so re-syncing the same upstream content
    /// produces the same id and insert-if-absent no-ops. Each variable-length
    /// field is length-prefixed so shifting bytes between link and title
    /// cannot produce the same hash input.
    pub fn fingerprint(feed_id: i64, link: &str, title: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(feed_id.to_le_bytes());
        for field in [link, title] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}
