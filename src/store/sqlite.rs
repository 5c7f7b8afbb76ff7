use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{FreshetError, Result};
use crate::domain::{Feed, FeedUpdate, Item};
use crate::store::{ItemFilter, Store, DEFAULT_ITEM_LIMIT};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| FreshetError::Other(format!("Migration failed: {e}")))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FreshetError::Other(format!("Store lock poisoned: {e}")))
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<Feed> {
        Ok(Feed {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            category: row.get(3)?,
            etag: row.get(4)?,
            last_modified: row.get(5)?,
            last_updated: row
                .get::<_, Option<String>>(6)?
                .and_then(|s| Self::parse_datetime(&s)),
            created_at: row
                .get::<_, String>(7)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }

    fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
        Ok(Item {
            id: row.get(0)?,
            feed_id: row.get(1)?,
            title: row.get(2)?,
            link: row.get(3)?,
            description: row.get(4)?,
            published: row
                .get::<_, String>(5)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }

    fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == ErrorCode::ConstraintViolation
        )
    }
}

const FEED_COLUMNS: &str =
    "id, url, title, category, etag, last_modified, last_updated, created_at";
const ITEM_COLUMNS: &str = "id, feed_id, title, link, description, published";

impl Store for SqliteStore {
    fn add_feed(&self, url: &str, category: Option<&str>) -> Result<Feed> {
        let conn = self.lock()?;

        let created_at = Utc::now();
        let result = conn.execute(
            "INSERT INTO feeds (url, category, created_at) VALUES (?1, ?2, ?3)",
            params![url, category, created_at.to_rfc3339()],
        );

        match result {
            Ok(_) => {
                let mut feed = Feed::new(url.to_string());
                feed.id = conn.last_insert_rowid();
                feed.category = category.map(String::from);
                feed.created_at = created_at;
                Ok(feed)
            }
            Err(e) if Self::is_unique_violation(&e) => {
                Err(FreshetError::DuplicateFeed(url.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get_feed(&self, id: i64) -> Result<Option<Feed>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = ?1"),
                params![id],
                Self::feed_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let conn = self.lock()?;

        let result = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?1"),
                params![url],
                Self::feed_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn list_feeds(&self) -> Result<Vec<Feed>> {
        let conn = self.lock()?;

        let mut stmt =
            conn.prepare(&format!("SELECT {FEED_COLUMNS} FROM feeds ORDER BY id"))?;

        let feeds = stmt
            .query_map([], Self::feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn update_feed(&self, id: i64, update: &FeedUpdate) -> Result<()> {
        let conn = self.lock()?;

        if let Some(ref title) = update.title {
            conn.execute(
                "UPDATE feeds SET title = ?1 WHERE id = ?2",
                params![title, id],
            )?;
        }
        if let Some(ref category) = update.category {
            conn.execute(
                "UPDATE feeds SET category = ?1 WHERE id = ?2",
                params![category, id],
            )?;
        }
        if let Some(ref etag) = update.etag {
            conn.execute("UPDATE feeds SET etag = ?1 WHERE id = ?2", params![etag, id])?;
        }
        if let Some(ref last_modified) = update.last_modified {
            conn.execute(
                "UPDATE feeds SET last_modified = ?1 WHERE id = ?2",
                params![last_modified, id],
            )?;
        }
        if let Some(ref last_updated) = update.last_updated {
            conn.execute(
                "UPDATE feeds SET last_updated = ?1 WHERE id = ?2",
                params![last_updated.to_rfc3339(), id],
            )?;
        }

        Ok(())
    }

    fn set_category(&self, id: i64, category: Option<&str>) -> Result<()> {
        let conn = self.lock()?;

        let changed = conn.execute(
            "UPDATE feeds SET category = ?1 WHERE id = ?2",
            params![category, id],
        )?;

        if changed == 0 {
            return Err(FreshetError::FeedNotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete_feed(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;

        // Items go with the feed via ON DELETE CASCADE.
        let changed = conn.execute("DELETE FROM feeds WHERE id = ?1", params![id])?;

        if changed == 0 {
            return Err(FreshetError::FeedNotFound(id.to_string()));
        }
        Ok(())
    }

    fn categories(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT DISTINCT category FROM feeds
             WHERE category IS NOT NULL ORDER BY category",
        )?;

        let categories = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    fn insert_item_if_absent(&self, item: &Item) -> Result<bool> {
        let conn = self.lock()?;

        let inserted = conn.execute(
            &format!("INSERT OR IGNORE INTO items ({ITEM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            params![
                item.id,
                item.feed_id,
                item.title,
                item.link,
                item.description,
                item.published.to_rfc3339()
            ],
        )?;

        Ok(inserted > 0)
    }

    fn items_by_feed(&self, feed_id: i64) -> Result<Vec<Item>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE feed_id = ?1 ORDER BY published DESC"
        ))?;

        let items = stmt
            .query_map(params![feed_id], Self::item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(items)
    }

    fn recent_items(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        let conn = self.lock()?;

        let mut sql = String::from(
            "SELECT i.id, i.feed_id, i.title, i.link, i.description, i.published
             FROM items i JOIN feeds f ON i.feed_id = f.id WHERE 1=1",
        );
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if !filter.feed_ids.is_empty() {
            let placeholders = vec!["?"; filter.feed_ids.len()].join(",");
            sql.push_str(&format!(" AND i.feed_id IN ({placeholders})"));
            for id in &filter.feed_ids {
                values.push(Box::new(*id));
            }
        }

        if !filter.categories.is_empty() {
            let placeholders = vec!["?"; filter.categories.len()].join(",");
            sql.push_str(&format!(" AND f.category IN ({placeholders})"));
            for category in &filter.categories {
                values.push(Box::new(category.clone()));
            }
        }

        let limit = filter.limit.unwrap_or(DEFAULT_ITEM_LIMIT);
        sql.push_str(" ORDER BY i.published DESC LIMIT ?");
        values.push(Box::new(limit as i64));

        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();

        let items = stmt
            .query_map(&params[..], Self::item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(items)
    }

    fn count_items(&self, feed_id: i64) -> Result<i64> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM items WHERE feed_id = ?1",
            params![feed_id],
            |row| row.get(0),
        )?;

        Ok(count)
    }
}
