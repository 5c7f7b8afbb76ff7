//! Turns a [`RawEntry`](crate::parser::RawEntry) into a canonical
//! [`Item`](crate::domain::Item), applying the defaulting and truncation
//! rules.

use chrono::{DateTime, Utc};

use crate::domain::item::DESCRIPTION_LIMIT;
use crate::domain::Item;
use crate::parser::RawEntry;

const TITLE_FALLBACK: &str = "No title";
const ELLIPSIS: &str = "...";

/// Normalize one raw entry.
///
/// `now` is captured once per sync run, so every entry that lacks both a
/// published and an updated timestamp gets the same fallback within a run.
pub fn normalize(feed_id: i64, raw: RawEntry, now: DateTime<Utc>) -> Item {
    // An empty upstream title is treated as absent, same as a missing one.
    let title = raw
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| TITLE_FALLBACK.to_string());
    let link = raw.link.unwrap_or_default();
    let description = truncate(raw.description.or(raw.summary).unwrap_or_default());
    let published = raw.published.or(raw.updated).unwrap_or(now);

    Item::new(feed_id, title, link, description, published)
}

fn truncate(s: String) -> String {
    if s.chars().count() <= DESCRIPTION_LIMIT {
        return s;
    }
    let mut out: String = s.chars().take(DESCRIPTION_LIMIT).collect();
    out.push_str(ELLIPSIS);
    out
}
