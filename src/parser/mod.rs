//! Source parser adapter.
//!
//! Wraps feed-rs behind a concrete [`Document`]/[`RawEntry`] shape with
//! explicit optional fields, so the rest of the crate never sees the
//! library's own types. Malformed input comes back as
//! [`FreshetError::FeedParse`], never a panic.

use chrono::{DateTime, Utc};
use feed_rs::parser;
use html_escape::decode_html_entities;

use crate::app::{FreshetError, Result};

/// Feed-level metadata plus the raw entries of one parsed document.
#[derive(Debug, Clone)]
pub struct Document {
    pub title: Option<String>,
    pub entries: Vec<RawEntry>,
}

/// One upstream entry before normalization. Everything is optional;
/// the normalizer applies the fallback rules.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

/// Parse raw feed bytes into a [`Document`].
pub fn parse(body: &[u8]) -> Result<Document> {
    let feed = parser::parse(body).map_err(|e| FreshetError::FeedParse(e.to_string()))?;

    let title = feed
        .title
        .map(|t| decode_html_entities(&t.content).to_string());

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| RawEntry {
            title: entry
                .title
                .map(|t| decode_html_entities(&t.content).to_string()),
            link: entry.links.first().map(|l| l.href.clone()),
            // feed-rs maps RSS <description> / Atom <summary> to `summary`
            // and content:encoded / Atom <content> to `content`.
            description: entry
                .summary
                .map(|s| decode_html_entities(&s.content).to_string()),
            summary: entry
                .content
                .and_then(|c| c.body)
                .map(|b| decode_html_entities(&b).to_string()),
            published: entry.published.map(|dt| dt.with_timezone(&Utc)),
            updated: entry.updated.map(|dt| dt.with_timezone(&Utc)),
        })
        .collect();

    Ok(Document { title, entries })
}
