//! # Freshet
//!
//! A periodic feed-aggregation service: subscribed RSS/Atom sources are
//! polled on a fixed interval, parsed into canonical items, deduplicated by
//! content fingerprint, and persisted in SQLite.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler → SyncEngine → Fetcher → Parser → Normalizer → Store
//! ```
//!
//! - [`scheduler`]: perpetual sweep loop with inter-feed spacing
//! - [`sync`]: per-feed fetch + parse + merge with contained faults
//! - [`fetcher`]: HTTP client with conditional requests and bounded timeouts
//! - [`parser`]: source parser adapter over feed-rs
//! - [`normalizer`]: fallback and truncation rules for raw entries
//! - [`store`]: SQLite persistence with insert-if-absent semantics
//!
//! ## Quick Start
//!
//! ```bash
//! # Subscribe and sync immediately
//! freshet add https://blog.rust-lang.org/feed.xml --category Technology
//!
//! # One sweep over all feeds
//! freshet sync
//!
//! # Run the polling service (60 s sweeps, 1 s between feeds)
//! freshet serve
//!
//! # Recent items, most recent first, capped at 50
//! freshet items --category Technology
//! ```

/// Application context and error handling.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/freshet/config.toml`.
pub mod config;

/// Core domain models ([`Feed`](domain::Feed), [`Item`](domain::Item)).
pub mod domain;

/// HTTP fetching with conditional request support.
pub mod fetcher;

/// Raw-entry normalization: fallbacks and description truncation.
pub mod normalizer;

/// Source parser adapter over feed-rs.
pub mod parser;

/// Sweep scheduling.
pub mod scheduler;

/// SQLite persistence layer.
pub mod store;

/// Per-feed synchronization.
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;
