pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "freshet")]
#[command(about = "A periodic feed-aggregation service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a feed and sync it immediately
    Add {
        /// URL of the feed to add
        url: String,
        /// Category to file the feed under
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Remove a feed and all its items
    Remove {
        /// URL of the feed to remove
        url: String,
    },
    /// Set or clear a feed's category
    SetCategory {
        /// URL of the feed
        url: String,
        /// New category; omit to clear
        category: Option<String>,
    },
    /// List all feeds
    List,
    /// List recent items, most recent first
    Items {
        /// Restrict to these feed ids (repeatable)
        #[arg(short, long)]
        feed: Vec<i64>,
        /// Restrict to these categories (repeatable)
        #[arg(short, long)]
        category: Vec<String>,
        /// Maximum number of items
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Sync one feed now
    Refresh {
        /// URL of the feed to sync
        url: String,
    },
    /// Sync all feeds once
    Sync,
    /// Run the polling service until interrupted
    Serve,
}
