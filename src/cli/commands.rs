use tokio::sync::watch;

use crate::app::{AppContext, FreshetError, Result};
use crate::store::{ItemFilter, Store};

pub async fn add_feed(ctx: &AppContext, url: &str, category: Option<&str>) -> Result<()> {
    match ctx.engine.add_feed(url, category).await {
        Ok(feed) => {
            println!("Added feed: {}", feed.display_title());
            println!("  {} items", ctx.store.count_items(feed.id)?);
            Ok(())
        }
        // Distinguishable rejections per the add-feed contract.
        Err(FreshetError::DuplicateFeed(url)) => {
            println!("This feed has already been added: {url}");
            Ok(())
        }
        Err(FreshetError::FeedParse(reason)) => {
            println!("Feed could not be parsed: {reason}");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

pub fn remove_feed(ctx: &AppContext, url: &str) -> Result<()> {
    let feed = ctx
        .store
        .get_feed_by_url(url)?
        .ok_or_else(|| FreshetError::FeedNotFound(url.to_string()))?;

    ctx.store.delete_feed(feed.id)?;
    println!("Removed feed: {url}");
    Ok(())
}

pub fn set_category(ctx: &AppContext, url: &str, category: Option<&str>) -> Result<()> {
    let feed = ctx
        .store
        .get_feed_by_url(url)?
        .ok_or_else(|| FreshetError::FeedNotFound(url.to_string()))?;

    ctx.store.set_category(feed.id, category)?;
    match category {
        Some(c) => println!("Category for {url} set to {c}"),
        None => println!("Category for {url} cleared"),
    }
    Ok(())
}

pub fn list_feeds(ctx: &AppContext) -> Result<()> {
    let feeds = ctx.store.list_feeds()?;

    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    for feed in feeds {
        let count = ctx.store.count_items(feed.id)?;
        let category = feed.category.as_deref().unwrap_or("-");
        let last = feed
            .last_updated
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());

        println!(
            "[{}] {} ({count} items, {category}, last sync {last})\n  {}",
            feed.id,
            feed.display_title(),
            feed.url
        );
    }

    Ok(())
}

pub fn list_items(
    ctx: &AppContext,
    feed_ids: Vec<i64>,
    categories: Vec<String>,
    limit: Option<usize>,
) -> Result<()> {
    let filter = ItemFilter {
        feed_ids,
        categories,
        limit: limit.or(Some(ctx.config.item_limit)),
    };
    let items = ctx.store.recent_items(&filter)?;

    if items.is_empty() {
        println!("No items");
        return Ok(());
    }

    for item in items {
        println!(
            "{} {}\n  {}",
            item.published.format("%Y-%m-%d"),
            item.title,
            item.link
        );
    }

    Ok(())
}

pub async fn refresh_feed(ctx: &AppContext, url: &str) -> Result<()> {
    if ctx.engine.refresh_feed(url).await? {
        println!("Synced {url}");
    } else {
        println!("Sync failed for {url}, see logs");
    }
    Ok(())
}

pub async fn sync_once(ctx: &AppContext) -> Result<()> {
    let scheduler = ctx.scheduler();
    let report = scheduler.run_sweep().await;
    println!(
        "Sweep complete: {} synced, {} failed",
        report.synced, report.failed
    );
    Ok(())
}

/// Run the scheduler until SIGINT/SIGTERM.
pub async fn serve(ctx: &AppContext) -> Result<()> {
    let scheduler = ctx.scheduler();
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        let _ = tx.send(true);
    });

    scheduler.run(rx).await;
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {}
        _ = tokio::signal::ctrl_c() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
