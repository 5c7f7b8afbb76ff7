use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{FreshetError, Result};
use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::scheduler::Scheduler;
use crate::store::SqliteStore;
use crate::sync::SyncEngine;

/// Wires the store, fetcher, sync engine, and scheduler together.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub engine: Arc<SyncEngine>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match &config.database_path {
            Some(p) => p.clone(),
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::with_store(config, store)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_store(config, store)
    }

    fn with_store(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> =
            Arc::new(HttpFetcher::with_timeout(config.fetch_timeout()));
        let engine = Arc::new(SyncEngine::new(fetcher, store.clone()));

        Ok(Self {
            config,
            store,
            engine,
        })
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(
            self.engine.clone(),
            self.store.clone(),
            self.config.scheduler_config(),
        )
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| FreshetError::Config("Could not find data directory".into()))?;
        let freshet_dir = data_dir.join("freshet");
        std::fs::create_dir_all(&freshet_dir)?;
        Ok(freshet_dir.join("freshet.db"))
    }
}
