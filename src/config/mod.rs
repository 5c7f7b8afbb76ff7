//! Configuration management.
//!
//! Configuration is read from `~/.config/freshet/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is
//! created. Missing fields fall back to defaults.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::scheduler::SchedulerConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file path; defaults to `<data dir>/freshet/freshet.db`.
    pub database_path: Option<PathBuf>,
    /// Seconds between full sweeps over all feeds.
    pub sweep_interval_secs: u64,
    /// Seconds between consecutive feeds within one sweep.
    pub feed_spacing_secs: u64,
    /// Per-request fetch timeout in seconds.
    pub fetch_timeout_secs: u64,
    /// Cap on the recent-items listing.
    pub item_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            sweep_interval_secs: 60,
            feed_spacing_secs: 1,
            fetch_timeout_secs: 10,
            item_limit: 50,
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating a commented
    /// default file on first run.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(config)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            feed_spacing: Duration::from_secs(self.feed_spacing_secs),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// `~/.config/freshet/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("freshet").join("config.toml"))
    }

    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# Freshet configuration
#
# Database location. Defaults to the platform data directory
# (e.g. ~/.local/share/freshet/freshet.db) when unset.
#database_path = "/path/to/freshet.db"

# Seconds between full sweeps over all feeds.
sweep_interval_secs = 60

# Seconds between consecutive feeds within one sweep, to avoid
# bursting outbound requests.
feed_spacing_secs = 1

# Per-request fetch timeout in seconds.
fetch_timeout_secs = 10

# Cap on the recent-items listing.
item_limit = 50
"##
        .to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
