//! Runtime settings resolved from flags and environment.

use std::path::PathBuf;
use std::time::Duration;

use parking_monitor_cache::paths;
use parking_monitor_fetcher::{API_URL_ENV, DEFAULT_API_URL};

use crate::DEFAULT_POLL_INTERVAL;

/// Resolved monitor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend base URL (without `/parking/list`).
    pub api_url: String,
    /// Root of the local data directory.
    pub data_dir: PathBuf,
    /// Polling period.
    pub interval: Duration,
    /// Whether alerts may be delivered at all.
    pub notifications: bool,
}

impl Config {
    /// Resolves settings. Explicit values win over the environment, which
    /// wins over the built-in defaults.
    #[must_use]
    pub fn resolve(
        api_url: Option<String>,
        data_dir: Option<PathBuf>,
        interval_secs: Option<u64>,
        notifications: bool,
    ) -> Self {
        let api_url = api_url
            .or_else(|| std::env::var(API_URL_ENV).ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let interval = interval_secs
            .filter(|&secs| secs > 0)
            .map_or(DEFAULT_POLL_INTERVAL, Duration::from_secs);

        Self {
            api_url,
            data_dir: data_dir.unwrap_or_else(paths::data_dir),
            interval,
            notifications,
        }
    }

    /// Directory of the key-value cache files.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        paths::cache_dir(&self.data_dir)
    }
}
