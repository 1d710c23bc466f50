//! History persistence.
//!
//! [`HistoryStore`] is the port for wherever entries are kept. The monitor
//! normally writes to a remote document database and keeps the local
//! cache as a fallback: [`FallbackHistoryStore`] tries the primary store
//! and, when it fails, writes or reads the same records locally. A record
//! written during an outage is then only visible on this machine.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use parking_monitor_cache::LocalCache;
use parking_monitor_lot_models::{HistoryEntry, LotRecord, OccupancySnapshot};

use crate::NotifyError;

/// Maximum entries returned when loading a user's history.
pub const HISTORY_LOAD_LIMIT: usize = 100;

/// Storage for [`HistoryEntry`] records.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persists `entry` and returns it with its final id.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the entry cannot be stored.
    async fn append(&self, entry: HistoryEntry) -> Result<HistoryEntry, NotifyError>;

    /// Loads at most `limit` of `username`'s entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the store cannot be read.
    async fn recent(&self, username: &str, limit: usize) -> Result<Vec<HistoryEntry>, NotifyError>;
}

/// Builds a new entry for `lot`, observed at `now` by `username`.
#[must_use]
pub fn new_entry(lot: &LotRecord, username: &str, now: DateTime<Local>) -> HistoryEntry {
    HistoryEntry {
        id: uuid::Uuid::new_v4().to_string(),
        parking_id: lot.id,
        parking_name: lot.name.clone(),
        image_url: lot.image_url.clone(),
        status: lot.status,
        data: OccupancySnapshot::from(lot),
        username: username.to_string(),
        timestamp: now.with_timezone(&Utc),
        date: now.format("%Y-%m-%d").to_string(),
        time: now.format("%H:%M:%S").to_string(),
    }
}

/// History kept in the [`LocalCache`], trimmed per lot on every write.
#[derive(Debug, Clone)]
pub struct LocalHistoryStore {
    cache: LocalCache,
}

impl LocalHistoryStore {
    /// Creates a store over `cache`.
    #[must_use]
    pub const fn new(cache: LocalCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl HistoryStore for LocalHistoryStore {
    async fn append(&self, entry: HistoryEntry) -> Result<HistoryEntry, NotifyError> {
        self.cache.append_history(entry.clone())?;
        Ok(entry)
    }

    async fn recent(&self, username: &str, limit: usize) -> Result<Vec<HistoryEntry>, NotifyError> {
        let mut entries = self.cache.history(username);
        entries.truncate(limit);
        Ok(entries)
    }
}

/// Primary store with local fallback.
///
/// This is the wrapper for a remote document database client. No such
/// client ships in this workspace yet, so the `parking_monitor` binary
/// records history through [`LocalHistoryStore`] alone; a remote
/// [`HistoryStore`] is wired in by passing it here as `primary`.
#[derive(Clone)]
pub struct FallbackHistoryStore {
    primary: Arc<dyn HistoryStore>,
    local: LocalHistoryStore,
}

impl FallbackHistoryStore {
    /// Wraps `primary`, falling back to `local` on failure.
    #[must_use]
    pub fn new(primary: Arc<dyn HistoryStore>, local: LocalHistoryStore) -> Self {
        Self { primary, local }
    }
}

#[async_trait]
impl HistoryStore for FallbackHistoryStore {
    async fn append(&self, entry: HistoryEntry) -> Result<HistoryEntry, NotifyError> {
        match self.primary.append(entry.clone()).await {
            Ok(stored) => Ok(stored),
            Err(e) => {
                log::error!("History write failed, keeping entry locally: {e}");
                self.local.append(entry).await
            }
        }
    }

    async fn recent(&self, username: &str, limit: usize) -> Result<Vec<HistoryEntry>, NotifyError> {
        match self.primary.recent(username, limit).await {
            Ok(entries) => Ok(entries),
            Err(e) => {
                log::error!("History load failed, reading local copy: {e}");
                self.local.recent(username, limit).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use parking_monitor_lot_models::LotStatus;

    use super::*;

    struct Unreachable;

    #[async_trait]
    impl HistoryStore for Unreachable {
        async fn append(&self, _entry: HistoryEntry) -> Result<HistoryEntry, NotifyError> {
            Err(NotifyError::Store {
                message: "offline".to_string(),
            })
        }

        async fn recent(&self, _username: &str, _limit: usize) -> Result<Vec<HistoryEntry>, NotifyError> {
            Err(NotifyError::Store {
                message: "offline".to_string(),
            })
        }
    }

    fn lot() -> LotRecord {
        let mut lot = parking_monitor_cache::defaults::default_lots(Local::now()).remove(0);
        lot.image_url = "https://img/a".to_string();
        lot.status = LotStatus::Plenty;
        lot
    }

    #[test]
    fn new_entry_captures_lot_snapshot() {
        let now = Local.with_ymd_and_hms(2026, 10, 19, 9, 5, 7).unwrap();
        let entry = new_entry(&lot(), "kim", now);
        assert_eq!(entry.parking_id, 1);
        assert_eq!(entry.image_url, "https://img/a");
        assert_eq!(entry.username, "kim");
        assert_eq!(entry.date, "2026-10-19");
        assert_eq!(entry.time, "09:05:07");
        assert_eq!(entry.timestamp, now.with_timezone(&Utc));
        assert!(!entry.id.is_empty());
    }

    #[tokio::test]
    async fn failed_primary_falls_back_to_local() {
        let cache = LocalCache::in_memory();
        let store = FallbackHistoryStore::new(
            Arc::new(Unreachable),
            LocalHistoryStore::new(cache.clone()),
        );

        let entry = new_entry(&lot(), "kim", Local::now());
        let stored = store.append(entry.clone()).await.unwrap();
        assert_eq!(stored, entry);
        assert_eq!(cache.history("kim"), vec![entry.clone()]);

        let loaded = store.recent("kim", HISTORY_LOAD_LIMIT).await.unwrap();
        assert_eq!(loaded, vec![entry]);
    }

    #[tokio::test]
    async fn local_recent_respects_limit() {
        let store = LocalHistoryStore::new(LocalCache::in_memory());
        for _ in 0..3 {
            store.append(new_entry(&lot(), "kim", Local::now())).await.unwrap();
        }
        assert_eq!(store.recent("kim", 2).await.unwrap().len(), 2);
        assert!(store.recent("lee", 10).await.unwrap().is_empty());
    }
}
