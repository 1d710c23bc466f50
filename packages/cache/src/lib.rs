#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Durable key-value cache for the parking monitor.
//!
//! [`LocalCache`] layers typed accessors over a [`store::Persistence`]
//! backend. Reads never fail: an absent key yields a defined default and a
//! malformed value is logged and replaced by the same default. Writes
//! return a [`Result`] so callers decide whether a failure matters.
//!
//! History is stored per user and trimmed on every write to the most
//! recent [`HISTORY_PER_LOT`] entries for each lot.

pub mod defaults;
pub mod paths;
pub mod store;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Local;
use parking_monitor_lot_models::{
    FavoriteSet, HistoryEntry, LotId, LotRecord, NotificationTimeRange, SessionState,
    StoredPosition,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::store::Persistence;

/// Maximum history entries kept per `(username, parkingId)` pair.
pub const HISTORY_PER_LOT: usize = 20;

/// Key of the reconciled lot snapshot.
pub const LOTS_KEY: &str = "lots";
/// Key of the user-set marker positions.
pub const POSITIONS_KEY: &str = "positions";
/// Key of the favorite lot ids.
pub const FAVORITES_KEY: &str = "favorites";
/// Key of the session state.
pub const SESSION_KEY: &str = "session";
/// Key of the notification windows.
pub const TIME_RANGES_KEY: &str = "time_ranges";
/// Key of the lowest lot id not yet handed out.
pub const NEXT_LOT_ID_KEY: &str = "next_lot_id";

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key of one user's history log.
#[must_use]
pub fn history_key(username: &str) -> String {
    format!("history/{username}")
}

/// Typed view over a [`Persistence`] backend.
#[derive(Clone)]
pub struct LocalCache {
    store: Arc<dyn Persistence>,
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache").finish_non_exhaustive()
    }
}

impl LocalCache {
    /// Wraps a persistence backend.
    #[must_use]
    pub fn new(store: Arc<dyn Persistence>) -> Self {
        Self { store }
    }

    /// A cache over a fresh [`store::MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(store::MemoryStore::new()))
    }

    /// Reads and decodes `key`. Absent, unreadable, and malformed values all
    /// yield `None`; the latter two are logged.
    #[must_use]
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::error!("Failed to read cache key '{key}': {e}");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Malformed cache value for '{key}', using default: {e}");
                None
            }
        }
    }

    /// Encodes and stores `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if encoding or the backend write fails.
    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw).inspect_err(|e| {
            log::error!("Failed to write cache key '{key}': {e}");
        })
    }

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend write fails.
    pub fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.delete(key)
    }

    /// Last reconciled snapshot, or the built-in dataset.
    #[must_use]
    pub fn lots(&self) -> Vec<LotRecord> {
        self.get_json(LOTS_KEY).unwrap_or_else(|| {
            log::debug!("No cached lots, using built-in dataset");
            defaults::default_lots(Local::now())
        })
    }

    /// Replaces the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the write fails.
    pub fn set_lots(&self, lots: &[LotRecord]) -> Result<(), CacheError> {
        self.set_json(LOTS_KEY, lots)?;
        log::debug!("Saved {} lots", lots.len());
        Ok(())
    }

    /// Hands out a lot id above every id in `lots` and every id handed out
    /// before, so a deleted lot's id is never given to a new one.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the new high-water mark cannot be stored.
    pub fn allocate_lot_id(&self, lots: &[LotRecord]) -> Result<LotId, CacheError> {
        let above_lots = lots.iter().map(|lot| lot.id).max().map_or(1, |max| max.saturating_add(1));
        let id = self
            .get_json::<LotId>(NEXT_LOT_ID_KEY)
            .map_or(above_lots, |next| next.max(above_lots));
        self.set_json(NEXT_LOT_ID_KEY, &id.saturating_add(1))?;
        Ok(id)
    }

    /// User-set marker positions keyed by lot id.
    #[must_use]
    pub fn positions(&self) -> BTreeMap<LotId, StoredPosition> {
        self.get_json(POSITIONS_KEY).unwrap_or_default()
    }

    /// Records a user-set marker position.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the write fails.
    pub fn set_position(&self, id: LotId, position: StoredPosition) -> Result<(), CacheError> {
        let mut positions = self.positions();
        positions.insert(id, position);
        self.set_json(POSITIONS_KEY, &positions)
    }

    /// Forgets the marker position of a lot.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the write fails.
    pub fn remove_position(&self, id: LotId) -> Result<(), CacheError> {
        let mut positions = self.positions();
        if positions.remove(&id).is_some() {
            self.set_json(POSITIONS_KEY, &positions)?;
        }
        Ok(())
    }

    /// Favorite lot ids.
    #[must_use]
    pub fn favorites(&self) -> FavoriteSet {
        self.get_json(FAVORITES_KEY).unwrap_or_default()
    }

    /// Replaces the favorites.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the write fails.
    pub fn set_favorites(&self, favorites: &FavoriteSet) -> Result<(), CacheError> {
        self.set_json(FAVORITES_KEY, favorites)
    }

    /// Session state, logged out by default.
    #[must_use]
    pub fn session(&self) -> SessionState {
        self.get_json(SESSION_KEY).unwrap_or_default()
    }

    /// Replaces the session state.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the write fails.
    pub fn set_session(&self, session: &SessionState) -> Result<(), CacheError> {
        self.set_json(SESSION_KEY, session)
    }

    /// Notification windows, or the disabled defaults.
    #[must_use]
    pub fn time_ranges(&self) -> Vec<NotificationTimeRange> {
        self.get_json(TIME_RANGES_KEY)
            .unwrap_or_else(defaults::default_time_ranges)
    }

    /// Replaces the notification windows.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the write fails.
    pub fn set_time_ranges(&self, ranges: &[NotificationTimeRange]) -> Result<(), CacheError> {
        self.set_json(TIME_RANGES_KEY, ranges)
    }

    /// A user's history, newest first.
    #[must_use]
    pub fn history(&self, username: &str) -> Vec<HistoryEntry> {
        self.get_json(&history_key(username)).unwrap_or_default()
    }

    /// Prepends `entry` to its owner's history and applies retention.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the write fails.
    pub fn append_history(&self, entry: HistoryEntry) -> Result<(), CacheError> {
        let key = history_key(&entry.username);
        let mut entries = self.history(&entry.username);
        entries.insert(0, entry);
        let kept = retain_recent(entries, HISTORY_PER_LOT);
        self.set_json(&key, &kept)
    }

    /// Deletes a user's whole history.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the write fails.
    pub fn clear_history(&self, username: &str) -> Result<(), CacheError> {
        self.delete(&history_key(username))
    }
}

/// Keeps the `per_lot` most recent entries of each lot, newest first.
///
/// Entries with equal timestamps keep their relative order, so an entry
/// prepended by the caller stays ahead of older ones with the same stamp.
#[must_use]
pub fn retain_recent(entries: Vec<HistoryEntry>, per_lot: usize) -> Vec<HistoryEntry> {
    let mut groups: BTreeMap<LotId, Vec<HistoryEntry>> = BTreeMap::new();
    for entry in entries {
        groups.entry(entry.parking_id).or_default().push(entry);
    }

    let mut kept: Vec<HistoryEntry> = groups
        .into_values()
        .flat_map(|mut group| {
            group.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            group.truncate(per_lot);
            group
        })
        .collect();
    kept.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    kept
}
