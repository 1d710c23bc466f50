//! User-facing operations on the monitor state.
//!
//! Everything here reads and writes the same [`LocalCache`] the polling
//! loop uses, so edits made between polls are picked up by the next
//! reconciliation (positions, fees, contacts) and the next notifier pass
//! (session, favorites, time windows).

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use parking_monitor_cache::defaults::DISPLAY_TIME_FORMAT;
use parking_monitor_cache::{CacheError, LOTS_KEY, LocalCache};
use parking_monitor_lot_models::{
    HistoryEntry, InvalidTimeError, LotId, LotRecord, LotStatus, MinuteOfDay,
    NotificationPermission, NotificationTimeRange, SessionState, StoredPosition,
};
use parking_monitor_notify::history::HISTORY_LOAD_LIMIT;
use parking_monitor_notify::{HistoryStore, NotificationChannel, NotifyError, favorite_added};
use parking_monitor_reconcile::resolve::FALLBACK_POSITION;

/// Errors returned by dashboard operations.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// The operation needs a logged-in user.
    #[error("Not logged in")]
    NotLoggedIn,

    /// Login was attempted with a blank name.
    #[error("Username must not be empty")]
    EmptyUsername,

    /// No lot has this id.
    #[error("Lot {id} not found")]
    LotNotFound {
        /// The requested id.
        id: LotId,
    },

    /// No notification window has this id.
    #[error("Time range {id} not found")]
    TimeRangeNotFound {
        /// The requested id.
        id: u32,
    },

    /// A time of day could not be parsed.
    #[error(transparent)]
    InvalidTime(#[from] InvalidTimeError),

    /// Local cache failure.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// History store failure.
    #[error("History error: {0}")]
    History(#[from] NotifyError),
}

/// Editable descriptive fields of a lot. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LotEdit {
    /// Display name.
    pub name: Option<String>,
    /// Street address.
    pub address: Option<String>,
    /// Fee description.
    pub fee: Option<String>,
    /// Opening hours.
    pub open_time: Option<String>,
    /// Contact number.
    pub contact: Option<String>,
}

impl LotEdit {
    fn apply(&self, lot: &mut LotRecord) {
        let fields = [
            (&self.name, &mut lot.name),
            (&self.address, &mut lot.address),
            (&self.fee, &mut lot.fee),
            (&self.open_time, &mut lot.open_time),
            (&self.contact, &mut lot.contact),
        ];
        for (edit, field) in fields {
            if let Some(value) = edit {
                field.clone_from(value);
            }
        }
    }
}

/// Narrows a history listing. All set criteria must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Only this lot.
    pub lot: Option<LotId>,
    /// Only entries recorded on this local date (`YYYY-MM-DD`).
    pub date: Option<String>,
    /// Only entries whose local time starts with this (`HH`, `HH:MM`, ...).
    pub time_prefix: Option<String>,
    /// Only entries whose snapshot was analysed at or after this instant.
    pub since: Option<DateTime<Utc>>,
}

/// When an entry's snapshot was taken: its analysis time if that parses
/// (RFC 3339, or the local display format), else when it was recorded.
fn observed_at(entry: &HistoryEntry) -> DateTime<Utc> {
    let analysis = entry.data.analysis_time.trim();
    DateTime::parse_from_rfc3339(analysis)
        .map(|at| at.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(analysis, DISPLAY_TIME_FORMAT)
                .ok()
                .and_then(|naive| naive.and_local_timezone(Local).earliest())
                .map(|at| at.with_timezone(&Utc))
        })
        .unwrap_or(entry.timestamp)
}

impl HistoryFilter {
    fn matches(&self, entry: &HistoryEntry) -> bool {
        self.lot.is_none_or(|id| entry.parking_id == id)
            && self.date.as_deref().is_none_or(|date| entry.date == date)
            && self
                .time_prefix
                .as_deref()
                .is_none_or(|prefix| entry.time.starts_with(prefix))
            && self.since.is_none_or(|since| observed_at(entry) >= since)
    }
}

/// Session, favorites, time windows, lot edits, and history.
pub struct Dashboard {
    cache: LocalCache,
    channel: Arc<dyn NotificationChannel>,
    history: Arc<dyn HistoryStore>,
}

impl Dashboard {
    /// Creates a dashboard over `cache`.
    #[must_use]
    pub fn new(
        cache: LocalCache,
        channel: Arc<dyn NotificationChannel>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            cache,
            channel,
            history,
        }
    }

    /// Current session.
    #[must_use]
    pub fn session(&self) -> SessionState {
        self.cache.session()
    }

    fn require_user(&self) -> Result<SessionState, DashboardError> {
        let session = self.cache.session();
        if session.active_user().is_none() {
            return Err(DashboardError::NotLoggedIn);
        }
        Ok(session)
    }

    /// Logs in as `name` (trimmed). Asks for notification permission if it
    /// has not been decided yet.
    ///
    /// # Errors
    ///
    /// * If `name` is blank
    /// * If the session cannot be stored
    pub fn login(&self, name: &str) -> Result<SessionState, DashboardError> {
        let username = name.trim();
        if username.is_empty() {
            return Err(DashboardError::EmptyUsername);
        }

        let mut session = self.cache.session();
        session.is_logged_in = true;
        session.username = username.to_string();
        if matches!(
            session.notification_permission,
            NotificationPermission::Default | NotificationPermission::Unsupported
        ) {
            session.notification_permission = self.channel.request_permission();
        }
        self.cache.set_session(&session)?;

        log::info!(
            "Logged in as {username} (notifications: {})",
            session.notification_permission
        );
        Ok(session)
    }

    /// Ends the session and forgets favorites. History is kept.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Cache`] if the cache cannot be written.
    pub fn logout(&self) -> Result<(), DashboardError> {
        let previous = self.cache.session();
        self.cache.set_session(&SessionState {
            notification_permission: previous.notification_permission,
            ..SessionState::default()
        })?;
        self.cache.set_favorites(&Default::default())?;
        log::info!("Logged out {}", previous.username);
        Ok(())
    }

    /// Adds or removes `id` from the favorites. Returns whether the lot is
    /// now a favorite.
    ///
    /// # Errors
    ///
    /// * If nobody is logged in
    /// * If no lot has this id
    /// * If the favorites cannot be stored
    pub fn toggle_favorite(&self, id: LotId) -> Result<bool, DashboardError> {
        let session = self.require_user()?;
        let lots = self.cache.lots();
        let lot = lots
            .iter()
            .find(|lot| lot.id == id)
            .ok_or(DashboardError::LotNotFound { id })?;

        let mut favorites = self.cache.favorites();
        let added = favorites.insert(id);
        if !added {
            favorites.remove(&id);
        }
        self.cache.set_favorites(&favorites)?;

        if added && session.notification_permission == NotificationPermission::Granted {
            self.channel.show(&favorite_added(lot));
        }
        Ok(added)
    }

    /// Favorite lot ids.
    #[must_use]
    pub fn favorites(&self) -> Vec<LotId> {
        self.cache.favorites().into_iter().collect()
    }

    /// Notification windows.
    #[must_use]
    pub fn time_ranges(&self) -> Vec<NotificationTimeRange> {
        self.cache.time_ranges()
    }

    /// Appends a disabled 09:00-18:00 window.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Cache`] if the windows cannot be stored.
    pub fn add_time_range(&self) -> Result<NotificationTimeRange, DashboardError> {
        let mut ranges = self.cache.time_ranges();
        let range = NotificationTimeRange {
            id: ranges.iter().map(|r| r.id).max().unwrap_or(0) + 1,
            start_time: MinuteOfDay::new(9, 0)?,
            end_time: MinuteOfDay::new(18, 0)?,
            enabled: false,
        };
        ranges.push(range.clone());
        self.cache.set_time_ranges(&ranges)?;
        Ok(range)
    }

    fn edit_time_range<T>(
        &self,
        id: u32,
        edit: impl FnOnce(&mut NotificationTimeRange) -> T,
    ) -> Result<T, DashboardError> {
        let mut ranges = self.cache.time_ranges();
        let range = ranges
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(DashboardError::TimeRangeNotFound { id })?;
        let result = edit(range);
        self.cache.set_time_ranges(&ranges)?;
        Ok(result)
    }

    /// Flips a window on or off. Returns the new state.
    ///
    /// # Errors
    ///
    /// * If no window has this id
    /// * If the windows cannot be stored
    pub fn toggle_time_range(&self, id: u32) -> Result<bool, DashboardError> {
        self.edit_time_range(id, |range| {
            range.enabled = !range.enabled;
            range.enabled
        })
    }

    /// Sets a window's bounds from `"HH:MM"` strings.
    ///
    /// # Errors
    ///
    /// * If either time is malformed
    /// * If no window has this id
    /// * If the windows cannot be stored
    pub fn update_time_range(&self, id: u32, start: &str, end: &str) -> Result<(), DashboardError> {
        let start_time: MinuteOfDay = start.parse()?;
        let end_time: MinuteOfDay = end.parse()?;
        self.edit_time_range(id, |range| {
            range.start_time = start_time;
            range.end_time = end_time;
        })
    }

    /// Removes a window.
    ///
    /// # Errors
    ///
    /// * If no window has this id
    /// * If the windows cannot be stored
    pub fn delete_time_range(&self, id: u32) -> Result<(), DashboardError> {
        let mut ranges = self.cache.time_ranges();
        let before = ranges.len();
        ranges.retain(|r| r.id != id);
        if ranges.len() == before {
            return Err(DashboardError::TimeRangeNotFound { id });
        }
        self.cache.set_time_ranges(&ranges)?;
        Ok(())
    }

    /// Current lot snapshot.
    #[must_use]
    pub fn lots(&self) -> Vec<LotRecord> {
        self.cache.lots()
    }

    /// Lots whose name contains `query`, ignoring case.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<LotRecord> {
        let query = query.to_lowercase();
        self.cache
            .lots()
            .into_iter()
            .filter(|lot| lot.name.to_lowercase().contains(&query))
            .collect()
    }

    fn edit_lot(
        &self,
        id: LotId,
        edit: impl FnOnce(&mut LotRecord),
    ) -> Result<LotRecord, DashboardError> {
        let mut lots = self.cache.lots();
        let lot = lots
            .iter_mut()
            .find(|lot| lot.id == id)
            .ok_or(DashboardError::LotNotFound { id })?;
        edit(lot);
        let updated = lot.clone();
        self.cache.set_lots(&lots)?;
        Ok(updated)
    }

    /// Overwrites the descriptive fields set in `edit`.
    ///
    /// # Errors
    ///
    /// * If no lot has this id
    /// * If the snapshot cannot be stored
    pub fn update_lot(&self, id: LotId, edit: &LotEdit) -> Result<LotRecord, DashboardError> {
        self.edit_lot(id, |lot| edit.apply(lot))
    }

    /// Moves a lot's marker and remembers the position across polls.
    ///
    /// # Errors
    ///
    /// * If no lot has this id
    /// * If the snapshot or position cannot be stored
    pub fn move_lot(
        &self,
        id: LotId,
        lat: f64,
        lng: f64,
        now: DateTime<Utc>,
    ) -> Result<LotRecord, DashboardError> {
        let lot = self.edit_lot(id, |lot| {
            log::info!(
                "Moving {}: ({:.6}, {:.6}) -> ({lat:.6}, {lng:.6})",
                lot.name,
                lot.lat,
                lot.lng
            );
            lot.lat = lat;
            lot.lng = lng;
        })?;
        self.cache.set_position(
            id,
            StoredPosition {
                lat,
                lng,
                updated_at: now,
            },
        )?;
        Ok(lot)
    }

    /// Adds a placeholder lot at the map centre. Its id is above every id
    /// handed out before, including those of deleted lots.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Cache`] if the snapshot cannot be stored.
    pub fn add_lot(&self, now: DateTime<Local>) -> Result<LotRecord, DashboardError> {
        let mut lots = self.cache.lots();
        let id = self.cache.allocate_lot_id(&lots)?;
        let stamp = now.format(DISPLAY_TIME_FORMAT).to_string();
        let empty_ratio = "50.0".to_string();

        let lot = LotRecord {
            id,
            name: "새 주차장".to_string(),
            lat: FALLBACK_POSITION.lat,
            lng: FALLBACK_POSITION.lng,
            status: LotStatus::from_ratio_str(&empty_ratio),
            empty_spaces: 50,
            occupied_spaces: 50,
            total_spaces: 100,
            empty_ratio,
            image_url: String::new(),
            analysis_time: stamp.clone(),
            address: "주소를 입력하세요".to_string(),
            fee: "요금 정보".to_string(),
            open_time: "운영 시간".to_string(),
            last_updated: stamp,
            contact: "연락처".to_string(),
        };
        lots.push(lot.clone());
        self.cache.set_lots(&lots)?;
        log::info!("Added lot {id}");
        Ok(lot)
    }

    /// Removes a lot together with its stored position and favorite mark.
    ///
    /// # Errors
    ///
    /// * If no lot has this id
    /// * If the cache cannot be written
    pub fn delete_lot(&self, id: LotId) -> Result<(), DashboardError> {
        let mut lots = self.cache.lots();
        let before = lots.len();
        lots.retain(|lot| lot.id != id);
        if lots.len() == before {
            return Err(DashboardError::LotNotFound { id });
        }
        self.cache.set_lots(&lots)?;
        self.cache.remove_position(id)?;

        let mut favorites = self.cache.favorites();
        if favorites.remove(&id) {
            self.cache.set_favorites(&favorites)?;
        }
        log::info!("Deleted lot {id}");
        Ok(())
    }

    /// Drops every lot edit; the built-in dataset applies until the next
    /// poll. Stored marker positions are kept.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Cache`] if the snapshot cannot be deleted.
    pub fn reset_to_default(&self) -> Result<(), DashboardError> {
        self.cache.delete(LOTS_KEY)?;
        log::info!("Restored the built-in lot dataset");
        Ok(())
    }

    /// The logged-in user's history, newest first, at most
    /// [`HISTORY_LOAD_LIMIT`] entries before filtering.
    ///
    /// # Errors
    ///
    /// * If nobody is logged in
    /// * If the history store cannot be read
    pub async fn history(&self, filter: &HistoryFilter) -> Result<Vec<HistoryEntry>, DashboardError> {
        let session = self.require_user()?;
        let mut entries = self
            .history
            .recent(&session.username, HISTORY_LOAD_LIMIT)
            .await?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.retain(|entry| filter.matches(entry));
        Ok(entries)
    }

    /// Deletes the logged-in user's local history.
    ///
    /// # Errors
    ///
    /// * If nobody is logged in
    /// * If the cache cannot be written
    pub fn clear_history(&self) -> Result<(), DashboardError> {
        let session = self.require_user()?;
        self.cache.clear_history(&session.username)?;
        log::info!("Cleared history for {}", session.username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone as _;
    use parking_monitor_notify::history::new_entry;
    use parking_monitor_notify::{Alert, DisabledChannel, LocalHistoryStore};

    use super::*;

    #[derive(Default)]
    struct RecordingChannel {
        shown: Mutex<Vec<Alert>>,
    }

    impl NotificationChannel for RecordingChannel {
        fn request_permission(&self) -> NotificationPermission {
            NotificationPermission::Granted
        }

        fn show(&self, alert: &Alert) {
            self.shown.lock().unwrap().push(alert.clone());
        }
    }

    fn dashboard(cache: &LocalCache, channel: Arc<dyn NotificationChannel>) -> Dashboard {
        Dashboard::new(
            cache.clone(),
            channel,
            Arc::new(LocalHistoryStore::new(cache.clone())),
        )
    }

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 19, hour, minute, 0).unwrap()
    }

    #[test]
    fn login_trims_and_requests_permission() {
        let cache = LocalCache::in_memory();
        let dash = dashboard(&cache, Arc::new(RecordingChannel::default()));

        assert!(matches!(
            dash.login("   "),
            Err(DashboardError::EmptyUsername)
        ));

        let session = dash.login("  kim ").unwrap();
        assert_eq!(session.username, "kim");
        assert!(session.is_logged_in);
        assert_eq!(
            session.notification_permission,
            NotificationPermission::Granted
        );
        assert_eq!(cache.session(), session);
    }

    #[test]
    fn login_keeps_a_decided_permission() {
        let cache = LocalCache::in_memory();
        cache
            .set_session(&SessionState {
                notification_permission: NotificationPermission::Denied,
                ..SessionState::default()
            })
            .unwrap();
        let dash = dashboard(&cache, Arc::new(RecordingChannel::default()));
        let session = dash.login("kim").unwrap();
        assert_eq!(
            session.notification_permission,
            NotificationPermission::Denied
        );
    }

    #[tokio::test]
    async fn logout_clears_session_and_favorites_but_keeps_history() {
        let cache = LocalCache::in_memory();
        let dash = dashboard(&cache, Arc::new(DisabledChannel));
        dash.login("kim").unwrap();
        assert!(dash.toggle_favorite(1).unwrap());

        let lot = cache.lots().remove(0);
        cache.append_history(new_entry(&lot, "kim", at(9, 0))).unwrap();

        dash.logout().unwrap();
        assert!(!cache.session().is_logged_in);
        assert!(cache.session().username.is_empty());
        assert!(dash.favorites().is_empty());
        assert_eq!(cache.history("kim").len(), 1);

        dash.login("kim").unwrap();
        assert_eq!(dash.history(&HistoryFilter::default()).await.unwrap().len(), 1);
    }

    #[test]
    fn favorites_need_login_and_a_known_lot() {
        let cache = LocalCache::in_memory();
        let channel = Arc::new(RecordingChannel::default());
        let dash = dashboard(&cache, channel.clone());

        assert!(matches!(
            dash.toggle_favorite(1),
            Err(DashboardError::NotLoggedIn)
        ));

        dash.login("kim").unwrap();
        assert!(matches!(
            dash.toggle_favorite(999),
            Err(DashboardError::LotNotFound { id: 999 })
        ));

        assert!(dash.toggle_favorite(2).unwrap());
        assert_eq!(dash.favorites(), vec![2]);
        assert_eq!(channel.shown.lock().unwrap()[0].tag, "favorite-2");

        assert!(!dash.toggle_favorite(2).unwrap());
        assert!(dash.favorites().is_empty());
        assert_eq!(channel.shown.lock().unwrap().len(), 1);
    }

    #[test]
    fn time_range_lifecycle() {
        let cache = LocalCache::in_memory();
        let dash = dashboard(&cache, Arc::new(DisabledChannel));

        let added = dash.add_time_range().unwrap();
        assert_eq!(added.id, 4);
        assert_eq!(added.start_time.to_string(), "09:00");
        assert_eq!(added.end_time.to_string(), "18:00");
        assert!(!added.enabled);

        assert!(dash.toggle_time_range(4).unwrap());
        dash.update_time_range(4, "22:00", "06:30").unwrap();
        let stored = dash.time_ranges().into_iter().find(|r| r.id == 4).unwrap();
        assert!(stored.enabled);
        assert_eq!(stored.end_time.to_string(), "06:30");

        assert!(matches!(
            dash.update_time_range(4, "25:00", "06:00"),
            Err(DashboardError::InvalidTime(_))
        ));
        assert!(matches!(
            dash.toggle_time_range(42),
            Err(DashboardError::TimeRangeNotFound { id: 42 })
        ));

        dash.delete_time_range(4).unwrap();
        assert_eq!(dash.time_ranges().len(), 3);
        assert!(dash.delete_time_range(4).is_err());
    }

    #[test]
    fn search_ignores_case() {
        let cache = LocalCache::in_memory();
        let dash = dashboard(&cache, Arc::new(DisabledChannel));
        dash.update_lot(
            1,
            &LotEdit {
                name: Some("Central Garage".to_string()),
                ..LotEdit::default()
            },
        )
        .unwrap();

        let hits = dash.search("garage");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
        assert_eq!(dash.search("").len(), 3);
    }

    #[test]
    fn update_lot_only_touches_given_fields() {
        let cache = LocalCache::in_memory();
        let dash = dashboard(&cache, Arc::new(DisabledChannel));
        let before = dash.lots().remove(0);

        let after = dash
            .update_lot(
                before.id,
                &LotEdit {
                    fee: Some("무료".to_string()),
                    contact: Some("010-0000-0000".to_string()),
                    ..LotEdit::default()
                },
            )
            .unwrap();
        assert_eq!(after.fee, "무료");
        assert_eq!(after.contact, "010-0000-0000");
        assert_eq!(after.name, before.name);
        assert_eq!(after.address, before.address);
        assert_eq!(cache.lots()[0], after);
    }

    #[test]
    fn move_lot_records_position() {
        let cache = LocalCache::in_memory();
        let dash = dashboard(&cache, Arc::new(DisabledChannel));
        let now = Utc::now();

        let moved = dash.move_lot(2, 37.5, 126.7, now).unwrap();
        assert_eq!((moved.lat, moved.lng), (37.5, 126.7));
        let stored = cache.positions()[&2];
        assert_eq!((stored.lat, stored.lng), (37.5, 126.7));
        assert_eq!(stored.updated_at, now);
        assert!(dash.move_lot(99, 0.0, 0.0, now).is_err());
    }

    #[test]
    fn add_and_delete_lot() {
        let cache = LocalCache::in_memory();
        let dash = dashboard(&cache, Arc::new(DisabledChannel));
        dash.login("kim").unwrap();

        let lot = dash.add_lot(at(10, 0)).unwrap();
        assert_eq!(lot.id, 6);
        assert_eq!(lot.status, LotStatus::Moderate);
        assert_eq!(lot.total_spaces, 100);
        assert_eq!(lot.position(), FALLBACK_POSITION);
        assert_eq!(lot.last_updated, "2026-10-19 10:00:00");
        assert_eq!(dash.lots().len(), 4);

        dash.toggle_favorite(lot.id).unwrap();
        dash.move_lot(lot.id, 37.0, 127.0, Utc::now()).unwrap();
        dash.delete_lot(lot.id).unwrap();
        assert_eq!(dash.lots().len(), 3);
        assert!(dash.favorites().is_empty());
        assert!(cache.positions().is_empty());
        assert!(matches!(
            dash.delete_lot(lot.id),
            Err(DashboardError::LotNotFound { .. })
        ));
    }

    #[test]
    fn deleted_highest_id_is_not_reused() {
        let cache = LocalCache::in_memory();
        let dash = dashboard(&cache, Arc::new(DisabledChannel));

        let first = dash.add_lot(at(10, 0)).unwrap();
        assert_eq!(first.id, 6);
        dash.delete_lot(first.id).unwrap();

        let second = dash.add_lot(at(10, 1)).unwrap();
        assert_eq!(second.id, 7);

        dash.delete_lot(5).unwrap();
        dash.delete_lot(second.id).unwrap();
        assert_eq!(dash.add_lot(at(10, 2)).unwrap().id, 8);
    }

    #[test]
    fn since_filter_prefers_analysis_time() {
        let lot = LocalCache::in_memory().lots().remove(0);
        let since = HistoryFilter {
            since: Some(at(9, 0).with_timezone(&Utc)),
            ..HistoryFilter::default()
        };

        let mut entry = new_entry(&lot, "kim", at(12, 0));
        entry.data.analysis_time = "2026-10-19T00:30:00Z".to_string();
        assert_eq!(observed_at(&entry), Utc.with_ymd_and_hms(2026, 10, 19, 0, 30, 0).unwrap());

        entry.data.analysis_time = "2026-10-19 08:59:00".to_string();
        assert!(!since.matches(&entry), "analysed before the cut-off");

        entry.data.analysis_time = "2026-10-19 09:00:00".to_string();
        assert!(since.matches(&entry));

        entry.data.analysis_time = "not a time".to_string();
        assert_eq!(observed_at(&entry), entry.timestamp);
        assert!(since.matches(&entry));

        let mut early = new_entry(&lot, "kim", at(8, 0));
        early.data.analysis_time = String::new();
        assert!(!since.matches(&early));
    }

    #[test]
    fn reset_restores_builtin_dataset() {
        let cache = LocalCache::in_memory();
        let dash = dashboard(&cache, Arc::new(DisabledChannel));
        dash.delete_lot(1).unwrap();
        assert_eq!(dash.lots().len(), 2);

        dash.reset_to_default().unwrap();
        let ids: Vec<LotId> = dash.lots().iter().map(|lot| lot.id).collect();
        assert_eq!(ids, vec![1, 2, 5]);
    }

    #[tokio::test]
    async fn history_filters_combine() {
        let cache = LocalCache::in_memory();
        let dash = dashboard(&cache, Arc::new(DisabledChannel));
        assert!(matches!(
            dash.history(&HistoryFilter::default()).await,
            Err(DashboardError::NotLoggedIn)
        ));
        dash.login("kim").unwrap();

        let lots = cache.lots();
        for (lot, hour) in [(&lots[0], 8), (&lots[1], 9), (&lots[0], 13)] {
            cache.append_history(new_entry(lot, "kim", at(hour, 15))).unwrap();
        }

        let all = dash.history(&HistoryFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

        let lot_one = HistoryFilter {
            lot: Some(1),
            ..HistoryFilter::default()
        };
        assert_eq!(dash.history(&lot_one).await.unwrap().len(), 2);

        let morning = HistoryFilter {
            lot: Some(1),
            date: Some("2026-10-19".to_string()),
            time_prefix: Some("08".to_string()),
            since: None,
        };
        let hits = dash.history(&morning).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].time, "08:15:00");

        let since = HistoryFilter {
            since: Some(at(9, 0).with_timezone(&Utc)),
            ..HistoryFilter::default()
        };
        assert_eq!(dash.history(&since).await.unwrap().len(), 2);

        dash.clear_history().unwrap();
        assert!(dash.history(&HistoryFilter::default()).await.unwrap().is_empty());
    }
}
