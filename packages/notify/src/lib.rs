#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Change detection for reconciled lots.
//!
//! After every reconciliation the [`ChangeNotifier`] compares the new
//! snapshot with the previous one. A lot whose snapshot image appeared or
//! changed triggers two independent actions:
//!
//! 1. a [`HistoryEntry`] for the logged-in user, and
//! 2. an [`Alert`], only when notifications are granted, the current time
//!    is inside an enabled window (or none is enabled), and the lot is a
//!    favorite.
//!
//! Suppressing the alert never suppresses the history entry. The only
//! dedup state is the previous image URL, so an image that flips between
//! two values retriggers on every poll.

pub mod alert;
pub mod channel;
pub mod history;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Local};
use parking_monitor_cache::{CacheError, LocalCache};
use parking_monitor_lot_models::{
    HistoryEntry, LotId, LotRecord, MinuteOfDay, NotificationPermission, NotificationTimeRange,
};

pub use alert::{Alert, AlertBanner, compose_alert, favorite_added};
pub use channel::{ConsoleChannel, DisabledChannel, NotificationChannel};
pub use history::{FallbackHistoryStore, HistoryStore, LocalHistoryStore};

/// Errors that can occur while recording history.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Local cache failure.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// The history store rejected the operation.
    #[error("History store error: {message}")]
    Store {
        /// Description of what went wrong.
        message: String,
    },
}

/// What one notifier pass produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyOutcome {
    /// Entries written, in lot order.
    pub history: Vec<HistoryEntry>,
    /// Alerts raised, in lot order.
    pub alerts: Vec<Alert>,
}

/// Whether `lot` shows a snapshot image that `previous` did not.
#[must_use]
pub fn image_changed(previous: Option<&LotRecord>, lot: &LotRecord) -> bool {
    !lot.image_url.is_empty() && previous.is_none_or(|old| old.image_url != lot.image_url)
}

/// Whether alerts are allowed at `minute`.
///
/// True when no range is enabled, or when an enabled range contains it.
#[must_use]
pub fn is_within_notification_time(ranges: &[NotificationTimeRange], minute: MinuteOfDay) -> bool {
    let mut enabled = ranges.iter().filter(|r| r.enabled).peekable();
    if enabled.peek().is_none() {
        return true;
    }
    enabled.any(|r| r.contains(minute))
}

/// Records history and raises alerts for changed lots.
pub struct ChangeNotifier {
    cache: LocalCache,
    history: Arc<dyn HistoryStore>,
    channel: Arc<dyn NotificationChannel>,
    banner: Mutex<AlertBanner>,
}

impl ChangeNotifier {
    /// Creates a notifier reading user state from `cache`.
    #[must_use]
    pub fn new(
        cache: LocalCache,
        history: Arc<dyn HistoryStore>,
        channel: Arc<dyn NotificationChannel>,
    ) -> Self {
        Self {
            cache,
            history,
            channel,
            banner: Mutex::new(AlertBanner::new()),
        }
    }

    /// The alert currently on the in-app banner.
    #[must_use]
    pub fn visible_alert(&self) -> Option<Alert> {
        self.lock_banner().visible(Instant::now()).cloned()
    }

    /// Dismisses the in-app banner.
    pub fn dismiss_alert(&self) -> Option<Alert> {
        self.lock_banner().dismiss()
    }

    fn lock_banner(&self) -> std::sync::MutexGuard<'_, AlertBanner> {
        self.banner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Compares `lots` with `previous` and acts on changed images.
    ///
    /// Session, favorites, and time windows are read from the cache on
    /// every call. History write failures are logged and skipped.
    pub async fn process(
        &self,
        previous: &[LotRecord],
        lots: &[LotRecord],
        now: DateTime<Local>,
    ) -> NotifyOutcome {
        let mut outcome = NotifyOutcome::default();

        let session = self.cache.session();
        let Some(username) = session.active_user() else {
            log::debug!("Not logged in, skipping change detection");
            return outcome;
        };

        let alerts_allowed = session.notification_permission == NotificationPermission::Granted
            && is_within_notification_time(&self.cache.time_ranges(), MinuteOfDay::of(&now));
        if !alerts_allowed {
            log::debug!(
                "Alerts suppressed (permission: {}, or outside notification window)",
                session.notification_permission
            );
        }
        let favorites = self.cache.favorites();

        let by_id: BTreeMap<LotId, &LotRecord> = previous.iter().map(|lot| (lot.id, lot)).collect();

        for lot in lots {
            let old = by_id.get(&lot.id).copied();
            if !image_changed(old, lot) {
                continue;
            }

            log::info!("New image for {} ({})", lot.name, lot.id);
            match self
                .history
                .append(history::new_entry(lot, username, now))
                .await
            {
                Ok(entry) => outcome.history.push(entry),
                Err(e) => log::error!("Failed to record history for lot {}: {e}", lot.id),
            }

            if alerts_allowed && favorites.contains(&lot.id) {
                let alert = compose_alert(old, lot);
                self.channel.show(&alert);
                self.lock_banner().show(alert.clone(), Instant::now());
                outcome.alerts.push(alert);
            }
        }

        outcome
    }
}
