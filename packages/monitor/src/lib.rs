#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Polling loop and user operations for the parking monitor.
//!
//! [`Monitor`] drives the fetch → reconcile → notify cycle on a fixed
//! interval. Fetches run as spawned tasks and report back over a channel
//! to the loop, which is the only place the lot snapshot is rewritten.
//! Each completion carries the sequence number it was issued with; a
//! completion older than the last applied one is dropped.
//!
//! [`dashboard::Dashboard`] exposes the user-facing operations (session,
//! favorites, time windows, lot edits, history) over the same cache.

pub mod config;
pub mod dashboard;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use parking_monitor_cache::{CacheError, LocalCache};
use parking_monitor_fetcher::{FetchError, LotSource, RequestSequencer};
use parking_monitor_lot_models::LotRecord;
use parking_monitor_lot_models::payload::RawLot;
use parking_monitor_notify::ChangeNotifier;
use parking_monitor_reconcile::Reconciler;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

/// Default polling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Errors that can occur during a poll cycle.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The backend could not be read.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The new snapshot could not be stored.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// A newer response was applied while this one was in flight.
    #[error("Response #{sequence} is stale (latest applied #{latest})")]
    Stale {
        /// Sequence number of the discarded response.
        sequence: u64,
        /// Sequence number of the newest applied response.
        latest: u64,
    },
}

/// Summary of one applied cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Sequence number of the applied fetch.
    pub sequence: u64,
    /// Lots in the new snapshot.
    pub lots: usize,
    /// History entries written.
    pub history: usize,
    /// Alerts raised.
    pub alerts: usize,
}

type Completion = (u64, Result<Vec<RawLot>, FetchError>);

/// Periodic fetch → reconcile → notify driver.
pub struct Monitor {
    source: Arc<dyn LotSource>,
    reconciler: Reconciler,
    notifier: Arc<ChangeNotifier>,
    sequencer: RequestSequencer,
    interval: Duration,
    snapshot: watch::Sender<Vec<LotRecord>>,
}

impl Monitor {
    /// Creates a monitor. Subscribers start with the cached snapshot.
    #[must_use]
    pub fn new(
        source: Arc<dyn LotSource>,
        cache: LocalCache,
        notifier: Arc<ChangeNotifier>,
        interval: Duration,
    ) -> Self {
        let (snapshot, _) = watch::channel(cache.lots());
        Self {
            source,
            reconciler: Reconciler::new(cache),
            notifier,
            sequencer: RequestSequencer::new(),
            interval,
            snapshot,
        }
    }

    /// Receives every applied snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<LotRecord>> {
        self.snapshot.subscribe()
    }

    /// Runs one cycle to completion.
    ///
    /// # Errors
    ///
    /// * If the fetch fails
    /// * If the new snapshot cannot be written
    /// * If a newer response was applied while this one was in flight
    pub async fn poll_once(&self) -> Result<CycleReport, MonitorError> {
        let sequence = self.sequencer.issue();
        let raw = self.source.fetch().await?;
        self.apply(sequence, &raw, Local::now()).await
    }

    /// Polls until `shutdown` resolves.
    ///
    /// A failed or stale cycle is logged and the next tick retries. Fetches
    /// still in flight at shutdown are abandoned.
    pub async fn run<F: Future<Output = ()> + Send>(&self, shutdown: F) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        log::info!(
            "Polling {} every {:?}",
            self.source.endpoint(),
            self.interval
        );

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    log::info!("Shutting down polling loop");
                    break;
                }
                _ = ticker.tick() => {
                    let sequence = self.sequencer.issue();
                    let source = Arc::clone(&self.source);
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let result = source.fetch().await;
                        if tx.send((sequence, result)).is_err() {
                            log::debug!("Dropping fetch #{sequence}, loop has stopped");
                        }
                    });
                }
                Some((sequence, result)) = rx.recv() => {
                    self.complete(sequence, result).await;
                }
            }
        }
    }

    async fn complete(&self, sequence: u64, result: Result<Vec<RawLot>, FetchError>) {
        let outcome = match result {
            Ok(raw) => self.apply(sequence, &raw, Local::now()).await,
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(report) => log::debug!("Cycle #{sequence} applied: {report:?}"),
            Err(e @ MonitorError::Stale { .. }) => log::debug!("{e}"),
            Err(e) => log::warn!("Cycle #{sequence} failed, keeping previous lots: {e}"),
        }
    }

    async fn apply(
        &self,
        sequence: u64,
        raw: &[RawLot],
        now: DateTime<Local>,
    ) -> Result<CycleReport, MonitorError> {
        if !self.sequencer.try_apply(sequence) {
            return Err(MonitorError::Stale {
                sequence,
                latest: self.sequencer.latest_applied(),
            });
        }

        let reconciliation = self.reconciler.reconcile(raw, now)?;
        let outcome = self
            .notifier
            .process(&reconciliation.previous, &reconciliation.lots, now)
            .await;

        let report = CycleReport {
            sequence,
            lots: reconciliation.lots.len(),
            history: outcome.history.len(),
            alerts: outcome.alerts.len(),
        };
        self.snapshot.send_replace(reconciliation.lots);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use parking_monitor_lot_models::payload::ParkingListResponse;
    use parking_monitor_lot_models::{NotificationPermission, SessionState};
    use parking_monitor_notify::{DisabledChannel, LocalHistoryStore};

    use super::*;

    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<Vec<RawLot>, FetchError>>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Vec<RawLot>, FetchError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl LotSource for ScriptedSource {
        fn endpoint(&self) -> &str {
            "scripted"
        }

        async fn fetch(&self) -> Result<Vec<RawLot>, FetchError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FetchError::Unsuccessful))
        }
    }

    fn raw(body: serde_json::Value) -> Vec<RawLot> {
        serde_json::from_value::<ParkingListResponse>(body)
            .unwrap()
            .into_lots()
            .unwrap()
    }

    fn with_image(url: &str) -> Vec<RawLot> {
        raw(serde_json::json!({
            "success": true,
            "data": [{"id": 1, "name": "a", "currentStatus": {"emptyRatio": 60, "imageUrl": url}}]
        }))
    }

    fn monitor(cache: &LocalCache, responses: Vec<Result<Vec<RawLot>, FetchError>>) -> Monitor {
        let notifier = ChangeNotifier::new(
            cache.clone(),
            Arc::new(LocalHistoryStore::new(cache.clone())),
            Arc::new(DisabledChannel),
        );
        Monitor::new(
            Arc::new(ScriptedSource::new(responses)),
            cache.clone(),
            Arc::new(notifier),
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn poll_once_reconciles_and_publishes() {
        let cache = LocalCache::in_memory();
        let monitor = monitor(&cache, vec![Ok(with_image("https://img/1"))]);
        let rx = monitor.subscribe();
        assert_eq!(rx.borrow().len(), 3, "starts from the built-in dataset");

        let report = monitor.poll_once().await.unwrap();
        assert_eq!(report.sequence, 1);
        assert_eq!(report.lots, 1);
        assert_eq!(rx.borrow()[0].image_url, "https://img/1");
        assert_eq!(cache.lots(), *rx.borrow());
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_lots() {
        let cache = LocalCache::in_memory();
        let monitor = monitor(
            &cache,
            vec![Ok(with_image("https://img/1")), Err(FetchError::Unsuccessful)],
        );
        monitor.poll_once().await.unwrap();
        let before = cache.lots();

        let err = monitor.poll_once().await.unwrap_err();
        assert!(matches!(err, MonitorError::Fetch(FetchError::Unsuccessful)));
        assert_eq!(cache.lots(), before);
    }

    #[tokio::test]
    async fn stale_completion_is_discarded() {
        let cache = LocalCache::in_memory();
        let monitor = monitor(&cache, vec![]);
        let older = monitor.sequencer.issue();
        let newer = monitor.sequencer.issue();

        monitor
            .apply(newer, &with_image("https://img/new"), Local::now())
            .await
            .unwrap();
        let err = monitor
            .apply(older, &with_image("https://img/old"), Local::now())
            .await
            .unwrap_err();

        assert!(matches!(err, MonitorError::Stale { sequence, latest } if sequence == older && latest == newer));
        assert_eq!(cache.lots()[0].image_url, "https://img/new");
    }

    #[tokio::test]
    async fn cycle_records_history_for_logged_in_user() {
        let cache = LocalCache::in_memory();
        cache
            .set_session(&SessionState {
                is_logged_in: true,
                username: "kim".to_string(),
                notification_permission: NotificationPermission::Denied,
            })
            .unwrap();
        let monitor = monitor(
            &cache,
            vec![Ok(with_image("https://img/1")), Ok(with_image("https://img/1"))],
        );

        assert_eq!(monitor.poll_once().await.unwrap().history, 1);
        assert_eq!(monitor.poll_once().await.unwrap().history, 0);
        assert_eq!(cache.history("kim").len(), 1);
    }

    #[tokio::test]
    async fn run_applies_ticks_until_shutdown() {
        let cache = LocalCache::in_memory();
        let monitor = monitor(
            &cache,
            vec![Err(FetchError::Unsuccessful), Ok(with_image("https://img/1"))],
        );
        let mut rx = monitor.subscribe();

        monitor
            .run(async move {
                rx.changed().await.unwrap();
            })
            .await;

        assert_eq!(cache.lots()[0].image_url, "https://img/1");
        assert!(monitor.sequencer.latest_issued() >= 2);
    }
}
