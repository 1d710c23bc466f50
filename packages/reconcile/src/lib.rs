#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reconciliation of fetched lots with the cached snapshot.
//!
//! A fetch only carries what the backend knows. The user may have dragged
//! markers or typed in fees and contacts, and those edits must survive
//! every poll. [`reconcile_lots`] merges the two sources field by field
//! (see [`resolve`]) and always recomputes [`LotStatus`] from the
//! resolved ratio, since backend status names use a different taxonomy.

pub mod resolve;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Local};
use parking_monitor_cache::{CacheError, LocalCache};
use parking_monitor_lot_models::payload::RawLot;
use parking_monitor_lot_models::{LotId, LotRecord, LotStatus, StoredPosition};

/// Result of one reconciliation.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Snapshot as it was before this reconciliation.
    pub previous: Vec<LotRecord>,
    /// The new authoritative snapshot, already written to the cache.
    pub lots: Vec<LotRecord>,
}

/// Reads the previous snapshot from the cache, merges, and writes back.
#[derive(Debug, Clone)]
pub struct Reconciler {
    cache: LocalCache,
}

impl Reconciler {
    /// Creates a reconciler over `cache`.
    #[must_use]
    pub const fn new(cache: LocalCache) -> Self {
        Self { cache }
    }

    /// Merges `raw` with the cached snapshot and stores the result.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the new snapshot cannot be written.
    pub fn reconcile(
        &self,
        raw: &[RawLot],
        now: DateTime<Local>,
    ) -> Result<Reconciliation, CacheError> {
        let previous = self.cache.lots();
        let positions = self.cache.positions();
        let lots = reconcile_lots(raw, &previous, &positions, now);
        self.cache.set_lots(&lots)?;
        log::info!("Reconciled {} lots ({} before)", lots.len(), previous.len());
        Ok(Reconciliation { previous, lots })
    }
}

/// Merges fetched lots with the previous snapshot.
///
/// Output has one record per distinct parseable input id, in input order.
/// Unparseable ids and repeated ids are skipped with a warning.
#[must_use]
pub fn reconcile_lots(
    raw: &[RawLot],
    previous: &[LotRecord],
    positions: &BTreeMap<LotId, StoredPosition>,
    now: DateTime<Local>,
) -> Vec<LotRecord> {
    let by_id: BTreeMap<LotId, &LotRecord> = previous.iter().map(|lot| (lot.id, lot)).collect();
    let mut seen = BTreeSet::new();

    raw.iter()
        .filter_map(|lot| {
            let Some(id) = lot.lot_id() else {
                log::warn!("Skipping lot with invalid id {:?}", lot.id);
                return None;
            };
            if !seen.insert(id) {
                log::warn!("Skipping duplicate lot id {id}");
                return None;
            }
            Some(reconcile_lot(
                id,
                lot,
                by_id.get(&id).copied(),
                positions.get(&id),
                now,
            ))
        })
        .collect()
}

/// Merges one fetched lot with its cached record and stored position.
#[must_use]
pub fn reconcile_lot(
    id: LotId,
    raw: &RawLot,
    cached: Option<&LotRecord>,
    stored: Option<&StoredPosition>,
    now: DateTime<Local>,
) -> LotRecord {
    let status = raw.current_status.as_ref();
    let position = resolve::position(stored, cached, raw);
    let empty_ratio = resolve::empty_ratio(raw, cached);

    LotRecord {
        id,
        name: resolve::name(raw, cached, id),
        lat: position.lat,
        lng: position.lng,
        status: LotStatus::from_ratio_str(&empty_ratio),
        empty_spaces: resolve::empty_spaces(status, cached),
        occupied_spaces: resolve::occupied_spaces(status, cached),
        total_spaces: resolve::total_spaces(raw, cached),
        empty_ratio,
        image_url: resolve::image_url(status, cached),
        analysis_time: resolve::analysis_time(status, cached),
        address: resolve::address(raw, cached),
        fee: resolve::fee(cached),
        open_time: resolve::open_time(cached),
        last_updated: resolve::last_updated(raw, cached, now),
        contact: resolve::contact(cached),
    }
}
