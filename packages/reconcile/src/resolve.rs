//! Per-field resolution chains.
//!
//! Each function picks the first present candidate in a fixed order. Empty
//! strings and zero coordinates count as missing. Backend data wins for
//! occupancy; cached data wins for everything the user can edit.

use chrono::{DateTime, Local};
use parking_monitor_cache::defaults::DISPLAY_TIME_FORMAT;
use parking_monitor_lot_models::payload::{RawCurrentStatus, RawLot, RawRatio};
use parking_monitor_lot_models::{LotId, LotRecord, Position, StoredPosition};

/// Position used when neither the user nor the backend supplied one.
pub const FALLBACK_POSITION: Position = Position {
    lat: 37.4746,
    lng: 126.6499,
};

/// Address shown when none is known.
pub const DEFAULT_ADDRESS: &str = "주소 정보 없음";
/// Fee shown when none was entered.
pub const DEFAULT_FEE: &str = "시간당 1,000원";
/// Opening hours shown when none were entered.
pub const DEFAULT_OPEN_TIME: &str = "24시간";
/// Contact shown when none was entered.
pub const DEFAULT_CONTACT: &str = "032-123-4567";

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

fn first_text<'a, const N: usize>(candidates: [Option<&'a str>; N]) -> Option<&'a str> {
    candidates.into_iter().find_map(non_empty)
}

/// Stored override → cached lot → backend `latitude/longitude` → backend
/// `lat/lng` → [`FALLBACK_POSITION`].
#[must_use]
pub fn position(
    stored: Option<&StoredPosition>,
    cached: Option<&LotRecord>,
    raw: &RawLot,
) -> Position {
    let from_pair = |lat: Option<f64>, lng: Option<f64>| {
        lat.zip(lng)
            .and_then(|(lat, lng)| Position::non_zero(lat, lng))
    };

    stored
        .and_then(|p| Position::non_zero(p.lat, p.lng))
        .or_else(|| cached.and_then(|c| Position::non_zero(c.lat, c.lng)))
        .or_else(|| from_pair(raw.latitude, raw.longitude))
        .or_else(|| from_pair(raw.lat, raw.lng))
        .unwrap_or(FALLBACK_POSITION)
}

/// Backend → cached → 0.
#[must_use]
pub fn empty_spaces(status: Option<&RawCurrentStatus>, cached: Option<&LotRecord>) -> u32 {
    status
        .and_then(|s| s.empty_spaces)
        .or_else(|| cached.map(|c| c.empty_spaces))
        .unwrap_or(0)
}

/// Backend → cached → 0.
#[must_use]
pub fn occupied_spaces(status: Option<&RawCurrentStatus>, cached: Option<&LotRecord>) -> u32 {
    status
        .and_then(|s| s.occupied_spaces)
        .or_else(|| cached.map(|c| c.occupied_spaces))
        .unwrap_or(0)
}

/// Capacity reported by the backend, if non-zero.
fn backend_total(raw: &RawLot) -> Option<u32> {
    raw.current_status
        .as_ref()
        .and_then(|s| s.total_spaces)
        .filter(|&n| n > 0)
        .or_else(|| raw.total_spaces.filter(|&n| n > 0))
}

/// Backend status block → backend top level → cached → 0. Zero counts as
/// missing for the backend candidates.
#[must_use]
pub fn total_spaces(raw: &RawLot, cached: Option<&LotRecord>) -> u32 {
    backend_total(raw)
        .or_else(|| cached.map(|c| c.total_spaces))
        .unwrap_or(0)
}

/// Backend ratio → ratio recomputed from backend counts → cached → `"0"`.
#[must_use]
pub fn empty_ratio(raw: &RawLot, cached: Option<&LotRecord>) -> String {
    let status = raw.current_status.as_ref();

    if let Some(ratio) = status
        .and_then(|s| s.empty_ratio.as_ref())
        .and_then(RawRatio::to_ratio_string)
    {
        return ratio;
    }

    if let (Some(empty), Some(total)) =
        (status.and_then(|s| s.empty_spaces), backend_total(raw))
    {
        return format!("{:.1}", f64::from(empty) * 100.0 / f64::from(total));
    }

    first_text([cached.map(|c| c.empty_ratio.as_str())])
        .map_or_else(|| "0".to_string(), String::from)
}

/// Backend → cached → empty.
#[must_use]
pub fn image_url(status: Option<&RawCurrentStatus>, cached: Option<&LotRecord>) -> String {
    first_text([
        status.and_then(|s| s.image_url.as_deref()),
        cached.map(|c| c.image_url.as_str()),
    ])
    .unwrap_or_default()
    .to_string()
}

/// Backend `updatedAt` → backend `timestamp` → cached → empty.
#[must_use]
pub fn analysis_time(status: Option<&RawCurrentStatus>, cached: Option<&LotRecord>) -> String {
    first_text([
        status.and_then(|s| s.updated_at.as_deref()),
        status.and_then(|s| s.timestamp.as_deref()),
        cached.map(|c| c.analysis_time.as_str()),
    ])
    .unwrap_or_default()
    .to_string()
}

/// Cached → backend → [`DEFAULT_ADDRESS`].
#[must_use]
pub fn address(raw: &RawLot, cached: Option<&LotRecord>) -> String {
    first_text([cached.map(|c| c.address.as_str()), raw.address.as_deref()])
        .unwrap_or(DEFAULT_ADDRESS)
        .to_string()
}

/// Cached → [`DEFAULT_FEE`].
#[must_use]
pub fn fee(cached: Option<&LotRecord>) -> String {
    first_text([cached.map(|c| c.fee.as_str())])
        .unwrap_or(DEFAULT_FEE)
        .to_string()
}

/// Cached → [`DEFAULT_OPEN_TIME`].
#[must_use]
pub fn open_time(cached: Option<&LotRecord>) -> String {
    first_text([cached.map(|c| c.open_time.as_str())])
        .unwrap_or(DEFAULT_OPEN_TIME)
        .to_string()
}

/// Cached → [`DEFAULT_CONTACT`].
#[must_use]
pub fn contact(cached: Option<&LotRecord>) -> String {
    first_text([cached.map(|c| c.contact.as_str())])
        .unwrap_or(DEFAULT_CONTACT)
        .to_string()
}

/// Backend → cached → `now`.
#[must_use]
pub fn last_updated(raw: &RawLot, cached: Option<&LotRecord>, now: DateTime<Local>) -> String {
    first_text([
        raw.last_updated.as_deref(),
        cached.map(|c| c.last_updated.as_str()),
    ])
    .map_or_else(|| now.format(DISPLAY_TIME_FORMAT).to_string(), String::from)
}

/// Backend → cached → `"주차장 {id}"`.
#[must_use]
pub fn name(raw: &RawLot, cached: Option<&LotRecord>, id: LotId) -> String {
    first_text([raw.name.as_deref(), cached.map(|c| c.name.as_str())])
        .map_or_else(|| format!("주차장 {id}"), String::from)
}
