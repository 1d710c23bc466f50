//! Built-in dataset used when the cache is empty or unreadable.
//!
//! The dataset is a TOML file embedded at compile time, so a missing or
//! corrupt cache never leaves the monitor without lots to show.

use chrono::{DateTime, Local};
use parking_monitor_lot_models::{
    LotId, LotRecord, LotStatus, MinuteOfDay, NotificationTimeRange,
};
use serde::Deserialize;

/// Format used for human-readable `lastUpdated` stamps.
pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATASET_TOML: &str = include_str!("../defaults/dataset.toml");

#[derive(Debug, Deserialize)]
struct Dataset {
    lots: Vec<DefaultLot>,
    time_ranges: Vec<DefaultTimeRange>,
}

#[derive(Debug, Deserialize)]
struct DefaultLot {
    id: LotId,
    name: String,
    lat: f64,
    lng: f64,
    address: String,
    fee: String,
    open_time: String,
    contact: String,
}

#[derive(Debug, Deserialize)]
struct DefaultTimeRange {
    id: u32,
    start_time: MinuteOfDay,
    end_time: MinuteOfDay,
    enabled: bool,
}

/// Parses the embedded dataset.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (this is a compile-time guarantee
/// since the file is embedded).
fn dataset() -> Dataset {
    toml::de::from_str(DATASET_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded dataset.toml: {e}"))
}

/// Returns the default lots, stamped with `now` and no occupancy data.
#[must_use]
pub fn default_lots(now: DateTime<Local>) -> Vec<LotRecord> {
    let stamp = now.format(DISPLAY_TIME_FORMAT).to_string();
    dataset()
        .lots
        .into_iter()
        .map(|lot| LotRecord {
            id: lot.id,
            name: lot.name,
            lat: lot.lat,
            lng: lot.lng,
            status: LotStatus::Unknown,
            empty_spaces: 0,
            occupied_spaces: 0,
            total_spaces: 0,
            empty_ratio: "0".to_string(),
            image_url: String::new(),
            analysis_time: String::new(),
            address: lot.address,
            fee: lot.fee,
            open_time: lot.open_time,
            last_updated: stamp.clone(),
            contact: lot.contact,
        })
        .collect()
}

/// Returns the default notification windows (all disabled).
#[must_use]
pub fn default_time_ranges() -> Vec<NotificationTimeRange> {
    dataset()
        .time_ranges
        .into_iter()
        .map(|range| NotificationTimeRange {
            id: range.id,
            start_time: range.start_time,
            end_time: range.end_time,
            enabled: range.enabled,
        })
        .collect()
}
