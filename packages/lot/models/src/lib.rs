#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parking lot data model shared across the monitor workspace.
//!
//! Defines the reconciled [`LotRecord`] snapshot, the coarse
//! [`LotStatus`] classification derived from an occupancy ratio, per-user
//! [`HistoryEntry`] records, session state, and notification time
//! windows. Raw backend payload types live in [`payload`].

pub mod payload;
pub mod time_range;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use time_range::{InvalidTimeError, MinuteOfDay, NotificationTimeRange};

/// Stable identifier of a parking lot.
pub type LotId = u32;

/// Lot ids the logged-in user marked as favorites.
pub type FavoriteSet = BTreeSet<LotId>;

/// Ratio at or below which a lot is considered congested.
pub const CONGESTED_MAX_RATIO: f64 = 20.0;

/// Ratio at or below which a lot is considered moderately occupied.
pub const MODERATE_MAX_RATIO: f64 = 50.0;

/// Coarse occupancy classification of a lot.
///
/// Serialized using the Korean labels the dashboard displays.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum LotStatus {
    /// Plenty of free spaces.
    #[serde(rename = "여유")]
    #[strum(serialize = "여유")]
    Plenty,
    /// Moderately occupied.
    #[serde(rename = "보통")]
    #[strum(serialize = "보통")]
    Moderate,
    /// Few spaces left.
    #[serde(rename = "혼잡")]
    #[strum(serialize = "혼잡")]
    Congested,
    /// No spaces left. Only present in older cached snapshots.
    #[serde(rename = "만차")]
    #[strum(serialize = "만차")]
    Full,
    /// No occupancy data.
    #[default]
    #[serde(rename = "정보 없음")]
    #[strum(serialize = "정보 없음")]
    Unknown,
}

impl LotStatus {
    /// Classifies an empty-space percentage.
    ///
    /// Boundaries are inclusive on the busier side: `20` is congested and
    /// `50` is moderate. Non-finite ratios are [`Self::Unknown`].
    #[must_use]
    pub fn from_ratio(ratio: f64) -> Self {
        if !ratio.is_finite() {
            Self::Unknown
        } else if ratio <= CONGESTED_MAX_RATIO {
            Self::Congested
        } else if ratio <= MODERATE_MAX_RATIO {
            Self::Moderate
        } else {
            Self::Plenty
        }
    }

    /// Classifies a percentage string such as `"45.5"` or `"45.5%"`.
    #[must_use]
    pub fn from_ratio_str(ratio: &str) -> Self {
        ratio
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .map_or(Self::Unknown, Self::from_ratio)
    }

    /// Emoji shown in alert titles.
    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Plenty => "🟢",
            Self::Moderate => "🟡",
            Self::Congested | Self::Full => "🔴",
            Self::Unknown => "🔵",
        }
    }

    /// Marker/label colour as a hex string.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Plenty => "#34a853",
            Self::Moderate => "#fbbc04",
            Self::Congested | Self::Full => "#ea4335",
            Self::Unknown => "#4285f4",
        }
    }
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

impl Position {
    /// Returns the position unless either coordinate is zero or not finite.
    #[must_use]
    pub fn non_zero(lat: f64, lng: f64) -> Option<Self> {
        if lat == 0.0 || lng == 0.0 || !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        Some(Self { lat, lng })
    }
}

/// A user-set marker position, persisted independently of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPosition {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// When the user last moved the marker.
    pub updated_at: DateTime<Utc>,
}

/// One parking lot as held in the local snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotRecord {
    /// Unique lot id.
    pub id: LotId,
    /// Display name.
    pub name: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Classification derived from `empty_ratio`.
    #[serde(default)]
    pub status: LotStatus,
    /// Free spaces.
    #[serde(default)]
    pub empty_spaces: u32,
    /// Occupied spaces.
    #[serde(default)]
    pub occupied_spaces: u32,
    /// Capacity.
    #[serde(default)]
    pub total_spaces: u32,
    /// Free-space percentage, as text.
    #[serde(default)]
    pub empty_ratio: String,
    /// Latest snapshot image, empty when none.
    #[serde(default)]
    pub image_url: String,
    /// When the backend last analysed the snapshot image.
    #[serde(default)]
    pub analysis_time: String,
    /// Street address.
    #[serde(default)]
    pub address: String,
    /// Fee description.
    #[serde(default)]
    pub fee: String,
    /// Opening hours.
    #[serde(default)]
    pub open_time: String,
    /// When this record was last refreshed.
    #[serde(default)]
    pub last_updated: String,
    /// Contact phone number.
    #[serde(default)]
    pub contact: String,
}

impl LotRecord {
    /// Current marker position.
    #[must_use]
    pub const fn position(&self) -> Position {
        Position {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// Occupancy figures captured alongside a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancySnapshot {
    /// Free spaces.
    pub empty_spaces: u32,
    /// Capacity.
    pub total_spaces: u32,
    /// Free-space percentage, as text.
    pub empty_ratio: String,
    /// When the backend analysed the image.
    pub analysis_time: String,
}

impl From<&LotRecord> for OccupancySnapshot {
    fn from(lot: &LotRecord) -> Self {
        Self {
            empty_spaces: lot.empty_spaces,
            total_spaces: lot.total_spaces,
            empty_ratio: lot.empty_ratio.clone(),
            analysis_time: lot.analysis_time.clone(),
        }
    }
}

/// An observed image change for one lot, scoped to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Entry id.
    pub id: String,
    /// Lot the entry belongs to.
    pub parking_id: LotId,
    /// Lot name at the time of the change.
    pub parking_name: String,
    /// The new snapshot image.
    pub image_url: String,
    /// Status at the time of the change.
    pub status: LotStatus,
    /// Occupancy at the time of the change.
    pub data: OccupancySnapshot,
    /// Owner of the entry.
    pub username: String,
    /// When the change was observed.
    pub timestamp: DateTime<Utc>,
    /// Local date for display (`YYYY-MM-DD`).
    pub date: String,
    /// Local time for display (`HH:MM:SS`).
    pub time: String,
}

/// Whether the user allowed notifications.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationPermission {
    /// Not asked yet.
    #[default]
    Default,
    /// Allowed.
    Granted,
    /// Refused.
    Denied,
    /// No notification channel is available.
    Unsupported,
}

/// Login state of the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Whether a user is logged in.
    pub is_logged_in: bool,
    /// Plaintext username, empty when logged out.
    #[serde(default)]
    pub username: String,
    /// Notification permission for this installation.
    #[serde(default)]
    pub notification_permission: NotificationPermission,
}

impl SessionState {
    /// Username of the logged-in user, if any.
    #[must_use]
    pub fn active_user(&self) -> Option<&str> {
        (self.is_logged_in && !self.username.is_empty()).then_some(self.username.as_str())
    }
}
