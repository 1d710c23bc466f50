//! Wire types for the backend `GET /parking/list` response.
//!
//! Every field is optional; the reconciler decides what to do with missing
//! values. Lots are decoded one at a time so a single malformed entry is
//! skipped without hiding the rest of the list. Numeric fields accept
//! integers, integral floats, and numeric strings; anything else reads as
//! absent.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::LotId;

/// Top-level list response: `{ success, data: [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParkingListResponse {
    /// Success marker set by the backend.
    #[serde(default)]
    pub success: bool,
    /// The lots, undecoded, when the request succeeded.
    #[serde(default)]
    pub data: Option<Vec<Value>>,
}

impl ParkingListResponse {
    /// Returns the lots if the response carries usable data. Entries that
    /// are not lot objects are skipped with a warning.
    #[must_use]
    pub fn into_lots(self) -> Option<Vec<RawLot>> {
        if !self.success {
            return None;
        }

        let lots = self
            .data?
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value::<RawLot>(value) {
                Ok(lot) => Some(lot),
                Err(e) => {
                    log::warn!("Skipping malformed lot at index {index}: {e}");
                    None
                }
            })
            .collect();
        Some(lots)
    }
}

/// Lot id as sent by the backend: a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    /// JSON integer.
    Integer(i64),
    /// JSON float; only integral values are usable.
    Float(f64),
    /// JSON string.
    Text(String),
}

impl RawId {
    /// Converts to a [`LotId`], or `None` if out of range or not integral.
    #[must_use]
    pub fn to_lot_id(&self) -> Option<LotId> {
        match self {
            Self::Integer(n) => LotId::try_from(*n).ok(),
            Self::Float(f) => integral(*f),
            Self::Text(s) => {
                let s = s.trim();
                s.parse()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral))
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn integral(value: f64) -> Option<u32> {
    (value.is_finite() && value.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&value))
        .then(|| value as u32)
}

fn count_from_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(integral),
        _ => None,
    }
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(count_from_value))
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<RawId>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Free-space ratio as sent by the backend: a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRatio {
    /// JSON number.
    Number(f64),
    /// JSON string.
    Text(String),
}

impl RawRatio {
    /// Textual form used in the snapshot: numbers without trailing zeros,
    /// strings verbatim. Empty strings yield `None`.
    #[must_use]
    pub fn to_ratio_string(&self) -> Option<String> {
        match self {
            Self::Number(n) if n.is_finite() => Some(n.to_string()),
            Self::Number(_) => None,
            Self::Text(s) if s.trim().is_empty() => None,
            Self::Text(s) => Some(s.clone()),
        }
    }
}

fn lenient_ratio<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<RawRatio>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Occupancy block computed by the backend's image analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCurrentStatus {
    /// Free spaces.
    #[serde(default, deserialize_with = "lenient_count")]
    pub empty_spaces: Option<u32>,
    /// Occupied spaces.
    #[serde(default, deserialize_with = "lenient_count")]
    pub occupied_spaces: Option<u32>,
    /// Capacity.
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_spaces: Option<u32>,
    /// Free-space percentage.
    #[serde(default, deserialize_with = "lenient_ratio")]
    pub empty_ratio: Option<RawRatio>,
    /// Analysed snapshot image.
    pub image_url: Option<String>,
    /// When the analysis ran.
    pub updated_at: Option<String>,
    /// Alternative name for `updated_at` used by older backends.
    pub timestamp: Option<String>,
}

/// One lot as sent by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLot {
    /// Lot id; `None` when missing, `null`, or of an unusable type.
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<RawId>,
    /// Display name.
    pub name: Option<String>,
    /// Latitude.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    /// Longitude.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    /// Latitude, short form.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    /// Longitude, short form.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lng: Option<f64>,
    /// Latest analysis result.
    pub current_status: Option<RawCurrentStatus>,
    /// Capacity outside the status block.
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_spaces: Option<u32>,
    /// Street address.
    pub address: Option<String>,
    /// When the backend last touched this lot.
    pub last_updated: Option<String>,
}

impl RawLot {
    /// The lot id, if present and usable.
    #[must_use]
    pub fn lot_id(&self) -> Option<LotId> {
        self.id.as_ref().and_then(RawId::to_lot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_and_string_ids() {
        let body = serde_json::json!({
            "success": true,
            "data": [
                {"id": 1, "name": "A"},
                {"id": "2", "name": "B", "currentStatus": {"emptyRatio": "33.3"}},
                {"id": -4}
            ]
        });
        let resp: ParkingListResponse = serde_json::from_value(body).unwrap();
        let lots = resp.into_lots().unwrap();
        assert_eq!(lots[0].lot_id(), Some(1));
        assert_eq!(lots[1].lot_id(), Some(2));
        assert_eq!(lots[2].lot_id(), None);
    }

    #[test]
    fn one_bad_lot_does_not_hide_the_others() {
        let body = serde_json::json!({
            "success": true,
            "data": [
                {"id": 1, "name": "A", "currentStatus": {"emptySpaces": 4, "totalSpaces": 10}},
                {"id": null, "name": "no id"},
                {"id": 2, "currentStatus": {"emptySpaces": 12.0, "totalSpaces": "20"}},
                {"id": 3.0, "latitude": "37.5", "longitude": 126.7},
                {"name": "missing id"},
                "not a lot",
                {"id": 4, "currentStatus": "broken"}
            ]
        });
        let resp: ParkingListResponse = serde_json::from_value(body).unwrap();
        let lots = resp.into_lots().unwrap();

        let ids: Vec<Option<LotId>> = lots.iter().map(RawLot::lot_id).collect();
        assert_eq!(ids, vec![Some(1), None, Some(2), Some(3), None]);

        let status = lots[2].current_status.as_ref().unwrap();
        assert_eq!(status.empty_spaces, Some(12));
        assert_eq!(status.total_spaces, Some(20));
        assert_eq!(lots[3].latitude, Some(37.5));
    }

    #[test]
    fn non_integral_numbers_read_as_absent() {
        assert_eq!(RawId::Float(3.5).to_lot_id(), None);
        assert_eq!(RawId::Text("7.0".to_string()).to_lot_id(), Some(7));
        let lot: RawLot = serde_json::from_value(serde_json::json!({
            "id": 5,
            "totalSpaces": -3,
            "currentStatus": {"emptySpaces": 1.5, "emptyRatio": true}
        }))
        .unwrap();
        assert_eq!(lot.total_spaces, None);
        let status = lot.current_status.unwrap();
        assert_eq!(status.empty_spaces, None);
        assert_eq!(status.empty_ratio, None);
    }

    #[test]
    fn unsuccessful_response_has_no_lots() {
        let resp: ParkingListResponse =
            serde_json::from_value(serde_json::json!({"success": false, "data": []})).unwrap();
        assert!(resp.into_lots().is_none());

        let resp: ParkingListResponse =
            serde_json::from_value(serde_json::json!({"success": true})).unwrap();
        assert!(resp.into_lots().is_none());
    }

    #[test]
    fn ratio_formats_like_the_backend_number() {
        assert_eq!(RawRatio::Number(50.0).to_ratio_string().as_deref(), Some("50"));
        assert_eq!(RawRatio::Number(45.5).to_ratio_string().as_deref(), Some("45.5"));
        assert_eq!(RawRatio::Text(" ".to_string()).to_ratio_string(), None);
    }
}
