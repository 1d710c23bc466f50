#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Backend client for the parking lot list.
//!
//! [`LotSource`] abstracts where lots come from; [`HttpLotSource`] reads
//! them from `GET {api_url}/parking/list`. A response is only usable when
//! it carries `success: true` and a `data` array; anything else is a
//! [`FetchError`] and the caller keeps its previous state.

pub mod http;
pub mod sequence;

use std::time::Duration;

use async_trait::async_trait;
use parking_monitor_lot_models::payload::{ParkingListResponse, RawLot};

pub use sequence::RequestSequencer;

/// Production backend used when no URL is configured.
pub const DEFAULT_API_URL: &str = "https://appealing-encouragement-production.up.railway.app/api";

/// Environment variable overriding the backend URL.
pub const API_URL_ENV: &str = "PARKING_API_URL";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur while fetching lots.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("HTTP {status}")]
    Status {
        /// Response status code.
        status: u16,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered without usable data.
    #[error("Response has no usable data (success flag unset or data missing)")]
    Unsuccessful,
}

/// Somewhere lots can be fetched from.
#[async_trait]
pub trait LotSource: Send + Sync {
    /// Human-readable location of the source, for logs.
    fn endpoint(&self) -> &str;

    /// Fetches the current lot list.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request fails or the payload is not
    /// usable.
    async fn fetch(&self) -> Result<Vec<RawLot>, FetchError>;
}

/// Reads lots from the REST backend.
#[derive(Debug, Clone)]
pub struct HttpLotSource {
    client: reqwest::Client,
    url: String,
}

impl HttpLotSource {
    /// Creates a client for the backend rooted at `api_url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the HTTP client cannot be built.
    pub fn new(api_url: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: list_url(api_url),
        })
    }
}

#[async_trait]
impl LotSource for HttpLotSource {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Vec<RawLot>, FetchError> {
        log::debug!("GET {}", self.url);
        let body = http::get_json(&self.client, &self.url).await?;
        let lots = parse_list_response(body)?;
        log::debug!("Received {} lots", lots.len());
        Ok(lots)
    }
}

/// Builds the list endpoint URL from the API root.
#[must_use]
pub fn list_url(api_url: &str) -> String {
    format!("{}/parking/list", api_url.trim_end_matches('/'))
}

/// Extracts the lots from a list response body.
///
/// # Errors
///
/// Returns [`FetchError::Json`] if the body has the wrong shape and
/// [`FetchError::Unsuccessful`] if it lacks the success marker or data.
pub fn parse_list_response(body: serde_json::Value) -> Result<Vec<RawLot>, FetchError> {
    let response: ParkingListResponse = serde_json::from_value(body)?;
    response.into_lots().ok_or(FetchError::Unsuccessful)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_list_url_without_double_slash() {
        assert_eq!(list_url("http://x/api/"), "http://x/api/parking/list");
        assert_eq!(list_url("http://x/api"), "http://x/api/parking/list");
    }

    #[test]
    fn parses_successful_response() {
        let body = serde_json::json!({
            "success": true,
            "data": [{
                "id": 1,
                "name": "재능고 주차장",
                "currentStatus": {
                    "emptySpaces": 12,
                    "occupiedSpaces": 8,
                    "totalSpaces": 20,
                    "emptyRatio": 60,
                    "imageUrl": "https://cdn/1.jpg",
                    "updatedAt": "2026-10-19T09:00:00Z"
                }
            }]
        });
        let lots = parse_list_response(body).unwrap();
        assert_eq!(lots.len(), 1);
        let status = lots[0].current_status.as_ref().unwrap();
        assert_eq!(status.empty_spaces, Some(12));
        assert_eq!(status.image_url.as_deref(), Some("https://cdn/1.jpg"));
    }

    #[test]
    fn malformed_lots_are_skipped_not_fatal() {
        let body = serde_json::json!({
            "success": true,
            "data": [
                {"id": 1, "name": "ok", "currentStatus": {"emptyRatio": 60}},
                {"id": null},
                {"id": 2, "currentStatus": {"emptySpaces": 12.0}},
                {"id": 3.0},
                {"id": 4, "currentStatus": "broken"}
            ]
        });
        let lots = parse_list_response(body).unwrap();
        let ids: Vec<_> = lots.iter().map(RawLot::lot_id).collect();
        assert_eq!(ids, vec![Some(1), None, Some(2), Some(3)]);
        assert_eq!(
            lots[2].current_status.as_ref().unwrap().empty_spaces,
            Some(12)
        );
    }

    #[test]
    fn rejects_unsuccessful_response() {
        let body = serde_json::json!({"success": false, "message": "down"});
        assert!(matches!(
            parse_list_response(body),
            Err(FetchError::Unsuccessful)
        ));
    }

    #[test]
    fn rejects_wrong_shape() {
        let body = serde_json::json!({"success": true, "data": "nope"});
        assert!(matches!(parse_list_response(body), Err(FetchError::Json(_))));
    }

    #[tokio::test]
    async fn unreachable_backend_is_an_http_error() {
        let source = HttpLotSource::new("http://127.0.0.1:9").unwrap();
        assert_eq!(source.endpoint(), "http://127.0.0.1:9/parking/list");
        assert!(matches!(source.fetch().await, Err(FetchError::Http(_))));
    }
}
