//! Alert composition and the single-slot in-app banner.

use std::time::{Duration, Instant};

use parking_monitor_lot_models::{LotId, LotRecord, LotStatus};

/// Icon attached to every alert.
pub const ALERT_ICON: &str = "/logo.png";

/// Vibration pattern in milliseconds (on, off, on).
pub const VIBRATION_PATTERN: [u32; 3] = [300, 100, 300];

/// How long the banner shows an alert unless dismissed earlier.
pub const BANNER_TIMEOUT: Duration = Duration::from_secs(5);

/// A user-facing alert about one lot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Lot the alert is about.
    pub lot_id: LotId,
    /// Status of the lot when the alert was raised.
    pub status: LotStatus,
    /// `"{emoji} {lot name}"`.
    pub title: String,
    /// What changed.
    pub body: String,
    /// Icon path.
    pub icon: &'static str,
    /// Replacement tag; a new alert with the same tag replaces the old one.
    pub tag: String,
    /// Vibration pattern.
    pub vibrate: [u32; 3],
}

/// Builds the alert for a lot whose snapshot image changed.
#[must_use]
pub fn compose_alert(previous: Option<&LotRecord>, lot: &LotRecord) -> Alert {
    let body = match previous {
        Some(old) if old.status != lot.status => {
            format!("상태가 \"{}\"에서 \"{}\"로 변경되었습니다.", old.status, lot.status)
        }
        _ => format!(
            "새 분석 결과: 전체 {}면 중 {}면 여유 ({}%), \"{}\"",
            lot.total_spaces, lot.empty_spaces, lot.empty_ratio, lot.status
        ),
    };

    Alert {
        lot_id: lot.id,
        status: lot.status,
        title: format!("{} {}", lot.status.emoji(), lot.name),
        body,
        icon: ALERT_ICON,
        tag: format!("parking-{}", lot.id),
        vibrate: VIBRATION_PATTERN,
    }
}

/// Builds the confirmation shown when `lot` becomes a favorite.
#[must_use]
pub fn favorite_added(lot: &LotRecord) -> Alert {
    Alert {
        lot_id: lot.id,
        status: lot.status,
        title: "⭐ 즐겨찾기 추가".to_string(),
        body: format!("{}이(가) 즐겨찾기에 추가되었습니다.", lot.name),
        icon: ALERT_ICON,
        tag: format!("favorite-{}", lot.id),
        vibrate: VIBRATION_PATTERN,
    }
}

/// Holds at most one visible alert.
///
/// Showing a new alert replaces the current one. An alert disappears when
/// dismissed or once [`BANNER_TIMEOUT`] has passed since it was shown.
#[derive(Debug, Default)]
pub struct AlertBanner {
    current: Option<(Alert, Instant)>,
}

impl AlertBanner {
    /// Creates an empty banner.
    #[must_use]
    pub const fn new() -> Self {
        Self { current: None }
    }

    /// Shows `alert` from `at`, replacing anything on screen.
    pub fn show(&mut self, alert: Alert, at: Instant) {
        self.current = Some((alert, at));
    }

    /// The alert visible at `now`, if any.
    #[must_use]
    pub fn visible(&self, now: Instant) -> Option<&Alert> {
        self.current
            .as_ref()
            .filter(|(_, shown)| now.saturating_duration_since(*shown) < BANNER_TIMEOUT)
            .map(|(alert, _)| alert)
    }

    /// Hides the current alert (the user clicked it).
    pub fn dismiss(&mut self) -> Option<Alert> {
        self.current.take().map(|(alert, _)| alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(status: LotStatus) -> LotRecord {
        LotRecord {
            id: 2,
            name: "다이소 주차장".to_string(),
            lat: 37.39,
            lng: 126.63,
            status,
            empty_spaces: 3,
            occupied_spaces: 17,
            total_spaces: 20,
            empty_ratio: "15".to_string(),
            image_url: "u".to_string(),
            analysis_time: String::new(),
            address: String::new(),
            fee: String::new(),
            open_time: String::new(),
            last_updated: String::new(),
            contact: String::new(),
        }
    }

    #[test]
    fn title_carries_status_emoji_and_name() {
        let alert = compose_alert(None, &lot(LotStatus::Congested));
        assert_eq!(alert.title, "🔴 다이소 주차장");
        assert_eq!(alert.tag, "parking-2");
        assert_eq!(alert.vibrate, VIBRATION_PATTERN);
        assert_eq!(alert.body, "새 분석 결과: 전체 20면 중 3면 여유 (15%), \"혼잡\"");
    }

    #[test]
    fn body_describes_status_transition() {
        let alert = compose_alert(Some(&lot(LotStatus::Plenty)), &lot(LotStatus::Congested));
        assert_eq!(alert.body, "상태가 \"여유\"에서 \"혼잡\"로 변경되었습니다.");
    }

    #[test]
    fn favorite_confirmation_has_its_own_tag() {
        let alert = favorite_added(&lot(LotStatus::Plenty));
        assert_eq!(alert.tag, "favorite-2");
        assert_eq!(alert.title, "⭐ 즐겨찾기 추가");
        assert_eq!(alert.body, "다이소 주차장이(가) 즐겨찾기에 추가되었습니다.");
    }

    #[test]
    fn banner_replaces_and_expires() {
        let start = Instant::now();
        let mut banner = AlertBanner::new();
        banner.show(compose_alert(None, &lot(LotStatus::Plenty)), start);
        banner.show(compose_alert(None, &lot(LotStatus::Moderate)), start);

        let visible = banner.visible(start + Duration::from_secs(1)).unwrap();
        assert_eq!(visible.status, LotStatus::Moderate);
        assert!(banner.visible(start + BANNER_TIMEOUT).is_none());
    }

    #[test]
    fn banner_dismiss_hides_alert() {
        let start = Instant::now();
        let mut banner = AlertBanner::new();
        banner.show(compose_alert(None, &lot(LotStatus::Plenty)), start);
        assert!(banner.dismiss().is_some());
        assert!(banner.visible(start).is_none());
        assert!(banner.dismiss().is_none());
    }
}
