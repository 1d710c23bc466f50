//! Delivery of alerts outside the process.

use parking_monitor_lot_models::NotificationPermission;

use crate::alert::Alert;

/// Somewhere alerts can be delivered.
pub trait NotificationChannel: Send + Sync {
    /// Asks for permission to deliver alerts and returns the answer.
    fn request_permission(&self) -> NotificationPermission;

    /// Delivers `alert`. Alerts sharing a tag replace each other.
    fn show(&self, alert: &Alert);
}

/// Prints alerts to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleChannel;

impl NotificationChannel for ConsoleChannel {
    fn request_permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn show(&self, alert: &Alert) {
        println!("[{}] {}: {}", alert.tag, alert.title, alert.body);
    }
}

/// A channel for environments without notification support.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledChannel;

impl NotificationChannel for DisabledChannel {
    fn request_permission(&self) -> NotificationPermission {
        NotificationPermission::Unsupported
    }

    fn show(&self, alert: &Alert) {
        log::debug!("Notifications unsupported, dropping alert {}", alert.tag);
    }
}
