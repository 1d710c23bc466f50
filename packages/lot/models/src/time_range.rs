//! Time-of-day windows during which alerts may be shown.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const MINUTES_PER_DAY: u16 = 24 * 60;

/// A minute within a day, `0..1440`, written as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MinuteOfDay(u16);

/// Error returned when a time of day cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTimeError {
    /// The rejected input.
    pub input: String,
}

impl fmt::Display for InvalidTimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time of day '{}': expected HH:MM", self.input)
    }
}

impl std::error::Error for InvalidTimeError {}

impl MinuteOfDay {
    /// Builds a minute of day from hours and minutes.
    ///
    /// # Errors
    ///
    /// Returns an error if `hour >= 24` or `minute >= 60`.
    pub fn new(hour: u16, minute: u16) -> Result<Self, InvalidTimeError> {
        if hour >= 24 || minute >= 60 {
            return Err(InvalidTimeError {
                input: format!("{hour}:{minute:02}"),
            });
        }
        Ok(Self(hour * 60 + minute))
    }

    /// Minutes since midnight.
    #[must_use]
    pub const fn minutes(self) -> u16 {
        self.0
    }

    /// Minute of day of a clock time.
    #[must_use]
    pub fn of<T: chrono::Timelike>(time: &T) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let minutes = (time.hour() * 60 + time.minute()) as u16;
        Self(minutes % MINUTES_PER_DAY)
    }
}

impl fmt::Display for MinuteOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for MinuteOfDay {
    type Err = InvalidTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidTimeError {
            input: s.to_string(),
        };
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = hour.parse::<u16>().map_err(|_| invalid())?;
        let minute = minute.parse::<u16>().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for MinuteOfDay {
    type Error = InvalidTimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MinuteOfDay> for String {
    fn from(value: MinuteOfDay) -> Self {
        value.to_string()
    }
}

/// A user-configured window in which alerts are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationTimeRange {
    /// Range id, unique within the set.
    pub id: u32,
    /// First allowed minute.
    pub start_time: MinuteOfDay,
    /// Last allowed minute.
    pub end_time: MinuteOfDay,
    /// Whether the range takes part in gating.
    pub enabled: bool,
}

impl NotificationTimeRange {
    /// Whether `minute` falls inside the range, both ends inclusive.
    ///
    /// A range whose start is after its end spans midnight.
    #[must_use]
    pub fn contains(&self, minute: MinuteOfDay) -> bool {
        if self.start_time <= self.end_time {
            self.start_time <= minute && minute <= self.end_time
        } else {
            minute >= self.start_time || minute <= self.end_time
        }
    }
}
