//! Time-of-day helpers for recurring schedules.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{Local, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// A wall-clock time written as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    /// Build from hour and minute; `None` when out of range.
    #[must_use]
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    #[must_use]
    pub fn as_naive(self) -> NaiveTime {
        self.0
    }

    /// Delay from `now` until the next occurrence of this time.
    ///
    /// The result is always within `(0, 24h]`: a time still ahead today is
    /// reached today, a time already passed (or exactly now) is reached
    /// tomorrow.
    #[must_use]
    pub fn delay_from(self, now: NaiveTime) -> Duration {
        let diff = self.0.signed_duration_since(now);
        match diff.to_std() {
            Ok(ahead) if !ahead.is_zero() => ahead,
            Ok(_) => DAY,
            Err(_) => DAY.saturating_sub(diff.abs().to_std().unwrap_or_default()),
        }
    }

    /// Delay until the next occurrence, using the local clock.
    #[must_use]
    pub fn delay_from_now(self) -> Duration {
        self.delay_from(Local::now().time())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self)
            .map_err(|_| ParseError::TimeOfDay(s.to_string()))
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}
