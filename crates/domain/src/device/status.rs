//! Device status — an immutable snapshot of a device's observable state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::trigger::Metric;

/// Point-in-time view of a device.
///
/// `locked` only carries meaning for door locks and `temperature` only for
/// thermostats. A fresh value is produced on every query; nothing mutates a
/// snapshot after it has been handed out.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub on: bool,
    pub locked: bool,
    pub temperature: Option<f64>,
}

impl DeviceStatus {
    /// Plain on/off device.
    #[must_use]
    pub fn switch(on: bool) -> Self {
        Self {
            on,
            locked: false,
            temperature: None,
        }
    }

    #[must_use]
    pub fn thermostat(on: bool, temperature: f64) -> Self {
        Self {
            on,
            locked: false,
            temperature: Some(temperature),
        }
    }

    /// Door lock, where "on" means unlocked.
    #[must_use]
    pub fn lock(locked: bool) -> Self {
        Self {
            on: !locked,
            locked,
            temperature: None,
        }
    }

    /// Read the value a trigger watches, if this device reports it.
    #[must_use]
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Temperature => self.temperature,
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(temperature) = self.temperature {
            let power = if self.on { "On" } else { "Off" };
            return write!(f, "Thermostat: {power}, Temp={temperature:.1}");
        }
        if self.locked {
            return f.write_str("Locked: true");
        }
        write!(f, "On: {}", self.on)
    }
}
