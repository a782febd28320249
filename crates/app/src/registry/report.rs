//! Status report — a per-device snapshot of the whole registry.

use std::fmt;

use serde::Serialize;

use smarthub_domain::device::{DeviceKind, DeviceStatus};
use smarthub_domain::id::DeviceId;

/// One row of a [`StatusReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceReport {
    pub id: DeviceId,
    pub kind: DeviceKind,
    pub status: DeviceStatus,
}

/// Status of every registered device, ordered by id.
///
/// Each device is read independently; the report is not a consistent cut
/// across devices that change while it is being built.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StatusReport {
    pub devices: Vec<DeviceReport>,
}

impl StatusReport {
    #[must_use]
    pub fn get(&self, id: DeviceId) -> Option<&DeviceReport> {
        self.devices.iter().find(|row| row.id == id)
    }
}

impl fmt::Display for DeviceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device {} ({}) -> {}", self.id, self.kind, self.status)
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.devices {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}
