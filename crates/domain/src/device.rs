//! Device descriptors — the kind of a device, how to build one, what it
//! reports and which commands it accepts.
//!
//! The devices themselves are behaviour and live behind the `Device` port in
//! the `app` crate; this module only holds the values that cross it.

mod command;
mod status;

pub use command::DeviceCommand;
pub use status::DeviceStatus;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;
use crate::id::DeviceId;

/// Temperature given to thermostats whose spec does not carry one.
pub const DEFAULT_TEMPERATURE: f64 = 20.0;

/// The closed set of device variants the hub knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Light,
    Thermostat,
    DoorLock,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => f.write_str("Light"),
            Self::Thermostat => f.write_str("Thermostat"),
            Self::DoorLock => f.write_str("DoorLock"),
        }
    }
}

impl FromStr for DeviceKind {
    type Err = DeviceError;

    /// Accepts `light`, `thermostat`, `door` and `doorlock`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "thermostat" => Ok(Self::Thermostat),
            "door" | "doorlock" => Ok(Self::DoorLock),
            _ => Err(DeviceError::UnknownDeviceType(s.to_string())),
        }
    }
}

/// Recipe handed to the device factory.
///
/// The type tag stays a free-form string so that an unknown tag is reported
/// by the factory rather than at deserialization time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub id: DeviceId,
    #[serde(rename = "type")]
    pub device_type: String,
    /// Only meaningful for thermostats; other kinds ignore it.
    #[serde(default, rename = "temperature")]
    pub initial_temperature: Option<f64>,
}

impl DeviceSpec {
    #[must_use]
    pub fn light(id: u32) -> Self {
        Self {
            id: DeviceId::new(id),
            device_type: "light".to_string(),
            initial_temperature: None,
        }
    }

    #[must_use]
    pub fn thermostat(id: u32, temperature: f64) -> Self {
        Self {
            id: DeviceId::new(id),
            device_type: "thermostat".to_string(),
            initial_temperature: Some(temperature),
        }
    }

    #[must_use]
    pub fn door(id: u32) -> Self {
        Self {
            id: DeviceId::new(id),
            device_type: "door".to_string(),
            initial_temperature: None,
        }
    }

    /// Resolve the type tag.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::UnknownDeviceType`] for unrecognised tags.
    pub fn kind(&self) -> Result<DeviceKind, DeviceError> {
        self.device_type.parse()
    }

    /// Starting temperature for a thermostat built from this spec.
    #[must_use]
    pub fn temperature_or_default(&self) -> f64 {
        self.initial_temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }
}
