//! Commands accepted by the hub's command pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

/// A state-changing request addressed to one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[non_exhaustive]
pub enum DeviceCommand {
    TurnOn,
    TurnOff,
}

impl DeviceCommand {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TurnOn => "TURN_ON",
            Self::TurnOff => "TURN_OFF",
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceCommand {
    type Err = DeviceError;

    /// Accepts `turn_on`, `TURN_ON`, `Turn On`, `turn-on` or plain `on`
    /// (and the `off` counterparts).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();
        match normalized.as_str() {
            "turn_on" | "on" => Ok(Self::TurnOn),
            "turn_off" | "off" => Ok(Self::TurnOff),
            _ => Err(DeviceError::UnsupportedCommand(s.to_string())),
        }
    }
}

impl TryFrom<String> for DeviceCommand {
    type Error = DeviceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceCommand> for String {
    fn from(command: DeviceCommand) -> Self {
        command.as_str().to_string()
    }
}
