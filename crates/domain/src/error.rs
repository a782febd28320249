//! Common error types used across the workspace.
//!
//! Device faults are split in two families. *Transient* faults (throttling,
//! a busy backend) are expected to clear on their own and may be retried.
//! Everything else is misuse and must surface immediately.

use crate::device::DeviceKind;
use crate::id::DeviceId;

/// Classification used by retry loops to decide whether a failure is worth
/// another attempt.
pub trait Transient {
    /// Whether the failure is operational and may clear on retry.
    fn is_transient(&self) -> bool;
}

/// Failure reported by a device or by the layers wrapping it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The throttling proxy rejected the call because the previous accepted
    /// call was too recent.
    #[error("too many requests to device {id}")]
    RateLimited { id: DeviceId },

    /// The backend reported a temporary fault.
    #[error("device {id} is busy")]
    Busy { id: DeviceId },

    /// The device kind has no such capability (e.g. temperature on a light).
    #[error("{operation} is not supported by {kind} {id}")]
    UnsupportedOperation {
        id: DeviceId,
        kind: DeviceKind,
        operation: &'static str,
    },

    /// The factory was asked for a type tag it does not know.
    #[error("unknown device type {0:?}")]
    UnknownDeviceType(String),

    /// A command name that the hub does not accept.
    #[error("unsupported command {0:?}")]
    UnsupportedCommand(String),
}

impl Transient for DeviceError {
    fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Busy { .. } => true,
            Self::UnsupportedOperation { .. }
            | Self::UnknownDeviceType(_)
            | Self::UnsupportedCommand(_) => false,
        }
    }
}

/// Failure to parse a textual domain value (operator, time of day, …).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown operator {0:?}")]
    Operator(String),

    #[error("unknown metric {0:?}")]
    Metric(String),

    #[error("invalid time of day {0:?}, expected HH:MM")]
    TimeOfDay(String),

    #[error("invalid device id {0:?}")]
    DeviceId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_classify_rate_limited_as_transient() {
        let err = DeviceError::RateLimited { id: DeviceId::new(1) };
        assert!(err.is_transient());
    }

    #[test]
    fn should_classify_busy_as_transient() {
        assert!(DeviceError::Busy { id: DeviceId::new(7) }.is_transient());
    }

    #[test]
    fn should_classify_misuse_as_permanent() {
        let unsupported = DeviceError::UnsupportedOperation {
            id: DeviceId::new(1),
            kind: DeviceKind::Light,
            operation: "set_temperature",
        };
        assert!(!unsupported.is_transient());
        assert!(!DeviceError::UnknownDeviceType("fan".to_string()).is_transient());
        assert!(!DeviceError::UnsupportedCommand("dim".to_string()).is_transient());
    }

    #[test]
    fn should_display_unsupported_operation() {
        let err = DeviceError::UnsupportedOperation {
            id: DeviceId::new(3),
            kind: DeviceKind::DoorLock,
            operation: "set_temperature",
        };
        assert_eq!(
            err.to_string(),
            "set_temperature is not supported by DoorLock 3"
        );
    }

    #[test]
    fn should_display_rate_limited() {
        let err = DeviceError::RateLimited { id: DeviceId::new(4) };
        assert_eq!(err.to_string(), "too many requests to device 4");
    }
}
