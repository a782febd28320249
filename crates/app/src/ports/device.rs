//! Device port — the capability interface every device backend exposes.
//!
//! Real backends (see `smarthub-adapter-virtual`) and decorators such as
//! [`ThrottledDevice`](crate::proxy::ThrottledDevice) implement the same
//! trait, so the registry never knows which one it is holding.

use std::sync::Arc;

use smarthub_domain::device::{DeviceKind, DeviceStatus};
use smarthub_domain::error::DeviceError;
use smarthub_domain::id::DeviceId;

/// Payload broadcast to every registered device after a state change.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A command was applied to `device_id`, leaving it in `status`.
    StateChanged {
        device_id: DeviceId,
        status: DeviceStatus,
    },
}

/// An addressable, controllable device.
///
/// Implementations must serialise their own state mutations: two calls on
/// the same instance never interleave partial updates, while calls on
/// different instances proceed independently.
pub trait Device: Send + Sync {
    fn id(&self) -> DeviceId;

    fn kind(&self) -> DeviceKind;

    /// Fresh snapshot of the current state.
    fn status(&self) -> DeviceStatus;

    /// # Errors
    ///
    /// Returns a transient [`DeviceError`] when the backend cannot serve the
    /// call right now.
    fn turn_on(&self) -> Result<(), DeviceError>;

    /// # Errors
    ///
    /// Returns a transient [`DeviceError`] when the backend cannot serve the
    /// call right now.
    fn turn_off(&self) -> Result<(), DeviceError>;

    /// # Errors
    ///
    /// Returns [`DeviceError::UnsupportedOperation`] for devices without a
    /// temperature, or a transient error from the backend.
    fn set_temperature(&self, value: f64) -> Result<(), DeviceError>;

    /// Observer callback invoked by the registry after every accepted
    /// command. The default ignores it.
    ///
    /// # Errors
    ///
    /// Errors are logged by the registry and do not stop delivery to other
    /// devices.
    fn update(&self, _notification: Option<&Notification>) -> Result<(), DeviceError> {
        Ok(())
    }
}

impl<D: Device + ?Sized> Device for Arc<D> {
    fn id(&self) -> DeviceId {
        (**self).id()
    }

    fn kind(&self) -> DeviceKind {
        (**self).kind()
    }

    fn status(&self) -> DeviceStatus {
        (**self).status()
    }

    fn turn_on(&self) -> Result<(), DeviceError> {
        (**self).turn_on()
    }

    fn turn_off(&self) -> Result<(), DeviceError> {
        (**self).turn_off()
    }

    fn set_temperature(&self, value: f64) -> Result<(), DeviceError> {
        (**self).set_temperature(value)
    }

    fn update(&self, notification: Option<&Notification>) -> Result<(), DeviceError> {
        (**self).update(notification)
    }
}
