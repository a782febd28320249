//! Virtual door lock — "on" means unlocked.

use std::sync::{Mutex, MutexGuard, PoisonError};

use smarthub_app::ports::Device;
use smarthub_domain::device::{DeviceKind, DeviceStatus};
use smarthub_domain::error::DeviceError;
use smarthub_domain::id::DeviceId;

use super::Faults;

/// A simulated door lock. Starts locked.
#[derive(Debug)]
pub struct VirtualDoorLock {
    id: DeviceId,
    locked: Mutex<bool>,
    faults: Faults,
}

impl VirtualDoorLock {
    #[must_use]
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            locked: Mutex::new(true),
            faults: Faults::default(),
        }
    }

    /// Make the next `count` mutations fail with [`DeviceError::Busy`].
    pub fn fail_next(&self, count: usize) {
        self.faults.arm(count);
    }

    fn set_locked(&self, locked: bool) -> Result<(), DeviceError> {
        self.faults.check(self.id)?;
        *self.lock_state_mut() = locked;
        tracing::debug!(device_id = %self.id, locked, "door lock updated");
        Ok(())
    }

    fn lock_state_mut(&self) -> MutexGuard<'_, bool> {
        self.locked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Device for VirtualDoorLock {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::DoorLock
    }

    fn status(&self) -> DeviceStatus {
        DeviceStatus::lock(*self.lock_state_mut())
    }

    fn turn_on(&self) -> Result<(), DeviceError> {
        self.set_locked(false)
    }

    fn turn_off(&self) -> Result<(), DeviceError> {
        self.set_locked(true)
    }

    fn set_temperature(&self, _value: f64) -> Result<(), DeviceError> {
        Err(DeviceError::UnsupportedOperation {
            id: self.id,
            kind: DeviceKind::DoorLock,
            operation: "set_temperature",
        })
    }
}
