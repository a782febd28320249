//! Virtual light — plain on/off, idempotent.

use std::sync::{Mutex, MutexGuard, PoisonError};

use smarthub_app::ports::Device;
use smarthub_domain::device::{DeviceKind, DeviceStatus};
use smarthub_domain::error::DeviceError;
use smarthub_domain::id::DeviceId;

use super::Faults;

/// A simulated light. Starts switched off.
#[derive(Debug)]
pub struct VirtualLight {
    id: DeviceId,
    on: Mutex<bool>,
    faults: Faults,
}

impl VirtualLight {
    #[must_use]
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            on: Mutex::new(false),
            faults: Faults::default(),
        }
    }

    /// Make the next `count` mutations fail with [`DeviceError::Busy`].
    pub fn fail_next(&self, count: usize) {
        self.faults.arm(count);
    }

    fn switch(&self, target: bool) -> Result<(), DeviceError> {
        self.faults.check(self.id)?;
        let mut on = self.lock_state_mut();
        if *on == target {
            tracing::debug!(device_id = %self.id, on = target, "light already in requested state");
            return Ok(());
        }
        *on = target;
        Ok(())
    }

    fn lock_state_mut(&self) -> MutexGuard<'_, bool> {
        self.on.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Device for VirtualLight {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Light
    }

    fn status(&self) -> DeviceStatus {
        DeviceStatus::switch(*self.lock_state_mut())
    }

    fn turn_on(&self) -> Result<(), DeviceError> {
        self.switch(true)
    }

    fn turn_off(&self) -> Result<(), DeviceError> {
        self.switch(false)
    }

    fn set_temperature(&self, _value: f64) -> Result<(), DeviceError> {
        Err(DeviceError::UnsupportedOperation {
            id: self.id,
            kind: DeviceKind::Light,
            operation: "set_temperature",
        })
    }
}
