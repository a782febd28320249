//! Virtual thermostat — on/off plus a settable temperature.

use std::sync::{Mutex, MutexGuard, PoisonError};

use smarthub_app::ports::Device;
use smarthub_domain::device::{DeviceKind, DeviceStatus};
use smarthub_domain::error::DeviceError;
use smarthub_domain::id::DeviceId;

use super::Faults;

#[derive(Debug, Clone, Copy)]
struct State {
    on: bool,
    temperature: f64,
}

/// A simulated thermostat. Starts switched off at the given temperature.
#[derive(Debug)]
pub struct VirtualThermostat {
    id: DeviceId,
    state: Mutex<State>,
    faults: Faults,
}

impl VirtualThermostat {
    #[must_use]
    pub fn new(id: DeviceId, temperature: f64) -> Self {
        Self {
            id,
            state: Mutex::new(State {
                on: false,
                temperature,
            }),
            faults: Faults::default(),
        }
    }

    /// Make the next `count` mutations fail with [`DeviceError::Busy`].
    pub fn fail_next(&self, count: usize) {
        self.faults.arm(count);
    }

    fn mutate(&self, f: impl FnOnce(&mut State)) -> Result<(), DeviceError> {
        self.faults.check(self.id)?;
        f(&mut self.lock_state_mut());
        Ok(())
    }

    fn lock_state_mut(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Device for VirtualThermostat {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Thermostat
    }

    fn status(&self) -> DeviceStatus {
        let state = *self.lock_state_mut();
        DeviceStatus::thermostat(state.on, state.temperature)
    }

    fn turn_on(&self) -> Result<(), DeviceError> {
        self.mutate(|state| state.on = true)
    }

    fn turn_off(&self) -> Result<(), DeviceError> {
        self.mutate(|state| state.on = false)
    }

    fn set_temperature(&self, value: f64) -> Result<(), DeviceError> {
        self.mutate(|state| state.temperature = value)?;
        tracing::debug!(device_id = %self.id, temperature = value, "temperature set");
        Ok(())
    }
}
