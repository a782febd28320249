//! Virtual device implementations — light, thermostat, door lock.
//!
//! Every device keeps its state behind its own mutex, so mutations on one
//! instance are serialised while distinct instances never contend.

mod door_lock;
mod light;
mod thermostat;

pub use door_lock::VirtualDoorLock;
pub use light::VirtualLight;
pub use thermostat::VirtualThermostat;

use std::sync::atomic::{AtomicUsize, Ordering};

use smarthub_domain::error::DeviceError;
use smarthub_domain::id::DeviceId;

/// Countdown of injected faults.
///
/// While armed, every mutation fails with [`DeviceError::Busy`] and consumes
/// one fault, which lets callers exercise retry paths against a real device.
#[derive(Debug, Default)]
pub(crate) struct Faults(AtomicUsize);

impl Faults {
    pub(crate) fn arm(&self, count: usize) {
        self.0.store(count, Ordering::SeqCst);
    }

    pub(crate) fn check(&self, id: DeviceId) -> Result<(), DeviceError> {
        let consumed = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if consumed {
            tracing::debug!(device_id = %id, "injected fault");
            return Err(DeviceError::Busy { id });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_fail_exactly_armed_count() {
        let faults = Faults::default();
        faults.arm(2);

        assert!(faults.check(DeviceId::new(1)).is_err());
        assert!(faults.check(DeviceId::new(1)).is_err());
        assert!(faults.check(DeviceId::new(1)).is_ok());
    }

    #[test]
    fn should_pass_when_never_armed() {
        assert!(Faults::default().check(DeviceId::new(1)).is_ok());
    }
}
