//! # smarthub-adapter-virtual
//!
//! In-memory device backends for the hub, plus the factory that builds them
//! from a [`DeviceSpec`].
//!
//! ## Provided devices
//!
//! | Type tag | Device | Behaviour |
//! |----------|--------|-----------|
//! | `light` | [`VirtualLight`] | Idempotent `turn_on` / `turn_off` |
//! | `thermostat` | [`VirtualThermostat`] | `turn_on` / `turn_off`, settable temperature |
//! | `door`, `doorlock` | [`VirtualDoorLock`] | `turn_on` unlocks, `turn_off` locks |
//!
//! ## Dependency rule
//!
//! Depends on `smarthub-app` (port traits) and `smarthub-domain` only.

mod devices;

use std::sync::Arc;
use std::time::Duration;

use smarthub_app::ports::Device;
use smarthub_app::proxy::ThrottledDevice;
use smarthub_domain::device::{DeviceKind, DeviceSpec};
use smarthub_domain::error::DeviceError;

pub use devices::{VirtualDoorLock, VirtualLight, VirtualThermostat};

/// Build the device described by `spec`.
///
/// # Errors
///
/// Returns [`DeviceError::UnknownDeviceType`] when the type tag is not one of
/// `light`, `thermostat`, `door` or `doorlock` (case-insensitive).
pub fn create_device(spec: &DeviceSpec) -> Result<Arc<dyn Device>, DeviceError> {
    let device: Arc<dyn Device> = match spec.kind()? {
        DeviceKind::Light => Arc::new(VirtualLight::new(spec.id)),
        DeviceKind::Thermostat => Arc::new(VirtualThermostat::new(
            spec.id,
            spec.temperature_or_default(),
        )),
        DeviceKind::DoorLock => Arc::new(VirtualDoorLock::new(spec.id)),
    };
    tracing::debug!(device_id = %spec.id, kind = %device.kind(), "device created");
    Ok(device)
}

/// Build the device described by `spec`, wrapped in a throttling proxy that
/// rejects calls closer together than `min_interval`.
///
/// # Errors
///
/// Same as [`create_device`].
pub fn create_proxied_device(
    spec: &DeviceSpec,
    min_interval: Duration,
) -> Result<Arc<dyn Device>, DeviceError> {
    let device = create_device(spec)?;
    Ok(Arc::new(ThrottledDevice::with_interval(device, min_interval)))
}

#[cfg(test)]
mod tests {
    use std::thread;

    use smarthub_app::registry::{CommandOutcome, DeviceRegistry};
    use smarthub_app::retry::RetryPolicy;
    use smarthub_domain::device::DeviceCommand;
    use smarthub_domain::id::DeviceId;

    use super::*;

    #[test]
    fn should_create_each_kind() {
        let light = create_device(&DeviceSpec::light(1)).unwrap();
        let thermostat = create_device(&DeviceSpec::thermostat(2, 70.0)).unwrap();
        let door = create_device(&DeviceSpec::door(3)).unwrap();

        assert_eq!(light.kind(), DeviceKind::Light);
        assert_eq!(thermostat.kind(), DeviceKind::Thermostat);
        assert_eq!(thermostat.status().temperature, Some(70.0));
        assert_eq!(door.kind(), DeviceKind::DoorLock);
        assert!(door.status().locked);
    }

    #[test]
    fn should_accept_type_tags_case_insensitively() {
        let spec = DeviceSpec {
            device_type: "DOORLOCK".to_string(),
            ..DeviceSpec::door(4)
        };
        assert_eq!(create_device(&spec).unwrap().kind(), DeviceKind::DoorLock);
    }

    #[test]
    fn should_reject_unknown_type_tag() {
        let spec = DeviceSpec {
            device_type: "fan".to_string(),
            ..DeviceSpec::light(5)
        };
        let result = create_device(&spec);
        assert!(matches!(result, Err(DeviceError::UnknownDeviceType(tag)) if tag == "fan"));
    }

    #[test]
    fn should_default_thermostat_temperature() {
        let spec = DeviceSpec {
            initial_temperature: None,
            ..DeviceSpec::thermostat(6, 0.0)
        };
        let device = create_device(&spec).unwrap();
        assert_eq!(device.status().temperature, Some(20.0));
    }

    #[tokio::test(start_paused = true)]
    async fn should_throttle_proxied_device() {
        let device =
            create_proxied_device(&DeviceSpec::light(1), Duration::from_millis(50)).unwrap();

        assert!(device.turn_on().is_ok());
        assert_eq!(
            device.turn_off(),
            Err(DeviceError::RateLimited { id: DeviceId::new(1) })
        );
        assert!(device.status().on);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(device.turn_off().is_ok());
        assert!(!device.status().on);
    }

    #[test]
    fn should_serialise_concurrent_mutations_on_one_device() {
        let thermostat = Arc::new(VirtualThermostat::new(DeviceId::new(2), 0.0));

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let thermostat = Arc::clone(&thermostat);
                thread::spawn(move || {
                    for _ in 0..100 {
                        thermostat.set_temperature(f64::from(n)).unwrap();
                        thermostat.turn_on().unwrap();
                        thermostat.turn_off().unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let status = thermostat.status();
        assert!(!status.on);
        let temperature = status.temperature.unwrap();
        assert!((0.0..8.0).contains(&temperature));
        assert_eq!(temperature.fract(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_mask_injected_faults_through_registry() {
        let thermostat = Arc::new(VirtualThermostat::new(DeviceId::new(2), 70.0));
        thermostat.fail_next(2);
        let registry = DeviceRegistry::new();
        registry.register_device(Arc::clone(&thermostat) as Arc<dyn Device>);

        let outcome = registry
            .execute_command(DeviceId::new(2), DeviceCommand::TurnOn, &RetryPolicy::default())
            .await;

        assert_eq!(outcome, CommandOutcome::Applied);
        assert!(thermostat.status().on);
    }

    #[tokio::test]
    async fn should_report_mixed_fleet_in_id_order() {
        let registry = DeviceRegistry::new();
        for spec in [
            DeviceSpec::door(3),
            DeviceSpec::light(1),
            DeviceSpec::thermostat(2, 70.0),
        ] {
            registry.register_device(create_device(&spec).unwrap());
        }

        assert_eq!(
            registry.status_report().to_string(),
            "Device 1 (Light) -> On: false\n\
             Device 2 (Thermostat) -> Thermostat: Off, Temp=70.0\n\
             Device 3 (DoorLock) -> Locked: true\n"
        );
    }
}
