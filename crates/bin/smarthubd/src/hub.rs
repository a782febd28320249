//! Wiring of the configured devices, triggers and schedules into a running
//! registry and scheduler.

use smarthub_adapter_virtual::create_proxied_device;
use smarthub_app::registry::DeviceRegistry;
use smarthub_app::retry::RetryPolicy;
use smarthub_app::scheduler::Scheduler;
use smarthub_app::trigger::Trigger;
use smarthub_domain::error::DeviceError;

use crate::config::Config;

/// The running hub: the device registry plus the scheduler driving it.
pub struct Hub {
    pub registry: DeviceRegistry,
    pub scheduler: Scheduler,
}

impl Hub {
    /// Build every configured device behind a throttling proxy, then install
    /// the triggers and daily schedules. Starts the health check.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::UnknownDeviceType`] if a device spec names an
    /// unknown type.
    pub fn build(config: &Config, retry: RetryPolicy) -> Result<Self, DeviceError> {
        let registry = DeviceRegistry::with_max_trigger_cascade(config.hub.max_trigger_cascade);

        for spec in &config.devices {
            let device = create_proxied_device(spec, config.throttle_interval())?;
            registry.register_device(device);
        }

        for trigger in &config.triggers {
            registry.add_trigger(Trigger::command(
                trigger.condition(),
                trigger.device_id,
                trigger.command,
                retry,
            ));
        }

        let scheduler = Scheduler::new(&registry);
        for schedule in &config.schedules {
            scheduler.schedule_device_command(
                schedule.device_id,
                schedule.at,
                schedule.command,
                retry,
            );
        }

        registry.start_health_check(config.health_check_period());
        tracing::info!(
            devices = registry.device_count(),
            triggers = config.triggers.len(),
            schedules = config.schedules.len(),
            "hub ready"
        );
        Ok(Self {
            registry,
            scheduler,
        })
    }

    /// Cancel scheduled jobs, then stop the hub's background work.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
        self.registry.shutdown();
        tracing::info!("hub stopped");
    }
}
