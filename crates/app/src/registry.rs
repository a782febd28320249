//! Device registry — the hub.
//!
//! The registry owns the registered devices and the standing trigger rules,
//! and runs every command through the same pipeline:
//!
//! 1. look the device up (an unknown id is logged and dropped),
//! 2. call it under the caller's [`RetryPolicy`],
//! 3. on success, notify every registered device,
//! 4. evaluate every trigger against every device.
//!
//! Commands never return an error to the caller. The returned
//! [`CommandOutcome`] says what happened and may be ignored.
//!
//! The handle is cheap to clone; all clones share one hub. Device and
//! trigger collections are snapshotted before iteration, so notification and
//! evaluation never hold a lock while calling into a device or an action.

mod report;

pub use report::{DeviceReport, StatusReport};

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use smarthub_domain::device::DeviceCommand;
use smarthub_domain::error::DeviceError;
use smarthub_domain::id::{DeviceId, TriggerId};

use crate::ports::{Device, Notification};
use crate::retry::{RetryError, RetryPolicy};
use crate::trigger::{RegisteredTrigger, Trigger, TriggerAction, TriggerFiring, TriggerSummary};

/// How many trigger-issued commands may follow each other before trigger
/// evaluation is skipped.
pub const DEFAULT_MAX_TRIGGER_CASCADE: u32 = 4;

/// Interval of the diagnostic health check.
pub const DEFAULT_HEALTH_CHECK_PERIOD: Duration = Duration::from_secs(10);

type DeviceMap = BTreeMap<DeviceId, Arc<dyn Device>>;
type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// What became of a command.
#[derive(Debug, PartialEq)]
pub enum CommandOutcome {
    /// The device accepted the change; devices were notified and triggers
    /// evaluated.
    Applied,
    /// No device is registered under the id; nothing happened.
    DeviceNotFound,
    /// The device rejected the change, permanently or after the retry
    /// budget ran out.
    Failed(RetryError<DeviceError>),
}

impl CommandOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[derive(Debug, Clone, Copy)]
enum Mutation {
    Command(DeviceCommand),
    SetTemperature(f64),
}

impl Mutation {
    fn apply(self, device: &dyn Device) -> Result<(), DeviceError> {
        match self {
            Self::Command(DeviceCommand::TurnOn) => device.turn_on(),
            Self::Command(DeviceCommand::TurnOff) => device.turn_off(),
            Self::Command(other) => Err(DeviceError::UnsupportedCommand(other.to_string())),
            Self::SetTemperature(value) => device.set_temperature(value),
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(command) => command.fmt(f),
            Self::SetTemperature(value) => write!(f, "SET_TEMPERATURE({value})"),
        }
    }
}

struct Inner {
    devices: RwLock<DeviceMap>,
    triggers: RwLock<Vec<Arc<RegisteredTrigger>>>,
    max_trigger_cascade: u32,
    health_check: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let slot = self
            .health_check
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

/// Shared handle to the hub.
#[derive(Clone)]
pub struct DeviceRegistry {
    inner: Arc<Inner>,
}

/// Non-owning handle to a [`DeviceRegistry`].
#[derive(Clone)]
pub struct WeakRegistry(Weak<Inner>);

impl WeakRegistry {
    /// The registry, if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<DeviceRegistry> {
        self.0.upgrade().map(|inner| DeviceRegistry { inner })
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.device_count())
            .field("triggers", &self.triggers().len())
            .finish_non_exhaustive()
    }
}

impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_trigger_cascade(DEFAULT_MAX_TRIGGER_CASCADE)
    }

    /// Registry whose trigger-issued commands stop re-evaluating triggers
    /// once `max` of them have been chained.
    #[must_use]
    pub fn with_max_trigger_cascade(max: u32) -> Self {
        Self {
            inner: Arc::new(Inner {
                devices: RwLock::new(BTreeMap::new()),
                triggers: RwLock::new(Vec::new()),
                max_trigger_cascade: max,
                health_check: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakRegistry {
        WeakRegistry(Arc::downgrade(&self.inner))
    }

    // ── Devices ────────────────────────────────────────────────────

    /// Register `device` under its id, replacing (and returning) any device
    /// previously registered under the same id.
    pub fn register_device(&self, device: Arc<dyn Device>) -> Option<Arc<dyn Device>> {
        let device_id = device.id();
        let kind = device.kind();
        let previous = self.devices_mut().insert(device_id, device);
        if previous.is_some() {
            tracing::info!(%device_id, %kind, "device replaced");
        } else {
            tracing::info!(%device_id, %kind, "device registered");
        }
        previous
    }

    /// Remove the device registered under `device_id`. Removing an unknown
    /// id is a no-op.
    pub fn unregister_device(&self, device_id: DeviceId) -> Option<Arc<dyn Device>> {
        let removed = self.devices_mut().remove(&device_id);
        if removed.is_some() {
            tracing::info!(%device_id, "device unregistered");
        }
        removed
    }

    #[must_use]
    pub fn device(&self, device_id: DeviceId) -> Option<Arc<dyn Device>> {
        self.devices().get(&device_id).cloned()
    }

    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices().len()
    }

    /// Deliver `notification` to every registered device.
    ///
    /// A device whose callback fails is logged and skipped; the others are
    /// still notified.
    pub fn notify_all(&self, notification: Option<&Notification>) {
        for device in self.devices_snapshot() {
            if let Err(err) = device.update(notification) {
                tracing::warn!(device_id = %device.id(), %err, "failed to notify device");
            }
        }
    }

    /// Snapshot of every device's status, ordered by id.
    #[must_use]
    pub fn status_report(&self) -> StatusReport {
        let devices = self
            .devices_snapshot()
            .iter()
            .map(|device| DeviceReport {
                id: device.id(),
                kind: device.kind(),
                status: device.status(),
            })
            .collect();
        StatusReport { devices }
    }

    // ── Commands ───────────────────────────────────────────────────

    /// Run `command` on the device registered under `device_id`.
    ///
    /// Failures are logged, never returned as errors.
    #[tracing::instrument(skip(self, retry))]
    pub async fn execute_command(
        &self,
        device_id: DeviceId,
        command: DeviceCommand,
        retry: &RetryPolicy,
    ) -> CommandOutcome {
        self.run(device_id, Mutation::Command(command), retry, 0)
            .await
    }

    /// Change the set point of the device registered under `device_id`,
    /// through the same pipeline as [`execute_command`](Self::execute_command).
    #[tracing::instrument(skip(self, retry))]
    pub async fn set_temperature(
        &self,
        device_id: DeviceId,
        value: f64,
        retry: &RetryPolicy,
    ) -> CommandOutcome {
        self.run(device_id, Mutation::SetTemperature(value), retry, 0)
            .await
    }

    async fn run(
        &self,
        device_id: DeviceId,
        mutation: Mutation,
        retry: &RetryPolicy,
        depth: u32,
    ) -> CommandOutcome {
        let Some(device) = self.device(device_id) else {
            tracing::warn!(%device_id, %mutation, "device not found, command dropped");
            return CommandOutcome::DeviceNotFound;
        };

        let result = retry
            .execute(|| std::future::ready(mutation.apply(device.as_ref())))
            .await;

        match result {
            Ok(()) => {
                let status = device.status();
                tracing::info!(%device_id, %mutation, %status, "command applied");
                self.notify_all(Some(&Notification::StateChanged { device_id, status }));
                self.evaluate_at_depth(depth);
                CommandOutcome::Applied
            }
            Err(err) => {
                if err.is_exhausted() {
                    tracing::error!(%device_id, %mutation, error = ?err, "command failed after retries");
                } else {
                    tracing::error!(%device_id, %mutation, %err, "command rejected");
                }
                CommandOutcome::Failed(err)
            }
        }
    }

    // ── Triggers ───────────────────────────────────────────────────

    /// Register a standing trigger; it stays until [`remove_trigger`](Self::remove_trigger).
    pub fn add_trigger(&self, trigger: Trigger) -> TriggerId {
        let id = TriggerId::new();
        tracing::info!(
            trigger_id = %id,
            condition = %trigger.condition,
            action = %trigger.action,
            "trigger added"
        );
        self.triggers_mut()
            .push(Arc::new(RegisteredTrigger { id, trigger }));
        id
    }

    /// Returns whether a trigger with that id was registered.
    pub fn remove_trigger(&self, id: TriggerId) -> bool {
        let mut triggers = self.triggers_mut();
        let before = triggers.len();
        triggers.retain(|registered| registered.id != id);
        let removed = triggers.len() != before;
        if removed {
            tracing::info!(trigger_id = %id, "trigger removed");
        }
        removed
    }

    /// Registered triggers, in registration order.
    #[must_use]
    pub fn list_triggers(&self) -> Vec<TriggerSummary> {
        self.triggers()
            .iter()
            .map(|registered| TriggerSummary::from(registered.as_ref()))
            .collect()
    }

    /// Evaluate every trigger against every device and run the actions of
    /// those that hold. Returns how many actions were started.
    ///
    /// Triggers are visited in registration order. For each trigger whose
    /// metric is recognised, every device reporting that metric is checked,
    /// and the action runs once per matching device. A failing action is
    /// logged and does not stop the pass.
    pub fn evaluate_triggers(&self) -> usize {
        self.evaluate_at_depth(0)
    }

    fn evaluate_at_depth(&self, depth: u32) -> usize {
        if depth >= self.inner.max_trigger_cascade {
            tracing::warn!(
                depth,
                max = self.inner.max_trigger_cascade,
                "trigger cascade limit reached, skipping evaluation"
            );
            return 0;
        }

        let triggers = self.triggers_snapshot();
        if triggers.is_empty() {
            return 0;
        }
        let devices = self.devices_snapshot();

        let mut fired = 0;
        for registered in &triggers {
            let condition = &registered.trigger.condition;
            let Some(metric) = condition.recognized_metric() else {
                tracing::trace!(trigger_id = %registered.id, metric = %condition.metric, "unrecognised metric");
                continue;
            };
            for device in &devices {
                let Some(value) = device.status().metric(metric) else {
                    continue;
                };
                if !condition.holds(value) {
                    continue;
                }
                fired += 1;
                let firing = TriggerFiring {
                    trigger_id: registered.id,
                    device_id: device.id(),
                    value,
                };
                self.fire(&registered.trigger.action, &firing, depth);
            }
        }
        fired
    }

    fn fire(&self, action: &TriggerAction, firing: &TriggerFiring, depth: u32) {
        tracing::info!(
            trigger_id = %firing.trigger_id,
            device_id = %firing.device_id,
            value = firing.value,
            %action,
            "trigger fired"
        );
        match action {
            TriggerAction::Callback(callback) => {
                if let Err(err) = callback(firing) {
                    tracing::warn!(trigger_id = %firing.trigger_id, %err, "trigger action failed");
                }
            }
            TriggerAction::Command {
                device_id,
                command,
                retry,
            } => {
                let task = command_task(
                    self.clone(),
                    *device_id,
                    Mutation::Command(*command),
                    *retry,
                    depth + 1,
                );
                match Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(task);
                    }
                    Err(err) => {
                        tracing::error!(trigger_id = %firing.trigger_id, %err, "no runtime to run trigger command");
                    }
                }
            }
        }
    }

    // ── Health check ───────────────────────────────────────────────

    /// Spawn the periodic health check, replacing a running one.
    ///
    /// The task only logs the device count and ends once every handle to
    /// the registry is gone. Must be called from within a Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub fn start_health_check(&self, period: Duration) {
        let registry = self.downgrade();
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                tracing::debug!(devices = registry.device_count(), "hub health check");
            }
        });
        if let Some(previous) = self.health_check_slot().replace(handle) {
            previous.abort();
        }
    }

    /// Whether a health check task is currently running.
    #[must_use]
    pub fn is_health_check_running(&self) -> bool {
        self.health_check_slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop background work owned by the hub.
    pub fn shutdown(&self) {
        if let Some(handle) = self.health_check_slot().take() {
            handle.abort();
            tracing::debug!("hub health check stopped");
        }
    }

    // ── Locking helpers ────────────────────────────────────────────

    fn devices(&self) -> RwLockReadGuard<'_, DeviceMap> {
        self.inner
            .devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn devices_mut(&self) -> RwLockWriteGuard<'_, DeviceMap> {
        self.inner
            .devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn devices_snapshot(&self) -> Vec<Arc<dyn Device>> {
        self.devices().values().cloned().collect()
    }

    fn triggers(&self) -> RwLockReadGuard<'_, Vec<Arc<RegisteredTrigger>>> {
        self.inner
            .triggers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn triggers_mut(&self) -> RwLockWriteGuard<'_, Vec<Arc<RegisteredTrigger>>> {
        self.inner
            .triggers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn triggers_snapshot(&self) -> Vec<Arc<RegisteredTrigger>> {
        self.triggers().clone()
    }

    fn health_check_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner
            .health_check
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A trigger-issued command, boxed so it can be spawned from inside the
/// pipeline it re-enters.
fn command_task(
    registry: DeviceRegistry,
    device_id: DeviceId,
    mutation: Mutation,
    retry: RetryPolicy,
    depth: u32,
) -> BoxFuture<()> {
    Box::pin(async move {
        registry.run(device_id, mutation, &retry, depth).await;
    })
}
