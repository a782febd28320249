//! In-memory device double shared by the unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use smarthub_domain::device::{DeviceKind, DeviceStatus};
use smarthub_domain::error::DeviceError;
use smarthub_domain::id::DeviceId;

use crate::ports::{Device, Notification};

pub struct FakeDevice {
    id: DeviceId,
    kind: DeviceKind,
    status: Mutex<DeviceStatus>,
    busy_for: AtomicUsize,
    pub calls: AtomicUsize,
    pub updates: AtomicUsize,
    pub fail_updates: AtomicBool,
    pub last_notification: Mutex<Option<Notification>>,
}

impl FakeDevice {
    pub fn light(id: u32) -> Self {
        Self::new(id, DeviceKind::Light, DeviceStatus::switch(false))
    }

    pub fn thermostat(id: u32, temperature: f64) -> Self {
        Self::new(
            id,
            DeviceKind::Thermostat,
            DeviceStatus::thermostat(false, temperature),
        )
    }

    fn new(id: u32, kind: DeviceKind, status: DeviceStatus) -> Self {
        Self {
            id: DeviceId::new(id),
            kind,
            status: Mutex::new(status),
            busy_for: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            fail_updates: AtomicBool::new(false),
            last_notification: Mutex::new(None),
        }
    }

    /// Make the next `n` mutations fail with [`DeviceError::Busy`].
    pub fn busy_for(self, n: usize) -> Self {
        self.busy_for.store(n, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn mutate(&self, f: impl FnOnce(&mut DeviceStatus)) -> Result<(), DeviceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let busy = self
            .busy_for
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if busy {
            return Err(DeviceError::Busy { id: self.id });
        }
        f(&mut self.status.lock().unwrap());
        Ok(())
    }
}

impl Device for FakeDevice {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn kind(&self) -> DeviceKind {
        self.kind
    }

    fn status(&self) -> DeviceStatus {
        *self.status.lock().unwrap()
    }

    fn turn_on(&self) -> Result<(), DeviceError> {
        self.mutate(|s| s.on = true)
    }

    fn turn_off(&self) -> Result<(), DeviceError> {
        self.mutate(|s| s.on = false)
    }

    fn set_temperature(&self, value: f64) -> Result<(), DeviceError> {
        if self.kind != DeviceKind::Thermostat {
            self.calls.fetch_add(1, Ordering::SeqCst);
            return Err(DeviceError::UnsupportedOperation {
                id: self.id,
                kind: self.kind,
                operation: "set_temperature",
            });
        }
        self.mutate(|s| s.temperature = Some(value))
    }

    fn update(&self, notification: Option<&Notification>) -> Result<(), DeviceError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        *self.last_notification.lock().unwrap() = notification.cloned();
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(DeviceError::Busy { id: self.id });
        }
        Ok(())
    }
}
