//! Throttling proxy — a transparent [`Device`] decorator that enforces a
//! minimum interval between state-changing calls.
//!
//! Calls arriving too soon fail with [`DeviceError::RateLimited`] and never
//! reach the wrapped device. Failures of delegated calls are logged and
//! returned unchanged; retrying is the caller's business.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use smarthub_domain::device::{DeviceKind, DeviceStatus};
use smarthub_domain::error::DeviceError;
use smarthub_domain::id::DeviceId;

use crate::ports::{Device, Notification};

/// Minimum spacing between two accepted calls on one proxy.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(50);

/// Rate-limiting wrapper around a device.
pub struct ThrottledDevice<D> {
    inner: D,
    min_interval: Duration,
    last_accepted: Mutex<Option<Instant>>,
}

impl<D: Device> ThrottledDevice<D> {
    /// Wrap `inner` with the default 50 ms interval.
    pub fn new(inner: D) -> Self {
        Self::with_interval(inner, DEFAULT_MIN_INTERVAL)
    }

    pub fn with_interval(inner: D, min_interval: Duration) -> Self {
        Self {
            inner,
            min_interval,
            last_accepted: Mutex::new(None),
        }
    }

    /// Access the wrapped device.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    fn throttle(&self) -> Result<(), DeviceError> {
        let now = Instant::now();
        let mut last = self
            .last_accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = *last {
            if now.duration_since(previous) < self.min_interval {
                tracing::warn!(device_id = %self.inner.id(), "call rejected by throttle");
                return Err(DeviceError::RateLimited {
                    id: self.inner.id(),
                });
            }
        }
        *last = Some(now);
        Ok(())
    }

    fn delegate(
        &self,
        operation: &'static str,
        call: impl FnOnce(&D) -> Result<(), DeviceError>,
    ) -> Result<(), DeviceError> {
        self.throttle()?;
        call(&self.inner).inspect_err(|err| {
            tracing::warn!(device_id = %self.inner.id(), operation, %err, "device operation failed");
        })
    }
}

impl<D: Device> Device for ThrottledDevice<D> {
    fn id(&self) -> DeviceId {
        self.inner.id()
    }

    fn kind(&self) -> DeviceKind {
        self.inner.kind()
    }

    fn status(&self) -> DeviceStatus {
        self.inner.status()
    }

    fn turn_on(&self) -> Result<(), DeviceError> {
        self.delegate("turn_on", D::turn_on)
    }

    fn turn_off(&self) -> Result<(), DeviceError> {
        self.delegate("turn_off", D::turn_off)
    }

    fn set_temperature(&self, value: f64) -> Result<(), DeviceError> {
        self.delegate("set_temperature", |device| device.set_temperature(value))
    }

    fn update(&self, notification: Option<&Notification>) -> Result<(), DeviceError> {
        self.inner.update(notification)
    }
}
