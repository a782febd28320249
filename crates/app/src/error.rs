//! Errors raised by user-supplied callbacks (trigger actions, scheduled jobs).

use smarthub_domain::error::DeviceError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure reported by a trigger action or a scheduled job.
///
/// These are logged by whoever ran the callback and never propagated further.
#[derive(Debug, thiserror::Error)]
#[error("callback failed: {0}")]
pub struct CallbackError(#[source] BoxError);

impl CallbackError {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self(source.into())
    }
}

impl From<DeviceError> for CallbackError {
    fn from(err: DeviceError) -> Self {
        Self(Box::new(err))
    }
}
