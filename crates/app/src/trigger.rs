//! Trigger rules — a [`Condition`] on a device metric paired with the action
//! to run whenever a device's reading satisfies it.
//!
//! Evaluation itself lives in the [`registry`](crate::registry), which owns
//! the rule set and the devices the rules scan.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use smarthub_domain::device::DeviceCommand;
use smarthub_domain::id::{DeviceId, TriggerId};
use smarthub_domain::trigger::Condition;

use crate::error::CallbackError;
use crate::retry::RetryPolicy;

/// Synchronous callback run inline during evaluation.
pub type TriggerCallback = Arc<dyn Fn(&TriggerFiring) -> Result<(), CallbackError> + Send + Sync>;

/// What a trigger does when it fires.
#[derive(Clone)]
pub enum TriggerAction {
    /// Run a command through the registry pipeline, as its own task.
    Command {
        device_id: DeviceId,
        command: DeviceCommand,
        retry: RetryPolicy,
    },
    /// Call a function inline; an error is logged and evaluation continues.
    Callback(TriggerCallback),
}

impl fmt::Debug for TriggerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command {
                device_id,
                command,
                retry,
            } => f
                .debug_struct("Command")
                .field("device_id", device_id)
                .field("command", command)
                .field("retry", retry)
                .finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl fmt::Display for TriggerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command {
                device_id, command, ..
            } => write!(f, "{command}({device_id})"),
            Self::Callback(_) => f.write_str("callback"),
        }
    }
}

/// A standing rule. It stays registered until removed; it is not one-shot.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub condition: Condition,
    pub action: TriggerAction,
}

impl Trigger {
    /// Fire `command` on `device_id` whenever the condition holds.
    #[must_use]
    pub fn command(
        condition: Condition,
        device_id: DeviceId,
        command: DeviceCommand,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            condition,
            action: TriggerAction::Command {
                device_id,
                command,
                retry,
            },
        }
    }

    /// Call `callback` whenever the condition holds.
    pub fn callback<F>(condition: Condition, callback: F) -> Self
    where
        F: Fn(&TriggerFiring) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        Self {
            condition,
            action: TriggerAction::Callback(Arc::new(callback)),
        }
    }
}

/// Context handed to an action: which rule fired, on which device, and the
/// reading that satisfied the condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerFiring {
    pub trigger_id: TriggerId,
    pub device_id: DeviceId,
    pub value: f64,
}

/// A trigger as stored by the registry.
#[derive(Debug)]
pub(crate) struct RegisteredTrigger {
    pub id: TriggerId,
    pub trigger: Trigger,
}

/// Read-only description of a registered trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerSummary {
    pub id: TriggerId,
    pub condition: Condition,
    pub action: String,
}

impl fmt::Display for TriggerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{condition: \"{}\"}}", self.condition)
    }
}

impl From<&RegisteredTrigger> for TriggerSummary {
    fn from(registered: &RegisteredTrigger) -> Self {
        Self {
            id: registered.id,
            condition: registered.trigger.condition.clone(),
            action: registered.trigger.action.to_string(),
        }
    }
}
