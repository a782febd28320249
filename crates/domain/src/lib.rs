//! # smarthub-domain
//!
//! Pure domain model for the smarthub automation hub.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error taxonomy, time of day
//! - Define **Devices** descriptors: kind, spec, status snapshot, commands
//! - Define **Trigger conditions** (metric, operator, threshold)
//! - Classify faults as transient (retryable) or misuse (never retried)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or IO crates.
//! Behaviour that needs a runtime (retries, scheduling, fan-out) lives in
//! the `app` crate.

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod trigger;
