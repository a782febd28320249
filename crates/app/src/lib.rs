//! # smarthub-app
//!
//! Application layer — the **device port** and everything that drives it.
//!
//! ## Responsibilities
//! - Define the [`Device`](ports::Device) capability trait that device
//!   backends (adapters) implement, including the observer callback
//! - Decorate devices with a throttling [`proxy`] that rejects calls arriving
//!   faster than the minimum interval
//! - Mask transient faults with an exponential-backoff [`retry`] policy
//! - Own the set of devices and standing trigger rules in the
//!   [`registry`], running every command through
//!   lookup → retry → notify → evaluate triggers
//! - Fire recurring time-of-day jobs from the [`scheduler`]
//!
//! ## Dependency rule
//! Depends on `smarthub-domain` only (plus `tokio` for timers and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod error;
pub mod ports;
pub mod proxy;
pub mod registry;
pub mod retry;
pub mod scheduler;
pub mod trigger;

#[cfg(test)]
mod testing;
