//! Affinity coordinator.
//!
//! The coordinator owns the deferred task queue and the live-context counter,
//! and runs the parking loop on the affinity thread: the thread that created
//! it, conventionally `main`.
//!
//! Lifetime rules:
//! - create one coordinator per process, before any context;
//! - contexts keep it alive through an `Arc`, so the native library is only
//!   terminated after the last context is gone;
//! - call [`Coordinator::park_thread`] on the affinity thread and drop the
//!   coordinator there once it returns.

mod affinity;
mod phase;

use std::time::Duration;

pub use affinity::Coordinator;
pub use phase::Phase;

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Upper bound of one native event wait in the parking loop.
    ///
    /// The loop re-checks the live-context counter at least this often, even
    /// when no wake-up is posted.
    pub poll_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(100),
        }
    }
}
