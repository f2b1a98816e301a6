//! Diagnostics hook for events that do not change a cycle's outcome.
//!
//! Rejected entries and failed cache writes are invisible in the
//! [`stratum_core::SyncOutcome`] delivered to the application. Implement
//! [`SyncObserver`] to surface them; [`LogObserver`] (the default) logs them.

use std::path::Path;

use stratum_core::{StrategyName, SyncError};

pub trait SyncObserver: Send + Sync {
    /// An entry failed fingerprint validation and was dropped from the new map.
    fn on_rejected(&self, _name: &StrategyName, _declared: &str, _computed: &str) {}

    /// The reconciled map could not be written to the durable cache.
    fn on_persist_failed(&self, _path: &Path, _error: &SyncError) {}
}

/// Emits a warn-level log record for every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl SyncObserver for LogObserver {
    fn on_rejected(&self, name: &StrategyName, declared: &str, computed: &str) {
        tracing::warn!(
            "dropping strategy '{}': declared fingerprint '{}' does not match content ({})",
            name,
            declared,
            computed
        );
    }

    fn on_persist_failed(&self, path: &Path, error: &SyncError) {
        tracing::warn!(
            "strategy cache not updated at {}: {} (in-memory snapshot stays authoritative)",
            path.display(),
            error
        );
    }
}
