//! Remote reconciliation: one poll/compare/merge/persist cycle.
//!
//! ## Cycle steps
//!
//! 1. Snapshot the current map and fingerprint every entry.
//! 2. Exchange the fingerprints with the authority server.
//! 3. Merge: carry forward "unchanged", accept verified, drop the rest.
//! 4. Swap the merged map in as the new authoritative snapshot.
//! 5. Persist it to the durable cache (best-effort).
//!
//! A failure in step 2 returns before step 4, so a failed cycle never touches
//! either the in-memory snapshot or the cache file.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use stratum_core::{
    ComponentName, StrategyMap, SyncConfig, SyncError, SyncOutcome, SyncRequest, TagFn,
};

use crate::cache;
use crate::fingerprint::{classify, Verdict};
use crate::observer::{LogObserver, SyncObserver};
use crate::transport::StrategyTransport;

/// Owns the authoritative strategy map and drives reconciliation cycles.
///
/// The map is never mutated in place: each successful cycle swaps a new
/// `Arc<StrategyMap>` in under a short write lock, so readers holding an
/// older snapshot keep a consistent view.
pub struct Reconciler {
    transport: Arc<dyn StrategyTransport>,
    observer: Arc<dyn SyncObserver>,
    component: ComponentName,
    tag_fn: TagFn,
    cache_path: PathBuf,
    current: RwLock<Arc<StrategyMap>>,
}

impl Reconciler {
    pub fn new(config: &SyncConfig, transport: Arc<dyn StrategyTransport>) -> Self {
        Self {
            transport,
            observer: Arc::new(LogObserver),
            component: config.component().clone(),
            tag_fn: config.tag_fn(),
            cache_path: config.cache_path().to_path_buf(),
            current: RwLock::new(Arc::new(StrategyMap::new())),
        }
    }

    /// Replace the default [`LogObserver`].
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Current authoritative snapshot.
    pub fn snapshot(&self) -> Arc<StrategyMap> {
        self.current.read().clone()
    }

    /// Seed the in-memory map from the durable cache, if one is readable.
    pub fn seed_from_cache(&self) -> Option<Arc<StrategyMap>> {
        let cached = Arc::new(cache::load(&self.cache_path)?);
        tracing::info!(
            "seeded {} strategies from {}",
            cached.len(),
            self.cache_path.display()
        );
        *self.current.write() = cached.clone();
        Some(cached)
    }

    /// Request body advertising what we hold for `current`.
    pub fn build_request(&self, current: &StrategyMap) -> SyncRequest {
        SyncRequest {
            hostname: (self.tag_fn)(),
            component_name: self.component.clone(),
            strategy_md5_map: current
                .iter()
                .map(|(name, detail)| (name.clone(), detail.fingerprint.clone()))
                .collect(),
        }
    }

    /// Round trip plus merge against `current`; no state is touched.
    pub fn reconcile_against(&self, current: &StrategyMap) -> Result<StrategyMap, SyncError> {
        let request = self.build_request(current);
        let response = self.transport.exchange(&request)?;
        tracing::debug!(
            "authority answered code={} msg='{}'",
            response.code,
            response.msg
        );
        Ok(merge(current, response.into_strategies(), self.observer.as_ref()))
    }

    /// Run one full cycle and report its outcome.
    pub fn reconcile(&self) -> SyncOutcome {
        let current = self.snapshot();
        let merged = match self.reconcile_against(&current) {
            Ok(merged) => Arc::new(merged),
            Err(err) => {
                tracing::warn!("strategy sync failed: {}", err);
                return SyncOutcome::Failure(err);
            }
        };

        *self.current.write() = merged.clone();

        if let Err(err) = cache::save(&self.cache_path, &merged) {
            self.observer.on_persist_failed(&self.cache_path, &err);
        }

        tracing::info!(
            "strategy sync complete: {} strategies ({} before)",
            merged.len(),
            current.len()
        );
        SyncOutcome::Success(merged)
    }
}

/// Build the next map solely from the remote's keys.
///
/// Names held locally but absent from `remote` are dropped.
pub fn merge(
    current: &StrategyMap,
    remote: StrategyMap,
    observer: &dyn SyncObserver,
) -> StrategyMap {
    let mut next = StrategyMap::new();
    for (name, detail) in remote {
        let local = current.get(&name);
        match classify(&detail, local) {
            Verdict::CarryForward => {
                if let Some(local) = local {
                    next.insert(name, local.clone());
                }
            }
            Verdict::Accept => {
                next.insert(name, detail);
            }
            Verdict::Reject { declared, computed } => {
                observer.on_rejected(&name, &declared, &computed);
            }
        }
    }
    next
}
