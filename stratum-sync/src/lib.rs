//! # stratum-sync
//!
//! Hash-gated reconciliation of a component's strategy set.
//!
//! [`Reconciler::reconcile`] performs one cycle: fingerprint the local map,
//! exchange it with the authority server through a [`StrategyTransport`],
//! merge the answer, swap the in-memory snapshot and persist it to the
//! durable [`cache`].

pub mod cache;
pub mod fingerprint;
pub mod observer;
pub mod reconcile;
pub mod transport;

pub use fingerprint::{classify, fingerprint, Verdict, UNCHANGED_SENTINEL};
pub use observer::{LogObserver, SyncObserver};
pub use reconcile::Reconciler;
pub use transport::{HttpTransport, MockTransport, StrategyTransport};
