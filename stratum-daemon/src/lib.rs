//! Background scheduler that keeps a component's strategies in sync.
//!
//! A [`Syncer`] seeds itself from the durable cache, then runs a
//! reconciliation cycle on a fixed interval on its own thread, delivering
//! every [`stratum_core::SyncOutcome`] to the application's notify channel.

mod error;
mod notifier;
mod runtime;

pub use error::DaemonError;
pub use notifier::Notifier;
pub use runtime::{init_tracing, Syncer, SyncerState};
