//! Outbound delivery of sync outcomes to the owning application.

use stratum_core::SyncOutcome;
use tokio::sync::mpsc;

use crate::error::DaemonError;

/// Thin wrapper over the application's notify channel.
///
/// Delivery follows the channel's own buffering: a full channel makes the
/// sender wait, nothing is dropped or coalesced.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::Sender<SyncOutcome>,
}

impl Notifier {
    pub fn new(tx: mpsc::Sender<SyncOutcome>) -> Self {
        Self { tx }
    }

    pub async fn deliver(&self, outcome: SyncOutcome) -> Result<(), DaemonError> {
        self.tx
            .send(outcome)
            .await
            .map_err(|_| DaemonError::ChannelClosed("notify"))
    }

    /// True once the application has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
