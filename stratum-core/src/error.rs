//! Error types for stratum-core.

use std::path::PathBuf;

use thiserror::Error;

/// Raised synchronously by [`crate::SyncConfigBuilder::build`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("target url is required")]
    MissingTargetUrl,

    #[error("invalid target url '{url}': {reason}")]
    InvalidTargetUrl { url: String, reason: String },

    #[error("basic auth password is required")]
    MissingCredentials,

    #[error("component name is required")]
    MissingComponent,

    #[error("polling interval must be greater than 0")]
    InvalidInterval,

    #[error("request timeout must be greater than 0")]
    InvalidTimeout,

    #[error("notify channel is required")]
    MissingNotifyChannel,
}

/// Everything that can make a single reconciliation cycle fail.
///
/// These never propagate out of the scheduler; they travel to the
/// application inside [`crate::SyncOutcome::Failure`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// Connection refused, DNS failure, timeout and similar.
    #[error("transport error: {0}")]
    Transport(String),

    /// The authority server answered with something other than 200.
    #[error("unexpected status code: {0}")]
    Status(u16),

    /// The response body could not be read or decoded.
    #[error("malformed response body: {0}")]
    Decode(String),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (cache file).
    #[error("cache JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The reconciliation task panicked; the scheduler kept running.
    #[error("reconciliation task panicked: {0}")]
    Panicked(String),
}

/// Convenience constructor for [`SyncError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
