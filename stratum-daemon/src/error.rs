use std::path::PathBuf;

use thiserror::Error;

/// Error surface for starting and running a [`crate::Syncer`].
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] stratum_core::ConfigError),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("syncer cannot start from state {0}")]
    InvalidState(crate::SyncerState),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
