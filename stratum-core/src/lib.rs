//! Stratum core library: domain types, configuration, errors.
//!
//! Public API surface:
//! - [`types`]: newtypes, strategy records, wire bodies and [`SyncOutcome`]
//! - [`config`]: [`SyncConfig`] and its validating builder
//! - [`error`]: [`ConfigError`] and [`SyncError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{SyncConfig, SyncConfigBuilder, TagFn};
pub use error::{ConfigError, SyncError};
pub use types::{
    ComponentName, StrategyDetail, StrategyMap, StrategyName, SyncOutcome, SyncRequest,
    SyncResponse,
};
