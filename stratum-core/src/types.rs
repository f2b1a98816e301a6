//! Domain types for strategy synchronization.
//!
//! Strategy records and the wire bodies exchanged with the authority server
//! are all serializable via serde + serde_json. Maps are `BTreeMap`s so that
//! request bodies and the persisted cache serialize deterministically.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identity of the component whose strategies are being synchronized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentName(pub String);

impl ComponentName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ComponentName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ComponentName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Unique name of one strategy within a component's strategy set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StrategyName(pub String);

impl StrategyName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StrategyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for StrategyName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StrategyName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Strategy records
// ---------------------------------------------------------------------------

/// One configuration unit as delivered by the authority server.
///
/// `content` is raw bytes, carried as standard base64 in JSON. `fingerprint`
/// is the hex digest of those bytes. Entries the remote marks as unchanged
/// omit `id` and `alias`, so every field falls back to its default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyDetail {
    pub id: i64,
    pub alias: String,
    #[serde(with = "base64_content")]
    pub content: Vec<u8>,
    #[serde(rename = "content_md5")]
    pub fingerprint: String,
}

/// Base64 (standard alphabet, padded) for strategy payloads. `null` decodes
/// to an empty payload.
mod base64_content {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(content: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(content))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD.decode(encoded.as_bytes()).map_err(D::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}

/// The authoritative configuration snapshot for a component.
pub type StrategyMap = BTreeMap<StrategyName, StrategyDetail>;

// ---------------------------------------------------------------------------
// Wire bodies
// ---------------------------------------------------------------------------

/// Body POSTed to the authority server on every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub hostname: String,
    pub component_name: ComponentName,
    pub strategy_md5_map: BTreeMap<StrategyName, String>,
}

/// Body returned by the authority server.
///
/// `code` and `msg` are informational; only `data` drives reconciliation.
/// A `null` or missing `data` decodes as `None` and is treated as an empty map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncResponse {
    pub code: i64,
    pub msg: String,
    pub data: Option<StrategyMap>,
}

impl SyncResponse {
    /// Wrap a strategy map in a successful response.
    pub fn with_data(data: StrategyMap) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Consume the response, yielding the returned strategies.
    pub fn into_strategies(self) -> StrategyMap {
        self.data.unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of one reconciliation cycle (or of seeding from the cache).
///
/// Delivered exactly once to the application's notify channel.
#[derive(Debug)]
pub enum SyncOutcome {
    /// The cycle completed; carries the new authoritative map.
    Success(Arc<StrategyMap>),
    /// The cycle failed; the previous snapshot is still authoritative.
    Failure(SyncError),
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Success(_))
    }

    pub fn strategies(&self) -> Option<&StrategyMap> {
        match self {
            SyncOutcome::Success(map) => Some(map.as_ref()),
            SyncOutcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            SyncOutcome::Success(_) => None,
            SyncOutcome::Failure(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<Arc<StrategyMap>, SyncError> {
        match self {
            SyncOutcome::Success(map) => Ok(map),
            SyncOutcome::Failure(err) => Err(err),
        }
    }
}

impl From<Result<Arc<StrategyMap>, SyncError>> for SyncOutcome {
    fn from(result: Result<Arc<StrategyMap>, SyncError>) -> Self {
        match result {
            Ok(map) => SyncOutcome::Success(map),
            Err(err) => SyncOutcome::Failure(err),
        }
    }
}
