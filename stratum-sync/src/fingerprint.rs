//! Content fingerprints and the change-status decision.
//!
//! Fingerprints are lowercase hex MD5 digests: the authority server fills
//! `content_md5` with the same algorithm, and stored fingerprints are compared
//! byte-for-byte against freshly computed ones. They detect change; they are
//! not a security boundary.

use md5::{Digest, Md5};

use stratum_core::StrategyDetail;

/// Content bytes the remote sends in place of a body that has not changed
/// since the fingerprint we reported. Never hashed.
pub const UNCHANGED_SENTINEL: &[u8] = b"__STRATEGY_UNCHANGED__";

/// Hex digest of `content`.
pub fn fingerprint(content: &[u8]) -> String {
    let mut h = Md5::new();
    h.update(content);
    hex::encode(h.finalize())
}

pub fn is_unchanged_sentinel(content: &[u8]) -> bool {
    content == UNCHANGED_SENTINEL
}

/// What to do with one entry of the remote's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Remote says "unchanged" and we hold the entry: keep the local copy.
    CarryForward,
    /// Declared fingerprint matches the returned content: take the remote copy.
    Accept,
    /// Neither: drop the entry entirely.
    Reject { declared: String, computed: String },
}

/// Decide the fate of `remote`, given the local entry of the same name.
///
/// Precedence: carry-forward, then fingerprint match, then reject. A sentinel
/// for a name we do not hold falls through to the fingerprint check and, in
/// practice, is rejected.
pub fn classify(remote: &StrategyDetail, local: Option<&StrategyDetail>) -> Verdict {
    if is_unchanged_sentinel(&remote.content) && local.is_some() {
        return Verdict::CarryForward;
    }
    let computed = fingerprint(&remote.content);
    if computed == remote.fingerprint {
        Verdict::Accept
    } else {
        Verdict::Reject {
            declared: remote.fingerprint.clone(),
            computed,
        }
    }
}
