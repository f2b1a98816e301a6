//! Durable cache: last known-good strategy map on disk.
//!
//! The file is a JSON object keyed by strategy name. Writes use the atomic
//! `.tmp` + rename pattern so a crash mid-write never leaves a torn file.
//! Reads are best-effort: anything unreadable is "no cache".

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use stratum_core::error::io_err;
use stratum_core::{StrategyMap, SyncError};

/// Load the cached map at `path`.
///
/// Returns `None` if the file is missing, unreadable or not a valid map.
pub fn load(path: &Path) -> Option<StrategyMap> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!("no strategy cache at {}", path.display());
            return None;
        }
        Err(err) => {
            tracing::warn!("ignoring unreadable strategy cache {}: {}", path.display(), err);
            return None;
        }
    };
    match serde_json::from_str::<StrategyMap>(&contents) {
        Ok(map) => {
            tracing::debug!("loaded {} cached strategies from {}", map.len(), path.display());
            Some(map)
        }
        Err(err) => {
            tracing::warn!("ignoring corrupt strategy cache {}: {}", path.display(), err);
            None
        }
    }
}

/// Save `map` to `path`, replacing whatever was there.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save(path: &Path, map: &StrategyMap) -> Result<(), SyncError> {
    save_with_tmp(path, map, &tmp_path(path))
}

fn save_with_tmp(path: &Path, map: &StrategyMap, tmp: &Path) -> Result<(), SyncError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let json = serde_json::to_string_pretty(map)?;
    std::fs::write(tmp, &json).map_err(|e| io_err(tmp, e))?;
    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    tracing::debug!("saved {} strategies to {}", map.len(), path.display());
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
