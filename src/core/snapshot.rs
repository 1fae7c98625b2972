//! # Snapshot Persistence
//!
//! Saves a `HostState` to a single JSON file so the demo host can come back
//! where it left off. A snapshot carries a small metadata header next to
//! the state itself.
//!
//! All writes use atomic rename (write `.tmp`, then `rename()`) for crash safety.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::core::host::HostState;

/// Bumped whenever the saved shape changes incompatibly.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SnapshotMeta {
    pub id: String,
    pub saved_at: DateTime<Utc>,
    pub version: u32,
    pub router_count: usize,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Snapshot {
    pub meta: SnapshotMeta,
    pub host: HostState,
}

impl Snapshot {
    pub fn new(host: HostState) -> Self {
        Self {
            meta: SnapshotMeta {
                id: uuid::Uuid::new_v4().to_string(),
                saved_at: Utc::now(),
                version: SNAPSHOT_VERSION,
                router_count: host.navigator.routers.len(),
            },
            host,
        }
    }
}

/// Atomically write `data` as JSON to `path` (via `.tmp` + rename).
fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Save a snapshot of `host` to `path`, creating parent directories.
pub fn save_snapshot(path: &Path, host: HostState) -> io::Result<SnapshotMeta> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let snapshot = Snapshot::new(host);
    atomic_write_json(path, &snapshot)?;
    info!(
        "Snapshot {} saved to {} ({} routers)",
        snapshot.meta.id,
        path.display(),
        snapshot.meta.router_count
    );
    Ok(snapshot.meta)
}

/// Load the snapshot at `path`. A missing file is `Ok(None)`; a snapshot
/// from another version is discarded with a warning.
pub fn load_snapshot(path: &Path) -> io::Result<Option<Snapshot>> {
    if !path.exists() {
        debug!("No snapshot at {}", path.display());
        return Ok(None);
    }
    let json = fs::read_to_string(path)?;
    let snapshot: Snapshot =
        serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if snapshot.meta.version != SNAPSHOT_VERSION {
        warn!(
            "Ignoring snapshot {} (version {}, expected {})",
            snapshot.meta.id, snapshot.meta.version, SNAPSHOT_VERSION
        );
        return Ok(None);
    }
    Ok(Some(snapshot))
}

/// Delete the snapshot at `path` if there is one.
pub fn delete_snapshot(path: &Path) -> io::Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persistence::{HostRouterState, NavigatorState, RouterState};

    fn host_with_routers(containers: &[&str]) -> HostState {
        HostState {
            navigator: NavigatorState {
                routers: containers
                    .iter()
                    .map(|container| HostRouterState {
                        container: (*container).into(),
                        router: RouterState::default(),
                    })
                    .collect(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let meta = save_snapshot(&path, host_with_routers(&["main", "side"])).unwrap();
        assert_eq!(meta.router_count, 2);
        assert_eq!(meta.version, SNAPSHOT_VERSION);

        let loaded = load_snapshot(&path).unwrap().unwrap();
        assert_eq!(loaded.meta, meta);
        assert_eq!(loaded.host, host_with_routers(&["main", "side"]));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_snapshot(&dir.path().join("nope.json")).unwrap().is_none());
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("state.json");
        save_snapshot(&path, HostState::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_file_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_snapshot(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_other_version_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut snapshot = Snapshot::new(HostState::default());
        snapshot.meta.version = SNAPSHOT_VERSION + 1;
        atomic_write_json(&path, &snapshot).unwrap();
        assert!(load_snapshot(&path).unwrap().is_none());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        save_snapshot(&path, HostState::default()).unwrap();
        delete_snapshot(&path).unwrap();
        assert!(!path.exists());
        delete_snapshot(&path).unwrap();
    }
}
