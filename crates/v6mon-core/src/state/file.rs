// # File State Stores
//
// File-based implementations of SnapshotStore and MappingStateStore.
//
// ## Durability
//
// - Atomic writes: new state goes to a `.tmp` sibling first, then an atomic
//   rename replaces the document. A reader never observes a partial write.
// - Missing document: the documented default state is returned.
// - Corrupt document: the default state is returned and a warning logged;
//   the next successful cycle overwrites the corrupt file.
//
// ## File Formats
//
// Monitoring state:
//
// ```json
// {
//   "timestamp": "2026-08-07T12:00:00Z",
//   "interfaces": { "igc0": { "active": true, "address_count": 2, "mtu": 1500 } },
//   "gateways": { "fe80::1%igc0": { "interface": "igc0", "reachable": true, ... } },
//   "connectivity": { "2001:4860:4860::8888": { "reachable": true, ... } },
//   "delegation_status": { "att": { "has_delegation": true, ... } },
//   "overall_status": "healthy"
// }
// ```
//
// Mapping state:
//
// ```json
// {
//   "last_run": 1754550000.0,
//   "last_prefix_times": { "/tmp/igc0_prefixv6": 1754549000.0 },
//   "current_mappings": { "fd03:17ac:e938:10::/64": { "external_prefix": "...", ... } }
// }
// ```

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::mapping::MappingState;
use crate::status::MonitoringSnapshot;
use crate::traits::{MappingStateStore, SnapshotStore};

/// Create the parent directory of `path` if it doesn't exist yet
async fn ensure_parent(path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::state_store(format!(
                    "failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}

/// Load a JSON document, substituting the default value when the file is
/// absent or unreadable/corrupt (the latter with a warning)
async fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("state file does not exist: {}", path.display());
            return T::default();
        }
        Err(e) => {
            tracing::warn!("failed to read state file {}: {}", path.display(), e);
            return T::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                "state file {} is corrupt, starting from defaults: {}",
                path.display(),
                e
            );
            T::default()
        }
    }
}

/// Write a JSON document via write-temp-then-atomic-rename
async fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(value)?;

    let mut temp = path.to_path_buf();
    temp.set_extension("tmp");

    {
        let mut file = fs::File::create(&temp).await.map_err(|e| {
            Error::state_store(format!(
                "failed to create temp file {}: {}",
                temp.display(),
                e
            ))
        })?;

        file.write_all(json.as_bytes()).await.map_err(|e| {
            Error::state_store(format!(
                "failed to write temp file {}: {}",
                temp.display(),
                e
            ))
        })?;

        file.flush().await.map_err(|e| {
            Error::state_store(format!(
                "failed to flush temp file {}: {}",
                temp.display(),
                e
            ))
        })?;
    }

    fs::rename(&temp, path).await.map_err(|e| {
        Error::state_store(format!(
            "failed to rename {} to {}: {}",
            temp.display(),
            path.display(),
            e
        ))
    })?;

    tracing::trace!("state written to {}", path.display());
    Ok(())
}

/// File-backed store for the monitoring snapshot
#[derive(Debug)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store at `path`, creating parent directories as needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        ensure_parent(&path).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> Result<MonitoringSnapshot, Error> {
        Ok(load_or_default(&self.path).await)
    }

    async fn store(&self, snapshot: &MonitoringSnapshot) -> Result<(), Error> {
        write_atomic(&self.path, snapshot).await
    }
}

/// File-backed store for the mapping state
#[derive(Debug)]
pub struct FileMappingStore {
    path: PathBuf,
}

impl FileMappingStore {
    /// Create a store at `path`, creating parent directories as needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        ensure_parent(&path).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MappingStateStore for FileMappingStore {
    async fn load(&self) -> Result<MappingState, Error> {
        Ok(load_or_default(&self.path).await)
    }

    async fn store(&self, state: &MappingState) -> Result<(), Error> {
        write_atomic(&self.path, state).await
    }
}
