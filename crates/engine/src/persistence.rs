//! Snapshot and restore of the shared store and the configuration object.
//!
//! Artifacts live under a deterministic directory derived from analysis
//! name, version, and a checkpoint label, so a later process pointed at the
//! same triple finds them again. Writes go through a temp file, fsync, and
//! rename; a partial write never becomes a valid snapshot.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::store::DataStore;

/// File name of the serialized store inside a snapshot directory.
pub const STORE_ARTIFACT: &str = "store.json";
/// File name of the serialized configuration inside a snapshot directory.
pub const CONFIG_ARTIFACT: &str = "config.json";

/// Error surfaced by snapshot and restore operations. Fatal to the
/// operation, but never retroactively invalidates in-memory results.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem write failed (disk full, permissions, missing parent).
    #[error("failed to write snapshot artifact '{}': {source}", path.display())]
    Write {
        /// Artifact or directory being written.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// Filesystem read failed.
    #[error("failed to read snapshot artifact '{}': {source}", path.display())]
    Read {
        /// Artifact being read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// Value could not be serialized.
    #[error("failed to encode snapshot artifact '{}': {source}", path.display())]
    Encode {
        /// Artifact being encoded.
        path: PathBuf,
        /// Underlying serializer failure.
        source: serde_json::Error,
    },
    /// Artifact bytes could not be deserialized.
    #[error("failed to decode snapshot artifact '{}': {source}", path.display())]
    Decode {
        /// Artifact being decoded.
        path: PathBuf,
        /// Underlying deserializer failure.
        source: serde_json::Error,
    },
}

/// Deterministic snapshot directory for one `(analysis, version, label)`
/// triple: `<results_dir>/<analysis>/snapshots/v<version>/<label>/`.
pub fn snapshot_dir(results_dir: &Path, analysis_name: &str, version: u32, label: &str) -> PathBuf {
    results_dir
        .join(analysis_name)
        .join("snapshots")
        .join(format!("v{version}"))
        .join(label)
}

/// Serializes the store and configuration into `dir`.
///
/// Snapshotting an unchanged store and configuration twice produces
/// byte-for-byte identical artifacts: both serialize insertion-ordered maps
/// as pretty JSON with no volatile fields.
pub fn snapshot(store: &DataStore, config: &RunConfig, dir: &Path) -> Result<(), PersistenceError> {
    fs::create_dir_all(dir).map_err(|source| PersistenceError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    write_artifact(&dir.join(STORE_ARTIFACT), store)?;
    write_artifact(&dir.join(CONFIG_ARTIFACT), config)?;

    info!(path = %dir.display(), entries = store.len(), "snapshot written");
    Ok(())
}

/// Loads a store and configuration pair previously written by [`snapshot`],
/// ready to be installed as the active state of a fresh process.
pub fn restore(dir: &Path) -> Result<(DataStore, RunConfig), PersistenceError> {
    let store: DataStore = read_artifact(&dir.join(STORE_ARTIFACT))?;
    let config: RunConfig = read_artifact(&dir.join(CONFIG_ARTIFACT))?;
    debug!(path = %dir.display(), entries = store.len(), "snapshot restored");
    Ok((store, config))
}

fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let mut payload = serde_json::to_vec_pretty(value).map_err(|source| PersistenceError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    payload.push(b'\n');
    write_bytes_atomically(path, &payload)
}

fn write_bytes_atomically(path: &Path, payload: &[u8]) -> Result<(), PersistenceError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp_path = build_temp_path(parent);

    let result = (|| {
        let mut temp_file = File::create(&temp_path)?;
        temp_file.write_all(payload)?;
        temp_file.sync_all()?;
        drop(temp_file);
        fs::rename(&temp_path, path)
    })();

    if let Err(source) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(PersistenceError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

fn build_temp_path(parent: &Path) -> PathBuf {
    let process_id = std::process::id();
    let timestamp_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos())
        .unwrap_or_default();
    parent.join(format!(".snapshot-{process_id}-{timestamp_nanos}.tmp"))
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, PersistenceError> {
    let payload = fs::read_to_string(path).map_err(|source| PersistenceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&payload).map_err(|source| PersistenceError::Decode {
        path: path.to_path_buf(),
        source,
    })
}
