//! Snapshot persistence.
//!
//! The whole record set is rewritten on every flush. Writes go to
//! `{path}.tmp` first, then rename over the canonical path, so a reader (or a
//! crash mid-write) never observes a truncated snapshot.

use crate::capture::ProductRecord;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> SnapshotError + '_ {
    move |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// On-disk document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub count: usize,
    pub generated_at: String,
    pub products: Vec<Map<String, Value>>,
}

impl Snapshot {
    pub fn build(records: &[ProductRecord]) -> Self {
        Self {
            count: records.len(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false),
            products: records.iter().map(ProductRecord::to_snapshot_entry).collect(),
        }
    }
}

/// `{path}.tmp`, keeping the original extension in the name.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("snapshot"));
    name.push(".tmp");
    path.with_file_name(name)
}

#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize `records` and atomically replace the snapshot file.
    pub fn write(&self, records: &[ProductRecord]) -> Result<usize, SnapshotError> {
        let snapshot = Snapshot::build(records);
        let json = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let tmp = tmp_path(&self.path);
        {
            let mut file = std::fs::File::create(&tmp).map_err(io_err(&tmp))?;
            file.write_all(&json).map_err(io_err(&tmp))?;
            file.sync_all().map_err(io_err(&tmp))?;
        }
        std::fs::rename(&tmp, &self.path).map_err(io_err(&self.path))?;

        info!(
            "[💾] snapshot saved: {} products → {}",
            snapshot.count,
            self.path.display()
        );
        Ok(snapshot.count)
    }
}

/// Read a previously written snapshot.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, SnapshotError> {
    let raw = std::fs::read(path).map_err(io_err(path))?;
    Ok(serde_json::from_slice(&raw)?)
}
