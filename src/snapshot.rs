//! Snapshot persistence.
//!
//! Each cycle moves the current snapshot to the backup path, then writes the
//! new result set to the primary path. The two steps are not atomic: a crash
//! between them leaves only the backup on disk.

use crate::core::AggregateResult;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Snapshot errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to back up {from} to {to}: {source}")]
    Backup {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// What one write did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: PathBuf,
    pub backed_up: bool,
    pub entries: usize,
    pub bytes: usize,
}

/// Writes snapshots with a one-deep backup.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    primary: PathBuf,
    backup: PathBuf,
}

impl SnapshotWriter {
    pub fn new(primary: impl Into<PathBuf>, backup: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            backup: backup.into(),
        }
    }

    pub fn primary(&self) -> &Path {
        &self.primary
    }

    pub fn backup(&self) -> &Path {
        &self.backup
    }

    /// Back up the current snapshot, then write `results` as the new one.
    pub fn write(&self, results: &[AggregateResult]) -> Result<WriteOutcome, SnapshotError> {
        let json = serde_json::to_string_pretty(results)?;

        let backed_up = self.primary.exists();
        if backed_up {
            std::fs::rename(&self.primary, &self.backup).map_err(|source| {
                SnapshotError::Backup {
                    from: self.primary.clone(),
                    to: self.backup.clone(),
                    source,
                }
            })?;
        }

        if let Some(parent) = self.primary.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| SnapshotError::Write {
                    path: self.primary.clone(),
                    source,
                })?;
            }
        }

        std::fs::write(&self.primary, &json).map_err(|source| SnapshotError::Write {
            path: self.primary.clone(),
            source,
        })?;

        Ok(WriteOutcome {
            path: self.primary.clone(),
            backed_up,
            entries: results.len(),
            bytes: json.len(),
        })
    }

    /// Load the current primary snapshot, if there is one.
    pub fn read_current(&self) -> Result<Option<Vec<AggregateResult>>, SnapshotError> {
        read_snapshot(&self.primary)
    }

    /// Load the backup snapshot, if there is one.
    pub fn read_backup(&self) -> Result<Option<Vec<AggregateResult>>, SnapshotError> {
        read_snapshot(&self.backup)
    }
}

fn read_snapshot(path: &Path) -> Result<Option<Vec<AggregateResult>>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(serde_json::from_str(&content)?))
}
