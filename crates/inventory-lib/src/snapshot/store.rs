//! On-disk snapshot checkpoint

use crate::models::ClusterSnapshot;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Conditions under which an existing snapshot cannot be resumed
#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("snapshot {path} belongs to cluster '{found}', not '{expected}'")]
    ClusterMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("snapshot {path} was collected with has_metrics={stored}, this run has has_metrics={current}")]
    MetricsMismatch {
        path: PathBuf,
        stored: bool,
        current: bool,
    },

    #[error("snapshot {path} is not a valid inventory document: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// Checkpoint store backed by a single JSON document
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the snapshot a run should start from.
    ///
    /// Without `resume` this is always a fresh, empty snapshot. With it, the
    /// existing document is loaded if there is one; it must belong to the
    /// same cluster identity and the same metrics availability, so entries
    /// from both runs agree with the document's `has_metrics` flag. A
    /// document with no entries yet takes the current flag.
    pub fn open(&self, cluster: &str, has_metrics: bool, resume: bool) -> Result<ClusterSnapshot> {
        if !resume {
            return Ok(ClusterSnapshot::new(cluster, has_metrics));
        }

        match self.load()? {
            Some(mut snapshot) => {
                if snapshot.cluster != cluster {
                    return Err(ResumeError::ClusterMismatch {
                        path: self.path.clone(),
                        expected: cluster.to_string(),
                        found: snapshot.cluster,
                    }
                    .into());
                }
                if snapshot.has_metrics != has_metrics {
                    if !snapshot.is_empty() {
                        return Err(ResumeError::MetricsMismatch {
                            path: self.path.clone(),
                            stored: snapshot.has_metrics,
                            current: has_metrics,
                        }
                        .into());
                    }
                    snapshot.has_metrics = has_metrics;
                }
                info!(
                    path = %self.path.display(),
                    nodes = snapshot.nodes.len(),
                    namespaces = snapshot.namespaces.len(),
                    "Resuming from existing snapshot"
                );
                Ok(snapshot)
            }
            None => Ok(ClusterSnapshot::new(cluster, has_metrics)),
        }
    }

    /// Load the snapshot, or `None` if no document exists yet
    pub fn load(&self) -> Result<Option<ClusterSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&self.path)
            .with_context(|| format!("Failed to open snapshot {:?}", self.path))?;

        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .context("Failed to read snapshot")?;

        let snapshot = serde_json::from_slice(&data).map_err(|e| ResumeError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        Ok(Some(snapshot))
    }

    /// Write the whole snapshot atomically
    pub fn persist(&self, snapshot: &ClusterSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {:?}", parent))?;
            }
        }

        let json = serde_json::to_vec_pretty(snapshot).context("Failed to serialize snapshot")?;

        let temp_path = self.path.with_extension("tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create temp file {:?}", temp_path))?;

        file.write_all(&json)
            .context("Failed to write snapshot data")?;
        file.sync_all().context("Failed to sync snapshot file")?;

        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, self.path))?;

        Ok(())
    }
}
