//! Single-writer snapshot merger
//!
//! Jobs never touch the snapshot. They hand finished entries to a
//! [`MergerHandle`]; one task owns the snapshot, merges entries in arrival
//! order and persists the whole document after each merge.

use super::SnapshotStore;
use crate::models::{ClusterSnapshot, SnapshotEntry};
use crate::observability::{InventoryLogger, InventoryMetrics};
use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Sending side of the merger
#[derive(Clone)]
pub struct MergerHandle {
    tx: mpsc::UnboundedSender<SnapshotEntry>,
}

impl MergerHandle {
    /// Queue an entry for merging. Fails once the merger has stopped.
    pub fn merge(&self, entry: SnapshotEntry) -> Result<()> {
        self.tx
            .send(entry)
            .map_err(|e| anyhow!("snapshot merger stopped; dropped {}", e.0.key()))
    }
}

/// Owner of the in-progress snapshot
pub struct SnapshotMerger {
    snapshot: ClusterSnapshot,
    store: SnapshotStore,
    logger: InventoryLogger,
    metrics: InventoryMetrics,
}

impl SnapshotMerger {
    pub fn new(snapshot: ClusterSnapshot, store: SnapshotStore) -> Self {
        let logger = InventoryLogger::new(snapshot.cluster.clone());
        Self {
            snapshot,
            store,
            logger,
            metrics: InventoryMetrics::new(),
        }
    }

    /// Start the merger task.
    ///
    /// The task ends when every handle is dropped and returns the final
    /// snapshot, or the first persistence error.
    pub fn spawn(self) -> (MergerHandle, JoinHandle<Result<ClusterSnapshot>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx));
        (MergerHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SnapshotEntry>) -> Result<ClusterSnapshot> {
        // Establish the document (and its has_metrics flag) before any entry lands
        self.flush().await?;

        while let Some(entry) = rx.recv().await {
            self.snapshot.merge(entry);
            self.flush().await?;
        }

        Ok(self.snapshot)
    }

    async fn flush(&self) -> Result<()> {
        let store = self.store.clone();
        let snapshot = self.snapshot.clone();
        // File write, fsync and rename stay off the async workers
        tokio::task::spawn_blocking(move || store.persist(&snapshot))
            .await
            .context("Snapshot persistence task failed")??;
        self.metrics.inc_snapshot_flushes();
        self.logger.log_snapshot_flushed(
            self.store.path(),
            self.snapshot.nodes.len(),
            self.snapshot.namespaces.len(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodeCapacity, NodeRecord, UNKNOWN_LABEL};

    fn node(key: &str, cpu: f64) -> SnapshotEntry {
        SnapshotEntry::Node {
            key: key.to_string(),
            record: NodeRecord {
                instance_type: UNKNOWN_LABEL.to_string(),
                region: UNKNOWN_LABEL.to_string(),
                zone: UNKNOWN_LABEL.to_string(),
                capacity: NodeCapacity { cpu, memory_gb: 1.0 },
                actual: None,
            },
        }
    }

    #[tokio::test]
    async fn test_merger_persists_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snap.json"));

        let (handle, task) =
            SnapshotMerger::new(ClusterSnapshot::new("prod", false), store.clone()).spawn();
        handle.merge(node("a", 2.0)).unwrap();
        handle.merge(node("b", 4.0)).unwrap();
        drop(handle);

        let snapshot = task.await.unwrap().unwrap();
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(store.load().unwrap(), Some(snapshot));
    }

    #[tokio::test]
    async fn test_merger_writes_empty_document_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snap.json"));

        let (handle, task) =
            SnapshotMerger::new(ClusterSnapshot::new("prod", true), store.clone()).spawn();
        drop(handle);
        task.await.unwrap().unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert!(loaded.has_metrics);
        assert!(loaded.nodes.is_empty());
    }

    #[tokio::test]
    async fn test_merger_reports_persistence_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the document should be makes the rename fail
        let path = dir.path().join("snap.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), "x").unwrap();

        let (handle, task) =
            SnapshotMerger::new(ClusterSnapshot::new("prod", false), SnapshotStore::new(&path))
                .spawn();
        let result = task.await.unwrap();

        assert!(result.is_err());
        assert!(handle.merge(node("late", 1.0)).is_err());
    }
}
