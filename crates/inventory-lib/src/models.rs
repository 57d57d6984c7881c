//! Core data models for the cluster inventory snapshot
//!
//! Optional fields are omitted from the serialized document when absent:
//! a missing `sidecar` means the namespace is not mesh-injected, a missing
//! `actual` means live usage was never measured (see `has_metrics`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value used for node topology labels that are not set
pub const UNKNOWN_LABEL: &str = "unknown";

/// Requested resources summed over one container category
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestedResources {
    /// CPU in cores
    pub cpu: f64,
    /// Memory in GiB
    pub memory_gb: f64,
    /// Number of containers in the category
    pub containers: u32,
}

/// Live usage measured by the metrics API
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// CPU in cores
    pub cpu: f64,
    /// Memory in GiB
    pub memory_gb: f64,
}

/// Requested and optionally measured resources for one container category
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryUsage {
    pub requested: RequestedResources,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<ResourceUsage>,
}

/// Per-namespace record. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceRecord {
    /// Number of pods in the namespace
    pub pods: u32,
    /// Whether pods in this namespace receive a mesh sidecar
    pub mesh_injected: bool,
    /// Application containers
    pub regular: CategoryUsage,
    /// Mesh-proxy containers, present only when `mesh_injected`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidecar: Option<CategoryUsage>,
}

/// Node capacity in canonical units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeCapacity {
    pub cpu: f64,
    pub memory_gb: f64,
}

/// Per-node record. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub instance_type: String,
    pub region: String,
    pub zone: String,
    pub capacity: NodeCapacity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<ResourceUsage>,
}

/// Kind of work unit tracked by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Node,
    Namespace,
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitKind::Node => f.write_str("node"),
            UnitKind::Namespace => f.write_str("namespace"),
        }
    }
}

/// A whole record destined for one key of the snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEntry {
    Node { key: String, record: NodeRecord },
    Namespace { key: String, record: NamespaceRecord },
}

impl SnapshotEntry {
    pub fn key(&self) -> &str {
        match self {
            SnapshotEntry::Node { key, .. } | SnapshotEntry::Namespace { key, .. } => key,
        }
    }

    pub fn kind(&self) -> UnitKind {
        match self {
            SnapshotEntry::Node { .. } => UnitKind::Node,
            SnapshotEntry::Namespace { .. } => UnitKind::Namespace,
        }
    }
}

/// Top-level inventory document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    /// Cluster identity (raw or obfuscated)
    pub cluster: String,
    /// Whether the metrics API was reachable for this cluster
    pub has_metrics: bool,
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeRecord>,
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespaceRecord>,
}

impl ClusterSnapshot {
    /// Create an empty snapshot for a cluster
    pub fn new(cluster: impl Into<String>, has_metrics: bool) -> Self {
        Self {
            cluster: cluster.into(),
            has_metrics,
            nodes: BTreeMap::new(),
            namespaces: BTreeMap::new(),
        }
    }

    /// Insert or replace one whole record under its key
    pub fn merge(&mut self, entry: SnapshotEntry) {
        match entry {
            SnapshotEntry::Node { key, record } => {
                self.nodes.insert(key, record);
            }
            SnapshotEntry::Namespace { key, record } => {
                self.namespaces.insert(key, record);
            }
        }
    }

    /// Whether a unit has already been collected
    pub fn contains(&self, kind: UnitKind, key: &str) -> bool {
        match kind {
            UnitKind::Node => self.nodes.contains_key(key),
            UnitKind::Namespace => self.namespaces.contains_key(key),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.namespaces.is_empty()
    }

    /// Cluster-wide totals across all collected entries
    pub fn totals(&self) -> SnapshotTotals {
        let mut totals = SnapshotTotals::default();

        for node in self.nodes.values() {
            totals.capacity_cpu += node.capacity.cpu;
            totals.capacity_memory_gb += node.capacity.memory_gb;
        }

        for ns in self.namespaces.values() {
            totals.pods += ns.pods;
            totals.regular_cpu += ns.regular.requested.cpu;
            totals.regular_memory_gb += ns.regular.requested.memory_gb;
            if let Some(sidecar) = &ns.sidecar {
                totals.sidecar_cpu += sidecar.requested.cpu;
                totals.sidecar_memory_gb += sidecar.requested.memory_gb;
            }
        }

        totals
    }
}

/// Aggregate figures over a snapshot, used for summaries
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SnapshotTotals {
    pub capacity_cpu: f64,
    pub capacity_memory_gb: f64,
    pub pods: u32,
    pub regular_cpu: f64,
    pub regular_memory_gb: f64,
    pub sidecar_cpu: f64,
    pub sidecar_memory_gb: f64,
}
