//! Cluster resource inventory library
//!
//! This crate provides the core functionality for:
//! - Reading nodes, namespaces, pods and live usage from a cluster
//! - Normalizing resource quantities and classifying containers
//! - Collecting per-node and per-namespace records on a bounded worker pool
//! - Persisting a resumable snapshot after every collected unit
//! - Identity obfuscation, preflight checks and observability

pub mod classifier;
pub mod cluster;
pub mod collector;
pub mod config;
pub mod coordinator;
pub mod models;
pub mod obfuscate;
pub mod observability;
pub mod preflight;
pub mod quantity;
pub mod snapshot;

#[cfg(test)]
mod testing;

pub use cluster::{ClusterAccess, ClusterError, KubeCluster};
pub use config::{Discipline, InventoryConfig, MeshConfig, MAX_PARALLELISM};
pub use coordinator::{InventoryRun, ProgressReporter, RunOutcome, RunReport};
pub use models::*;
pub use observability::{InventoryLogger, InventoryMetrics};
pub use preflight::{run_preflight, ComponentStatus, PreflightReport};
pub use snapshot::SnapshotStore;
