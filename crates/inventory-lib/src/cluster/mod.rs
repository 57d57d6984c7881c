//! Cluster access
//!
//! The collectors depend only on the [`ClusterAccess`] trait. The types here
//! are plain data with quantities left as the raw strings the API returned;
//! normalization happens in the collectors.

mod kube_client;

pub use kube_client::KubeCluster;

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors returned by the cluster-access collaborator
#[derive(Debug, Clone, Error)]
pub enum ClusterError {
    #[error("cluster API unreachable: {0}")]
    Unreachable(String),

    #[error("{kind} {name:?} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("malformed API response: {0}")]
    Malformed(String),

    #[error("metrics API unavailable: {0}")]
    MetricsUnavailable(String),

    #[error("API request failed: {0}")]
    Api(String),
}

/// Node metadata and capacity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeInfo {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub capacity_cpu: Option<String>,
    pub capacity_memory: Option<String>,
}

/// Namespace identity and labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceInfo {
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

/// Declared resource requests of one container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerSpec {
    pub name: String,
    pub cpu_request: Option<String>,
    pub memory_request: Option<String>,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn cpu(mut self, quantity: impl Into<String>) -> Self {
        self.cpu_request = Some(quantity.into());
        self
    }

    pub fn memory(mut self, quantity: impl Into<String>) -> Self {
        self.memory_request = Some(quantity.into());
        self
    }
}

/// A pod and its containers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PodInfo {
    pub name: String,
    pub containers: Vec<ContainerSpec>,
}

/// Live usage of one container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerUsage {
    pub name: String,
    pub cpu: String,
    pub memory: String,
}

/// Live usage of one pod
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PodUsage {
    pub name: String,
    pub containers: Vec<ContainerUsage>,
}

/// Live usage of one node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUsage {
    pub cpu: String,
    pub memory: String,
}

/// Capability set of the cluster-access collaborator, scoped to one cluster
#[async_trait]
pub trait ClusterAccess: Send + Sync {
    /// Identity of the cluster (kubeconfig context name)
    fn cluster_name(&self) -> &str;

    /// List node names
    async fn list_nodes(&self) -> Result<Vec<String>, ClusterError>;

    /// Get node labels and capacity
    async fn get_node(&self, name: &str) -> Result<NodeInfo, ClusterError>;

    /// List namespaces with their labels
    async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>, ClusterError>;

    /// List pods in a namespace with their container requests
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>, ClusterError>;

    /// Whether the metrics API is served by this cluster
    async fn metrics_available(&self) -> bool;

    /// Live usage of a node
    async fn node_usage(&self, name: &str) -> Result<NodeUsage, ClusterError>;

    /// Live usage of all pods in a namespace
    async fn pod_usage(&self, namespace: &str) -> Result<Vec<PodUsage>, ClusterError>;
}
