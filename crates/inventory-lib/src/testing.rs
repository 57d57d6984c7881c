//! In-memory cluster for tests

use crate::cluster::{
    ClusterAccess, ClusterError, ContainerSpec, ContainerUsage, NamespaceInfo, NodeInfo,
    NodeUsage, PodInfo, PodUsage,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub(crate) fn pod(name: &str, containers: Vec<ContainerSpec>) -> PodInfo {
    PodInfo {
        name: name.to_string(),
        containers,
    }
}

pub(crate) fn usage(pod: &str, containers: &[(&str, &str, &str)]) -> PodUsage {
    PodUsage {
        name: pod.to_string(),
        containers: containers
            .iter()
            .map(|(name, cpu, memory)| ContainerUsage {
                name: name.to_string(),
                cpu: cpu.to_string(),
                memory: memory.to_string(),
            })
            .collect(),
    }
}

pub(crate) fn mesh_labels() -> BTreeMap<String, String> {
    labels(&[("istio-injection", "enabled")])
}

/// Fixture-backed [`ClusterAccess`] with failure injection and call counting
#[derive(Default)]
pub(crate) struct FakeCluster {
    name: String,
    nodes: BTreeMap<String, NodeInfo>,
    namespaces: Vec<NamespaceInfo>,
    pods: HashMap<String, Vec<PodInfo>>,
    pod_usage: HashMap<String, Vec<PodUsage>>,
    node_usage: HashMap<String, NodeUsage>,
    metrics: bool,
    unreachable: bool,
    delay: Option<Duration>,
    failing_namespaces: Mutex<HashSet<String>>,
    failing_nodes: Mutex<HashSet<String>>,
    panicking_nodes: Mutex<HashSet<String>>,
    pod_list_calls: AtomicUsize,
    node_get_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeCluster {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn with_node(mut self, name: &str, cpu: &str, memory: &str) -> Self {
        self.nodes.insert(
            name.to_string(),
            NodeInfo {
                name: name.to_string(),
                labels: BTreeMap::new(),
                capacity_cpu: Some(cpu.to_string()),
                capacity_memory: Some(memory.to_string()),
            },
        );
        self
    }

    pub(crate) fn with_node_info(mut self, info: NodeInfo) -> Self {
        self.nodes.insert(info.name.clone(), info);
        self
    }

    pub(crate) fn with_namespace(
        mut self,
        name: &str,
        labels: BTreeMap<String, String>,
        pods: Vec<PodInfo>,
    ) -> Self {
        self.namespaces.push(NamespaceInfo {
            name: name.to_string(),
            labels,
        });
        self.pods.insert(name.to_string(), pods);
        self
    }

    pub(crate) fn with_metrics(mut self, available: bool) -> Self {
        self.metrics = available;
        self
    }

    pub(crate) fn with_pod_usage(mut self, namespace: &str, usage: Vec<PodUsage>) -> Self {
        self.pod_usage.insert(namespace.to_string(), usage);
        self
    }

    pub(crate) fn with_node_usage(mut self, node: &str, cpu: &str, memory: &str) -> Self {
        self.node_usage.insert(
            node.to_string(),
            NodeUsage {
                cpu: cpu.to_string(),
                memory: memory.to_string(),
            },
        );
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Make `list_pods` return malformed data for a namespace
    pub(crate) fn fail_namespace(&self, name: &str) {
        self.failing_namespaces
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    pub(crate) fn heal_namespace(&self, name: &str) {
        self.failing_namespaces.lock().unwrap().remove(name);
    }

    /// Make `get_node` fail for a node
    pub(crate) fn fail_node(&self, name: &str) {
        self.failing_nodes.lock().unwrap().insert(name.to_string());
    }

    /// Make `get_node` panic for a node
    pub(crate) fn panic_on_node(&self, name: &str) {
        self.panicking_nodes.lock().unwrap().insert(name.to_string());
    }

    pub(crate) fn pod_list_calls(&self) -> usize {
        self.pod_list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn node_get_calls(&self) -> usize {
        self.node_get_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> Result<(), ClusterError> {
        if self.unreachable {
            Err(ClusterError::Unreachable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ClusterAccess for FakeCluster {
    fn cluster_name(&self) -> &str {
        &self.name
    }

    async fn list_nodes(&self) -> Result<Vec<String>, ClusterError> {
        self.check_reachable()?;
        Ok(self.nodes.keys().cloned().collect())
    }

    async fn get_node(&self, name: &str) -> Result<NodeInfo, ClusterError> {
        self.check_reachable()?;
        self.node_get_calls.fetch_add(1, Ordering::SeqCst);

        if self.panicking_nodes.lock().unwrap().contains(name) {
            panic!("node {} blew up", name);
        }

        if self.failing_nodes.lock().unwrap().contains(name) {
            return Err(ClusterError::Api("internal error".to_string()));
        }

        self.nodes
            .get(name)
            .cloned()
            .ok_or_else(|| ClusterError::NotFound {
                kind: "node",
                name: name.to_string(),
            })
    }

    async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>, ClusterError> {
        self.check_reachable()?;
        Ok(self.namespaces.clone())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>, ClusterError> {
        self.check_reachable()?;
        self.pod_list_calls.fetch_add(1, Ordering::SeqCst);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_namespaces.lock().unwrap().contains(namespace) {
            return Err(ClusterError::Malformed(format!(
                "pod in {} has no spec",
                namespace
            )));
        }

        Ok(self.pods.get(namespace).cloned().unwrap_or_default())
    }

    async fn metrics_available(&self) -> bool {
        self.metrics && !self.unreachable
    }

    async fn node_usage(&self, name: &str) -> Result<NodeUsage, ClusterError> {
        self.node_usage
            .get(name)
            .cloned()
            .ok_or_else(|| ClusterError::MetricsUnavailable(format!("no metrics for {}", name)))
    }

    async fn pod_usage(&self, namespace: &str) -> Result<Vec<PodUsage>, ClusterError> {
        if !self.metrics {
            return Err(ClusterError::MetricsUnavailable("not served".to_string()));
        }
        Ok(self.pod_usage.get(namespace).cloned().unwrap_or_default())
    }
}
