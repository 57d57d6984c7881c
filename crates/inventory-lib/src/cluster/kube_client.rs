//! Cluster access over the Kubernetes API
//!
//! Core objects come from the typed `k8s-openapi` resources. Live usage
//! comes from the `metrics.k8s.io/v1beta1` aggregated API, which has no
//! typed resource, so it is read with raw requests.

use super::{
    ClusterAccess, ClusterError, ContainerSpec, ContainerUsage, NamespaceInfo, NodeInfo,
    NodeUsage, PodInfo, PodUsage,
};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Container, Namespace, Node, Pod};
use kube::{
    api::{Api, ListParams},
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use serde::Deserialize;
use tracing::debug;

const METRICS_API_ROOT: &str = "/apis/metrics.k8s.io/v1beta1";

/// Context name reported when running with in-cluster credentials
const IN_CLUSTER_CONTEXT: &str = "in-cluster";

/// [`ClusterAccess`] backed by a `kube` client bound to one context
pub struct KubeCluster {
    client: Client,
    context: String,
}

impl KubeCluster {
    /// Connect using a named kubeconfig context, or the current context /
    /// in-cluster configuration when `context` is `None`
    pub async fn connect(context: Option<&str>) -> Result<Self, ClusterError> {
        match context {
            Some(name) => Self::with_context(name).await,
            None => Self::infer().await,
        }
    }

    async fn with_context(context: &str) -> Result<Self, ClusterError> {
        let kubeconfig = Kubeconfig::read()
            .map_err(|e| ClusterError::Unreachable(format!("failed to read kubeconfig: {}", e)))?;
        let config = Config::from_custom_kubeconfig(
            kubeconfig,
            &KubeConfigOptions {
                context: Some(context.to_string()),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| ClusterError::Unreachable(format!("invalid context {:?}: {}", context, e)))?;

        let client = Client::try_from(config)
            .map_err(|e| ClusterError::Unreachable(format!("failed to create client: {}", e)))?;

        Ok(Self {
            client,
            context: context.to_string(),
        })
    }

    async fn infer() -> Result<Self, ClusterError> {
        let context = Kubeconfig::read()
            .ok()
            .and_then(|k| k.current_context)
            .unwrap_or_else(|| IN_CLUSTER_CONTEXT.to_string());

        let config = Config::infer()
            .await
            .map_err(|e| ClusterError::Unreachable(format!("failed to infer config: {}", e)))?;
        let client = Client::try_from(config)
            .map_err(|e| ClusterError::Unreachable(format!("failed to create client: {}", e)))?;

        Ok(Self { client, context })
    }

    async fn raw_get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ClusterError> {
        let request = http::Request::builder()
            .method("GET")
            .uri(path)
            .body(Vec::new())
            .map_err(|e| ClusterError::Api(format!("failed to build request: {}", e)))?;

        self.client
            .request::<T>(request)
            .await
            .map_err(|e| match e {
                kube::Error::Api(resp) if resp.code == 404 || resp.code == 503 => {
                    ClusterError::MetricsUnavailable(resp.message)
                }
                other => ClusterError::MetricsUnavailable(other.to_string()),
            })
    }
}

#[async_trait]
impl ClusterAccess for KubeCluster {
    fn cluster_name(&self) -> &str {
        &self.context
    }

    async fn list_nodes(&self) -> Result<Vec<String>, ClusterError> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes
            .list(&ListParams::default())
            .await
            .map_err(|e| map_kube_error(e, "node", ""))?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|n| n.metadata.name)
            .collect())
    }

    async fn get_node(&self, name: &str) -> Result<NodeInfo, ClusterError> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let node = nodes
            .get(name)
            .await
            .map_err(|e| map_kube_error(e, "node", name))?;

        let capacity = node.status.and_then(|s| s.capacity).unwrap_or_default();

        Ok(NodeInfo {
            name: name.to_string(),
            labels: node.metadata.labels.unwrap_or_default(),
            capacity_cpu: capacity.get("cpu").map(|q| q.0.clone()),
            capacity_memory: capacity.get("memory").map(|q| q.0.clone()),
        })
    }

    async fn list_namespaces(&self) -> Result<Vec<NamespaceInfo>, ClusterError> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces
            .list(&ListParams::default())
            .await
            .map_err(|e| map_kube_error(e, "namespace", ""))?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|ns| {
                let name = ns.metadata.name?;
                Some(NamespaceInfo {
                    name,
                    labels: ns.metadata.labels.unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodInfo>, ClusterError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods
            .list(&ListParams::default())
            .await
            .map_err(|e| map_kube_error(e, "namespace", namespace))?;

        list.items
            .into_iter()
            .map(|pod| {
                let name = pod.metadata.name.ok_or_else(|| {
                    ClusterError::Malformed(format!("pod without a name in {}", namespace))
                })?;
                let spec = pod.spec.ok_or_else(|| {
                    ClusterError::Malformed(format!("pod {}/{} has no spec", namespace, name))
                })?;

                Ok(PodInfo {
                    name,
                    containers: spec.containers.iter().map(container_spec).collect(),
                })
            })
            .collect()
    }

    async fn metrics_available(&self) -> bool {
        match self.raw_get::<serde_json::Value>(METRICS_API_ROOT).await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Metrics API probe failed");
                false
            }
        }
    }

    async fn node_usage(&self, name: &str) -> Result<NodeUsage, ClusterError> {
        let path = format!("{}/nodes/{}", METRICS_API_ROOT, name);
        let metrics: NodeMetricsItem = self.raw_get(&path).await?;

        Ok(NodeUsage {
            cpu: metrics.usage.cpu,
            memory: metrics.usage.memory,
        })
    }

    async fn pod_usage(&self, namespace: &str) -> Result<Vec<PodUsage>, ClusterError> {
        let path = format!("{}/namespaces/{}/pods", METRICS_API_ROOT, namespace);
        let list: PodMetricsList = self.raw_get(&path).await?;

        Ok(list
            .items
            .into_iter()
            .map(|pm| PodUsage {
                name: pm.metadata.name,
                containers: pm
                    .containers
                    .into_iter()
                    .map(|c| ContainerUsage {
                        name: c.name,
                        cpu: c.usage.cpu,
                        memory: c.usage.memory,
                    })
                    .collect(),
            })
            .collect())
    }
}

fn container_spec(container: &Container) -> ContainerSpec {
    let requests = container
        .resources
        .as_ref()
        .and_then(|r| r.requests.as_ref());

    ContainerSpec {
        name: container.name.clone(),
        cpu_request: requests.and_then(|r| r.get("cpu")).map(|q| q.0.clone()),
        memory_request: requests.and_then(|r| r.get("memory")).map(|q| q.0.clone()),
    }
}

fn map_kube_error(error: kube::Error, kind: &'static str, name: &str) -> ClusterError {
    match error {
        kube::Error::Api(resp) if resp.code == 404 => ClusterError::NotFound {
            kind,
            name: name.to_string(),
        },
        kube::Error::Api(resp) => ClusterError::Api(format!("{} ({})", resp.message, resp.code)),
        kube::Error::SerdeError(e) => ClusterError::Malformed(e.to_string()),
        other => ClusterError::Unreachable(other.to_string()),
    }
}

// Response shapes of the metrics.k8s.io API

#[derive(Debug, Deserialize)]
struct PodMetricsList {
    items: Vec<PodMetricsItem>,
}

#[derive(Debug, Deserialize)]
struct PodMetricsItem {
    metadata: MetricsMetadata,
    #[serde(default)]
    containers: Vec<ContainerMetricsItem>,
}

#[derive(Debug, Deserialize)]
struct NodeMetricsItem {
    usage: UsageItem,
}

#[derive(Debug, Deserialize)]
struct MetricsMetadata {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ContainerMetricsItem {
    name: String,
    usage: UsageItem,
}

#[derive(Debug, Deserialize)]
struct UsageItem {
    #[serde(default)]
    cpu: String,
    #[serde(default)]
    memory: String,
}
