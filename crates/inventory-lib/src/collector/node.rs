//! Node collection

use super::{Collected, CollectionError};
use crate::cluster::{ClusterAccess, NodeInfo};
use crate::models::{NodeCapacity, NodeRecord, ResourceUsage, UNKNOWN_LABEL};
use crate::quantity::{bytes_to_gib, parse_cpu, parse_cpu_opt, parse_memory, parse_memory_opt};
use std::collections::BTreeMap;

/// Well-known topology labels
pub mod labels {
    pub const INSTANCE_TYPE: &str = "node.kubernetes.io/instance-type";
    pub const INSTANCE_TYPE_BETA: &str = "beta.kubernetes.io/instance-type";
    pub const REGION: &str = "topology.kubernetes.io/region";
    pub const ZONE: &str = "topology.kubernetes.io/zone";
}

/// Collects node identity, topology and capacity
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeCollector;

impl NodeCollector {
    pub fn new() -> Self {
        Self
    }

    /// Collect one node
    pub async fn collect(
        &self,
        name: &str,
        cluster: &dyn ClusterAccess,
        metrics_available: bool,
    ) -> Result<Collected<NodeRecord>, CollectionError> {
        let info = cluster
            .get_node(name)
            .await
            .map_err(|e| CollectionError::malformed(name, e))?;

        let mut warnings = Vec::new();
        let actual = if metrics_available {
            Some(match cluster.node_usage(name).await {
                Ok(usage) => ResourceUsage {
                    cpu: parse_cpu(&usage.cpu),
                    memory_gb: bytes_to_gib(parse_memory(&usage.memory)),
                },
                Err(e) => {
                    warnings.push(CollectionError::metrics(name, e));
                    ResourceUsage::default()
                }
            })
        } else {
            None
        };

        let record = build_record(&info, actual);
        if !(record.capacity.cpu.is_finite() && record.capacity.memory_gb.is_finite()) {
            return Err(CollectionError::construction(
                name,
                "capacity is not a finite number",
            ));
        }

        Ok(Collected { record, warnings })
    }
}

fn build_record(info: &NodeInfo, actual: Option<ResourceUsage>) -> NodeRecord {
    NodeRecord {
        instance_type: label_or_unknown(
            &info.labels,
            &[labels::INSTANCE_TYPE, labels::INSTANCE_TYPE_BETA],
        ),
        region: label_or_unknown(&info.labels, &[labels::REGION]),
        zone: label_or_unknown(&info.labels, &[labels::ZONE]),
        capacity: NodeCapacity {
            cpu: parse_cpu_opt(info.capacity_cpu.as_deref()),
            memory_gb: bytes_to_gib(parse_memory_opt(info.capacity_memory.as_deref())),
        },
        actual,
    }
}

fn label_or_unknown(labels: &BTreeMap<String, String>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| labels.get(*k).filter(|v| !v.is_empty()))
        .cloned()
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}
