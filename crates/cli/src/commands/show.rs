//! Snapshot rendering command

use anyhow::{Context, Result};
use colored::Colorize;
use inventory_lib::{ClusterSnapshot, SnapshotStore};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::output::{
    format_cores, format_gib, format_optional, format_share, print_table, OutputFormat,
};

/// Row for the node table
#[derive(Tabled, Serialize)]
struct NodeRow {
    #[tabled(rename = "Node")]
    name: String,
    #[tabled(rename = "Instance Type")]
    instance_type: String,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "CPU Used")]
    cpu_used: String,
    #[tabled(rename = "Memory Used")]
    memory_used: String,
}

/// Row for the namespace table
#[derive(Tabled, Serialize)]
struct NamespaceRow {
    #[tabled(rename = "Namespace")]
    name: String,
    #[tabled(rename = "Pods")]
    pods: u32,
    #[tabled(rename = "Mesh")]
    mesh: String,
    #[tabled(rename = "CPU Req")]
    cpu: String,
    #[tabled(rename = "Memory Req")]
    memory: String,
    #[tabled(rename = "Sidecar CPU")]
    sidecar_cpu: String,
    #[tabled(rename = "Sidecar Memory")]
    sidecar_memory: String,
}

/// Render a snapshot file
pub fn show_snapshot(path: &Path, format: OutputFormat) -> Result<()> {
    let snapshot = SnapshotStore::new(path)
        .load()?
        .with_context(|| format!("No snapshot at {}", path.display()))?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&snapshot)?;
            println!("{}", json);
        }
        OutputFormat::Table => print_snapshot(&snapshot),
    }

    Ok(())
}

fn node_rows(snapshot: &ClusterSnapshot) -> Vec<NodeRow> {
    snapshot
        .nodes
        .iter()
        .map(|(name, node)| NodeRow {
            name: name.clone(),
            instance_type: node.instance_type.clone(),
            zone: node.zone.clone(),
            cpu: format_cores(node.capacity.cpu),
            memory: format_gib(node.capacity.memory_gb),
            cpu_used: format_optional(node.actual.map(|a| a.cpu), format_cores),
            memory_used: format_optional(node.actual.map(|a| a.memory_gb), format_gib),
        })
        .collect()
}

fn namespace_rows(snapshot: &ClusterSnapshot) -> Vec<NamespaceRow> {
    snapshot
        .namespaces
        .iter()
        .map(|(name, ns)| NamespaceRow {
            name: name.clone(),
            pods: ns.pods,
            mesh: if ns.mesh_injected { "yes" } else { "no" }.to_string(),
            cpu: format_cores(ns.regular.requested.cpu),
            memory: format_gib(ns.regular.requested.memory_gb),
            sidecar_cpu: format_optional(ns.sidecar.map(|s| s.requested.cpu), format_cores),
            sidecar_memory: format_optional(
                ns.sidecar.map(|s| s.requested.memory_gb),
                format_gib,
            ),
        })
        .collect()
}

fn print_snapshot(snapshot: &ClusterSnapshot) {
    let totals = snapshot.totals();

    println!("{}", "Cluster Snapshot".bold());
    println!("{}", "=".repeat(50));
    println!("Cluster:                {}", snapshot.cluster.cyan());
    println!(
        "Live metrics:           {}",
        if snapshot.has_metrics { "yes" } else { "no" }
    );
    println!("Nodes:                  {}", snapshot.nodes.len());
    println!("Namespaces:             {}", snapshot.namespaces.len());
    println!("Pods:                   {}", totals.pods);
    println!();

    println!("{}", "Capacity vs Requests".bold());
    println!("{}", "-".repeat(50));
    println!(
        "CPU:                    {} of {} ({})",
        format_cores(totals.regular_cpu + totals.sidecar_cpu),
        format_cores(totals.capacity_cpu),
        format_share(totals.regular_cpu + totals.sidecar_cpu, totals.capacity_cpu)
    );
    println!(
        "Memory:                 {} of {} ({})",
        format_gib(totals.regular_memory_gb + totals.sidecar_memory_gb),
        format_gib(totals.capacity_memory_gb),
        format_share(
            totals.regular_memory_gb + totals.sidecar_memory_gb,
            totals.capacity_memory_gb
        )
    );
    println!(
        "Sidecar share of CPU:   {}",
        format_share(totals.sidecar_cpu, totals.regular_cpu + totals.sidecar_cpu).yellow()
    );
    println!();

    println!("{}", "Nodes".bold());
    print_table(&node_rows(snapshot), OutputFormat::Table);
    println!();
    println!("{}", "Namespaces".bold());
    print_table(&namespace_rows(snapshot), OutputFormat::Table);
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory_lib::{
        CategoryUsage, NamespaceRecord, NodeCapacity, NodeRecord, RequestedResources,
        ResourceUsage, SnapshotEntry,
    };

    fn sample() -> ClusterSnapshot {
        let mut snapshot = ClusterSnapshot::new("prod", true);
        snapshot.merge(SnapshotEntry::Node {
            key: "node-a".to_string(),
            record: NodeRecord {
                instance_type: "m5.large".to_string(),
                region: "eu-west-1".to_string(),
                zone: "eu-west-1a".to_string(),
                capacity: NodeCapacity {
                    cpu: 2.0,
                    memory_gb: 8.0,
                },
                actual: Some(ResourceUsage {
                    cpu: 0.5,
                    memory_gb: 2.0,
                }),
            },
        });
        snapshot.merge(SnapshotEntry::Namespace {
            key: "shop".to_string(),
            record: NamespaceRecord {
                pods: 3,
                mesh_injected: true,
                regular: CategoryUsage {
                    requested: RequestedResources {
                        cpu: 0.75,
                        memory_gb: 1.5,
                        containers: 3,
                    },
                    actual: None,
                },
                sidecar: Some(CategoryUsage {
                    requested: RequestedResources {
                        cpu: 0.3,
                        memory_gb: 0.375,
                        containers: 3,
                    },
                    actual: None,
                }),
            },
        });
        snapshot
    }

    #[test]
    fn test_node_rows() {
        let rows = node_rows(&sample());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cpu, "2.00");
        assert_eq!(rows[0].memory, "8.00Gi");
        assert_eq!(rows[0].cpu_used, "500m");
    }

    #[test]
    fn test_namespace_rows() {
        let rows = namespace_rows(&sample());
        assert_eq!(rows[0].mesh, "yes");
        assert_eq!(rows[0].cpu, "750m");
        assert_eq!(rows[0].sidecar_cpu, "300m");
        assert_eq!(rows[0].sidecar_memory, "384Mi");
    }

    #[test]
    fn test_show_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(show_snapshot(&dir.path().join("none.json"), OutputFormat::Json).is_err());
    }

    #[test]
    fn test_show_reads_persisted_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        SnapshotStore::new(&path).persist(&sample()).unwrap();

        assert!(show_snapshot(&path, OutputFormat::Table).is_ok());
        assert!(show_snapshot(&path, OutputFormat::Json).is_ok());
    }
}
