//! Inventory run configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Upper bound on concurrently running collection jobs
pub const MAX_PARALLELISM: usize = 8;

/// How the coordinator schedules jobs onto the worker pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discipline {
    /// Start the next job as soon as any in-flight job finishes
    #[default]
    Completion,
    /// Launch jobs in fixed-size batches, waiting for each batch to drain
    Batch,
}

impl Discipline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Discipline::Completion => "completion",
            Discipline::Batch => "batch",
        }
    }
}

impl std::str::FromStr for Discipline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "completion" => Ok(Discipline::Completion),
            "batch" => Ok(Discipline::Batch),
            other => Err(format!("unknown scheduling discipline: {}", other)),
        }
    }
}

/// Service-mesh naming conventions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Name of the injected proxy container
    pub sidecar_container: String,
    /// Namespace label that enables injection
    pub injection_label: String,
    /// Value of `injection_label` meaning "enabled"
    pub injection_value: String,
    /// Namespace label whose presence selects a revision-based injection
    pub revision_label: String,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            sidecar_container: "istio-proxy".to_string(),
            injection_label: "istio-injection".to_string(),
            injection_value: "enabled".to_string(),
            revision_label: "istio.io/rev".to_string(),
        }
    }
}

impl MeshConfig {
    /// Whether a container name is the mesh proxy
    pub fn is_sidecar(&self, container_name: &str) -> bool {
        container_name == self.sidecar_container
    }

    /// Whether namespace labels enable sidecar injection
    pub fn is_injected(&self, labels: &BTreeMap<String, String>) -> bool {
        labels
            .get(&self.injection_label)
            .is_some_and(|v| v == &self.injection_value)
            || labels.contains_key(&self.revision_label)
    }
}

/// Settings for one inventory run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Where the snapshot document is written
    pub output: PathBuf,
    /// Worker cap override; derived from host cores when unset
    pub parallelism: Option<usize>,
    /// Scheduling discipline
    pub discipline: Discipline,
    /// Hash cluster, node and namespace identities
    pub obfuscate: bool,
    /// Continue from an existing snapshot, skipping collected units
    pub resume: bool,
    /// Mesh naming conventions
    pub mesh: MeshConfig,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("cluster-snapshot.json"),
            parallelism: None,
            discipline: Discipline::default(),
            obfuscate: false,
            resume: false,
            mesh: MeshConfig::default(),
        }
    }
}

impl InventoryConfig {
    /// Effective worker cap, clamped to `1..=MAX_PARALLELISM`
    pub fn effective_parallelism(&self) -> usize {
        self.parallelism
            .unwrap_or_else(default_parallelism)
            .clamp(1, MAX_PARALLELISM)
    }
}

/// Worker cap derived from available host cores
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_PARALLELISM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_config_default() {
        let config = InventoryConfig::default();
        assert_eq!(config.output, PathBuf::from("cluster-snapshot.json"));
        assert_eq!(config.discipline, Discipline::Completion);
        assert!(!config.obfuscate);
        assert!(!config.resume);
        assert_eq!(config.mesh.sidecar_container, "istio-proxy");
    }

    #[test]
    fn test_effective_parallelism_is_clamped() {
        let mut config = InventoryConfig::default();
        let derived = config.effective_parallelism();
        assert!((1..=MAX_PARALLELISM).contains(&derived));

        config.parallelism = Some(0);
        assert_eq!(config.effective_parallelism(), 1);

        config.parallelism = Some(1000);
        assert_eq!(config.effective_parallelism(), MAX_PARALLELISM);

        config.parallelism = Some(3);
        assert_eq!(config.effective_parallelism(), 3);
    }

    #[test]
    fn test_mesh_injection_labels() {
        let mesh = MeshConfig::default();
        let mut labels = BTreeMap::new();
        assert!(!mesh.is_injected(&labels));

        labels.insert("istio-injection".to_string(), "disabled".to_string());
        assert!(!mesh.is_injected(&labels));

        labels.insert("istio-injection".to_string(), "enabled".to_string());
        assert!(mesh.is_injected(&labels));

        let mut revision = BTreeMap::new();
        revision.insert("istio.io/rev".to_string(), "1-20".to_string());
        assert!(mesh.is_injected(&revision));
    }

    #[test]
    fn test_discipline_from_str() {
        assert_eq!("batch".parse::<Discipline>(), Ok(Discipline::Batch));
        assert_eq!("Completion".parse::<Discipline>(), Ok(Discipline::Completion));
        assert!("random".parse::<Discipline>().is_err());
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: InventoryConfig =
            serde_json::from_str(r#"{"parallelism": 2, "mesh": {"sidecar_container": "linkerd-proxy"}}"#)
                .unwrap();
        assert_eq!(config.parallelism, Some(2));
        assert_eq!(config.mesh.sidecar_container, "linkerd-proxy");
        assert_eq!(config.mesh.injection_label, "istio-injection");
    }
}
