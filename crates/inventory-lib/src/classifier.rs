//! Container classification and resource aggregation
//!
//! Containers are split into `regular` and `sidecar` purely by name.
//! Classification does not know whether the mesh is enabled; the namespace
//! collector decides whether the sidecar aggregate is emitted.

use crate::cluster::{ContainerSpec, ContainerUsage};
use crate::config::MeshConfig;
use crate::models::{RequestedResources, ResourceUsage};
use crate::quantity::{bytes_to_gib, parse_cpu_strict, parse_memory_strict};

/// Container category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Regular,
    Sidecar,
}

/// Requested resources per category
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Classification {
    pub regular: RequestedResources,
    pub sidecar: RequestedResources,
    /// Quantities that were present but could not be parsed (counted as zero)
    pub unparsed: u32,
}

/// Measured usage per category
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageClassification {
    pub regular: ResourceUsage,
    pub sidecar: ResourceUsage,
    pub unparsed: u32,
}

/// Partitions containers by the mesh sidecar naming convention
#[derive(Debug, Clone)]
pub struct ResourceClassifier {
    mesh: MeshConfig,
}

impl ResourceClassifier {
    pub fn new(mesh: MeshConfig) -> Self {
        Self { mesh }
    }

    pub fn mesh(&self) -> &MeshConfig {
        &self.mesh
    }

    /// Category of a container, by name only
    pub fn category(&self, container_name: &str) -> Category {
        if self.mesh.is_sidecar(container_name) {
            Category::Sidecar
        } else {
            Category::Regular
        }
    }

    /// Sum requested CPU and memory per category
    pub fn classify_requests<'a, I>(&self, containers: I) -> Classification
    where
        I: IntoIterator<Item = &'a ContainerSpec>,
    {
        let mut result = Classification::default();

        for container in containers {
            let (cpu, cpu_ok) = quantity_or_zero(container.cpu_request.as_deref(), parse_cpu_strict);
            let (bytes, mem_ok) =
                quantity_or_zero(container.memory_request.as_deref(), parse_memory_strict);
            result.unparsed += u32::from(!cpu_ok) + u32::from(!mem_ok);

            let bucket = match self.category(&container.name) {
                Category::Regular => &mut result.regular,
                Category::Sidecar => &mut result.sidecar,
            };
            bucket.cpu += cpu;
            bucket.memory_gb += bytes_to_gib(bytes);
            bucket.containers += 1;
        }

        result
    }

    /// Sum measured CPU and memory per category
    pub fn classify_usage<'a, I>(&self, containers: I) -> UsageClassification
    where
        I: IntoIterator<Item = &'a ContainerUsage>,
    {
        let mut result = UsageClassification::default();

        for container in containers {
            let (cpu, cpu_ok) = quantity_or_zero(Some(container.cpu.as_str()), parse_cpu_strict);
            let (bytes, mem_ok) = quantity_or_zero(Some(container.memory.as_str()), parse_memory_strict);
            result.unparsed += u32::from(!cpu_ok) + u32::from(!mem_ok);

            let bucket = match self.category(&container.name) {
                Category::Regular => &mut result.regular,
                Category::Sidecar => &mut result.sidecar,
            };
            bucket.cpu += cpu;
            bucket.memory_gb += bytes_to_gib(bytes);
        }

        result
    }
}

impl Default for ResourceClassifier {
    fn default() -> Self {
        Self::new(MeshConfig::default())
    }
}

/// Parse an optional quantity; absent counts as a valid zero, present but
/// malformed counts as zero and is flagged
fn quantity_or_zero<E>(
    quantity: Option<&str>,
    parse: impl Fn(&str) -> Result<f64, E>,
) -> (f64, bool) {
    match quantity {
        None => (0.0, true),
        Some(q) => match parse(q) {
            Ok(v) => (v, true),
            Err(_) => (0.0, false),
        },
    }
}
