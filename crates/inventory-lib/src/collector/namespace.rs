//! Namespace collection
//!
//! Builds one [`NamespaceRecord`] from the pods of a namespace. The record
//! shape depends on two flags decided once per namespace: mesh injection
//! (whether `sidecar` is emitted) and metrics availability (whether
//! `actual` is emitted).

use super::{Collected, CollectionError};
use crate::classifier::{Classification, ResourceClassifier, UsageClassification};
use crate::cluster::{ClusterAccess, ClusterError, NamespaceInfo};
use crate::models::{CategoryUsage, NamespaceRecord};
use tracing::{debug, warn};

/// Collects per-namespace pod and resource aggregates
#[derive(Debug, Clone, Default)]
pub struct NamespaceCollector {
    classifier: ResourceClassifier,
}

impl NamespaceCollector {
    pub fn new(classifier: ResourceClassifier) -> Self {
        Self { classifier }
    }

    /// Collect one namespace
    pub async fn collect(
        &self,
        namespace: &NamespaceInfo,
        cluster: &dyn ClusterAccess,
        metrics_available: bool,
    ) -> Result<Collected<NamespaceRecord>, CollectionError> {
        let name = namespace.name.as_str();
        let mut warnings = Vec::new();

        let pods = match cluster.list_pods(name).await {
            Ok(pods) => pods,
            Err(ClusterError::Malformed(reason)) => {
                return Err(CollectionError::malformed(name, reason));
            }
            Err(e) => {
                debug!(namespace = %name, error = %e, "Pod list unavailable");
                return Err(CollectionError::no_pods(name));
            }
        };

        if pods.is_empty() {
            return Err(CollectionError::no_pods(name));
        }

        let pod_count = u32::try_from(pods.len())
            .map_err(|_| CollectionError::malformed(name, "pod count out of range"))?;

        let requested = self
            .classifier
            .classify_requests(pods.iter().flat_map(|p| p.containers.iter()));
        if requested.unparsed > 0 {
            warn!(
                namespace = %name,
                unparsed = requested.unparsed,
                "Unparseable resource requests counted as zero"
            );
        }

        let usage = if metrics_available {
            Some(self.collect_usage(name, cluster, &mut warnings).await)
        } else {
            None
        };

        let mesh_injected = self.classifier.mesh().is_injected(&namespace.labels);
        let record = build_record(pod_count, mesh_injected, &requested, usage.as_ref());
        validate(name, &record)?;

        Ok(Collected { record, warnings })
    }

    /// Live usage per category; any failure degrades to zeros with a warning
    async fn collect_usage(
        &self,
        name: &str,
        cluster: &dyn ClusterAccess,
        warnings: &mut Vec<CollectionError>,
    ) -> UsageClassification {
        match cluster.pod_usage(name).await {
            Ok(pods) if pods.is_empty() => {
                warnings.push(CollectionError::metrics(name, "no pod metrics reported"));
                UsageClassification::default()
            }
            Ok(pods) => {
                let usage = self
                    .classifier
                    .classify_usage(pods.iter().flat_map(|p| p.containers.iter()));
                if usage.unparsed > 0 {
                    warn!(
                        namespace = %name,
                        unparsed = usage.unparsed,
                        "Unparseable usage quantities counted as zero"
                    );
                }
                usage
            }
            Err(e) => {
                warnings.push(CollectionError::metrics(name, e));
                UsageClassification::default()
            }
        }
    }
}

fn build_record(
    pods: u32,
    mesh_injected: bool,
    requested: &Classification,
    usage: Option<&UsageClassification>,
) -> NamespaceRecord {
    let regular = CategoryUsage {
        requested: requested.regular,
        actual: usage.map(|u| u.regular),
    };

    let sidecar = mesh_injected.then(|| CategoryUsage {
        requested: requested.sidecar,
        actual: usage.map(|u| u.sidecar),
    });

    NamespaceRecord {
        pods,
        mesh_injected,
        regular,
        sidecar,
    }
}

fn validate(name: &str, record: &NamespaceRecord) -> Result<(), CollectionError> {
    let categories = std::iter::once(&record.regular).chain(record.sidecar.as_ref());

    for category in categories {
        let requested = &category.requested;
        let actual = category.actual.unwrap_or_default();
        let values = [requested.cpu, requested.memory_gb, actual.cpu, actual.memory_gb];

        if values.iter().any(|v| !v.is_finite()) {
            return Err(CollectionError::construction(
                name,
                "aggregate is not a finite number",
            ));
        }
    }

    Ok(())
}
