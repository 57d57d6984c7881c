//! Observability infrastructure for inventory runs
//!
//! Provides:
//! - Prometheus metrics (unit outcomes, per-unit latency, snapshot flushes)
//! - Structured logging of run and unit events with tracing

use crate::collector::CollectionError;
use crate::models::UnitKind;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for per-unit collection latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<InventoryMetricsInner> = OnceLock::new();

struct InventoryMetricsInner {
    units_total: IntCounterVec,
    unit_latency_seconds: HistogramVec,
    warnings_total: IntCounterVec,
    snapshot_flushes: IntCounter,
}

impl InventoryMetricsInner {
    fn new() -> Self {
        Self {
            units_total: register_int_counter_vec!(
                "cluster_inventory_units_total",
                "Work units processed, by kind and outcome",
                &["kind", "outcome"]
            )
            .expect("Failed to register units_total"),

            unit_latency_seconds: register_histogram_vec!(
                "cluster_inventory_unit_latency_seconds",
                "Time spent collecting a single node or namespace",
                &["kind"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register unit_latency_seconds"),

            warnings_total: register_int_counter_vec!(
                "cluster_inventory_warnings_total",
                "Soft warnings raised while collecting, by kind",
                &["kind"]
            )
            .expect("Failed to register warnings_total"),

            snapshot_flushes: register_int_counter!(
                "cluster_inventory_snapshot_flushes_total",
                "Number of times the snapshot document was written to disk"
            )
            .expect("Failed to register snapshot_flushes"),
        }
    }
}

/// Inventory metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct InventoryMetrics {
    _private: (),
}

impl Default for InventoryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(InventoryMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &InventoryMetricsInner {
        GLOBAL_METRICS.get_or_init(InventoryMetricsInner::new)
    }

    pub fn inc_collected(&self, kind: UnitKind) {
        self.inc_outcome(kind, "collected");
    }

    pub fn inc_skipped(&self, kind: UnitKind) {
        self.inc_outcome(kind, "skipped");
    }

    pub fn inc_failed(&self, kind: UnitKind) {
        self.inc_outcome(kind, "failed");
    }

    fn inc_outcome(&self, kind: UnitKind, outcome: &str) {
        self.inner()
            .units_total
            .with_label_values(&[&kind.to_string(), outcome])
            .inc();
    }

    pub fn observe_unit_latency(&self, kind: UnitKind, duration_secs: f64) {
        self.inner()
            .unit_latency_seconds
            .with_label_values(&[&kind.to_string()])
            .observe(duration_secs);
    }

    pub fn inc_warning(&self, warning: &CollectionError) {
        self.inner()
            .warnings_total
            .with_label_values(&[warning.kind().as_str()])
            .inc();
    }

    pub fn inc_snapshot_flushes(&self) {
        self.inner().snapshot_flushes.inc();
    }

    /// Units processed so far with the given outcome
    pub fn units(&self, kind: UnitKind, outcome: &str) -> u64 {
        self.inner()
            .units_total
            .with_label_values(&[&kind.to_string(), outcome])
            .get()
    }

    /// Render all registered metrics in the text exposition format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Structured logger for inventory events
///
/// Every event carries the cluster identity as it appears in the snapshot.
#[derive(Clone)]
pub struct InventoryLogger {
    cluster: String,
}

impl InventoryLogger {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }

    pub fn log_run_started(
        &self,
        resume: bool,
        obfuscate: bool,
        has_metrics: bool,
        parallelism: usize,
        discipline: &str,
    ) {
        info!(
            event = "run_started",
            cluster = %self.cluster,
            resume = resume,
            obfuscate = obfuscate,
            has_metrics = has_metrics,
            parallelism = parallelism,
            discipline = %discipline,
            "Starting cluster inventory"
        );
    }

    pub fn log_unit_collected(&self, kind: UnitKind, key: &str, elapsed_ms: u128) {
        debug!(
            event = "unit_collected",
            cluster = %self.cluster,
            kind = %kind,
            key = %key,
            elapsed_ms = elapsed_ms,
            "Collected {}", kind
        );
    }

    pub fn log_unit_skipped(&self, kind: UnitKind, key: &str) {
        debug!(
            event = "unit_skipped",
            cluster = %self.cluster,
            kind = %kind,
            key = %key,
            "Already in snapshot, skipping {}", kind
        );
    }

    pub fn log_unit_warning(&self, kind: UnitKind, key: &str, warning: &CollectionError) {
        warn!(
            event = "unit_warning",
            cluster = %self.cluster,
            kind = %kind,
            key = %key,
            warning = %warning,
            "Collected {} with degraded data", kind
        );
    }

    pub fn log_unit_failed(&self, kind: UnitKind, key: &str, error: &CollectionError) {
        warn!(
            event = "unit_failed",
            cluster = %self.cluster,
            kind = %kind,
            key = %key,
            error_kind = error.kind().as_str(),
            error = %error,
            "Skipping {}; re-run with --resume to retry only failed units", kind
        );
    }

    pub fn log_snapshot_flushed(&self, path: &Path, nodes: usize, namespaces: usize) {
        debug!(
            event = "snapshot_flushed",
            cluster = %self.cluster,
            path = %path.display(),
            nodes = nodes,
            namespaces = namespaces,
            "Snapshot written"
        );
    }

    pub fn log_run_finished(&self, succeeded: usize, skipped: usize, failed: usize, interrupted: bool) {
        if failed > 0 || interrupted {
            warn!(
                event = "run_finished",
                cluster = %self.cluster,
                succeeded = succeeded,
                skipped = skipped,
                failed = failed,
                interrupted = interrupted,
                "Inventory incomplete; re-run with --resume to collect the remaining units"
            );
        } else {
            info!(
                event = "run_finished",
                cluster = %self.cluster,
                succeeded = succeeded,
                skipped = skipped,
                "Cluster inventory complete"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_metrics_counters() {
        let metrics = InventoryMetrics::new();

        // Global registry is shared across tests, so compare deltas
        let before = metrics.units(UnitKind::Node, "collected");
        metrics.inc_collected(UnitKind::Node);
        metrics.inc_collected(UnitKind::Node);
        assert_eq!(metrics.units(UnitKind::Node, "collected"), before + 2);

        metrics.observe_unit_latency(UnitKind::Namespace, 0.02);
        metrics.inc_warning(&CollectionError::MetricsUnavailable {
            unit: "ns".to_string(),
            reason: "down".to_string(),
        });
        metrics.inc_snapshot_flushes();

        let text = metrics.render().unwrap();
        assert!(text.contains("cluster_inventory_units_total"));
        assert!(text.contains("cluster_inventory_snapshot_flushes_total"));
    }

    #[test]
    fn test_inventory_logger_creation() {
        let logger = InventoryLogger::new("prod");
        assert_eq!(logger.cluster, "prod");
    }
}
