//! Inventory run coordination
//!
//! A run probes the metrics API once, opens the snapshot (fresh or resumed),
//! enumerates nodes and then namespaces, and dispatches one job per unit not
//! already in the snapshot onto a bounded [`WorkerPool`]. Jobs share nothing
//! mutable: each returns its own record, which the single
//! [`SnapshotMerger`] folds into the document and flushes to disk.
//!
//! A unit that fails is logged and left out of the snapshot, so the next
//! `resume` run picks it up again.

mod pool;
mod progress;
mod report;


pub use pool::{PoolOutcome, StopSignal, StopTrigger, WorkerPool};
pub use progress::{NoProgress, ProgressReporter};
pub use report::{RunReport, UnitCounts, UnitIssue};

use crate::classifier::ResourceClassifier;
use crate::cluster::{ClusterAccess, NamespaceInfo};
use crate::collector::{CollectionError, NamespaceCollector, NodeCollector};
use crate::config::InventoryConfig;
use crate::models::{ClusterSnapshot, SnapshotEntry, UnitKind};
use crate::obfuscate::Obfuscator;
use crate::observability::{InventoryLogger, InventoryMetrics};
use crate::snapshot::{MergerHandle, SnapshotMerger, SnapshotStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::error;

/// Final snapshot and report of a run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub snapshot: ClusterSnapshot,
    pub report: RunReport,
}

/// One inventory run against one cluster
pub struct InventoryRun {
    cluster: Arc<dyn ClusterAccess>,
    config: InventoryConfig,
    progress: Arc<dyn ProgressReporter>,
    shutdown: Option<broadcast::Receiver<()>>,
}

impl InventoryRun {
    pub fn new(cluster: Arc<dyn ClusterAccess>, config: InventoryConfig) -> Self {
        Self {
            cluster,
            config,
            progress: Arc::new(NoProgress),
            shutdown: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Stop dispatching new jobs once a message arrives on `shutdown`.
    /// In-flight jobs still finish and are merged.
    pub fn with_shutdown(mut self, shutdown: broadcast::Receiver<()>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Execute the run.
    ///
    /// Errors only for conditions that make the whole run meaningless:
    /// the cluster cannot be enumerated, an existing snapshot cannot be
    /// resumed, or the snapshot cannot be written.
    pub async fn execute(self) -> Result<RunOutcome> {
        let InventoryRun {
            cluster,
            config,
            progress,
            shutdown,
        } = self;

        let has_metrics = cluster.metrics_available().await;
        let obfuscator = Obfuscator::new(config.obfuscate);
        let cluster_key = obfuscator.apply(cluster.cluster_name());

        let store = SnapshotStore::new(config.output.clone());
        let snapshot = store.open(&cluster_key, has_metrics, config.resume)?;

        let node_names = cluster.list_nodes().await.context("Failed to list nodes")?;
        let namespaces = cluster
            .list_namespaces()
            .await
            .context("Failed to list namespaces")?;

        let pool = WorkerPool::new(config.effective_parallelism(), config.discipline);
        let logger = InventoryLogger::new(cluster_key.clone());
        logger.log_run_started(
            config.resume,
            config.obfuscate,
            has_metrics,
            pool.parallelism(),
            config.discipline.as_str(),
        );

        let mut report = RunReport::new(cluster_key, has_metrics);
        report.set_total(UnitKind::Node, node_names.len());
        report.set_total(UnitKind::Namespace, namespaces.len());

        let total = node_names.len() + namespaces.len();
        progress.start(total);

        // Partition units into already-collected and pending before any job starts
        let mut skipped = Vec::new();
        let mut node_jobs = Vec::new();
        for name in node_names {
            let key = obfuscator.apply(&name);
            if snapshot.contains(UnitKind::Node, &key) {
                skipped.push((UnitKind::Node, key));
            } else {
                node_jobs.push(NodeJob { name, key });
            }
        }

        let mut namespace_jobs = Vec::new();
        for info in namespaces {
            let key = obfuscator.apply(&info.name);
            if snapshot.contains(UnitKind::Namespace, &key) {
                skipped.push((UnitKind::Namespace, key));
            } else {
                namespace_jobs.push(NamespaceJob { info, key });
            }
        }

        let (merger, merger_task) = SnapshotMerger::new(snapshot, store).spawn();
        let mut stop = StopSignal::new(shutdown);

        let mut state = RunState {
            report,
            done: 0,
            total,
            merger,
            logger: logger.clone(),
            metrics: InventoryMetrics::new(),
            progress: progress.as_ref(),
            halt: stop.trigger_handle(),
        };

        for (kind, key) in skipped {
            state.skip(kind, &key);
        }

        let node_collector = NodeCollector::new();
        let node_outcome = pool
            .run(
                node_jobs,
                |job: NodeJob| {
                    let cluster = Arc::clone(&cluster);
                    async move {
                        let started = Instant::now();
                        let outcome = node_collector
                            .collect(&job.name, cluster.as_ref(), has_metrics)
                            .await
                            .map(|collected| {
                                let entry = SnapshotEntry::Node {
                                    key: job.key.clone(),
                                    record: collected.record,
                                };
                                (entry, collected.warnings)
                            });
                        JobResult {
                            kind: UnitKind::Node,
                            key: job.key,
                            elapsed: started.elapsed(),
                            outcome,
                        }
                    }
                },
                &mut stop,
                |result| state.absorb(result),
            )
            .await;
        state.account(node_outcome);

        let namespace_collector =
            Arc::new(NamespaceCollector::new(ResourceClassifier::new(config.mesh.clone())));
        let namespace_outcome = pool
            .run(
                namespace_jobs,
                |job: NamespaceJob| {
                    let cluster = Arc::clone(&cluster);
                    let collector = Arc::clone(&namespace_collector);
                    async move {
                        let started = Instant::now();
                        let outcome = collector
                            .collect(&job.info, cluster.as_ref(), has_metrics)
                            .await
                            .map(|collected| {
                                let entry = SnapshotEntry::Namespace {
                                    key: job.key.clone(),
                                    record: collected.record,
                                };
                                (entry, collected.warnings)
                            });
                        JobResult {
                            kind: UnitKind::Namespace,
                            key: job.key,
                            elapsed: started.elapsed(),
                            outcome,
                        }
                    }
                },
                &mut stop,
                |result| state.absorb(result),
            )
            .await;
        state.account(namespace_outcome);

        let RunState {
            mut report,
            merger,
            ..
        } = state;
        drop(merger);

        let snapshot = merger_task
            .await
            .context("Snapshot merger task failed")?
            .context("Failed to persist snapshot")?;

        report.finish();
        progress.finish();
        logger.log_run_finished(
            report.succeeded(),
            report.skipped(),
            report.failed(),
            report.interrupted,
        );

        Ok(RunOutcome { snapshot, report })
    }
}

struct NodeJob {
    name: String,
    key: String,
}

struct NamespaceJob {
    info: NamespaceInfo,
    key: String,
}

/// What a single job hands back to the coordinator
struct JobResult {
    kind: UnitKind,
    key: String,
    elapsed: Duration,
    outcome: Result<(SnapshotEntry, Vec<CollectionError>), CollectionError>,
}

/// Bookkeeping owned by the coordinating task
struct RunState<'a> {
    report: RunReport,
    done: usize,
    total: usize,
    merger: MergerHandle,
    logger: InventoryLogger,
    metrics: InventoryMetrics,
    progress: &'a dyn ProgressReporter,
    halt: StopTrigger,
}

impl RunState<'_> {
    fn skip(&mut self, kind: UnitKind, key: &str) {
        self.report.record_skip(kind);
        self.metrics.inc_skipped(kind);
        self.logger.log_unit_skipped(kind, key);
        self.tick();
    }

    fn absorb(&mut self, result: JobResult) {
        let JobResult {
            kind,
            key,
            elapsed,
            outcome,
        } = result;
        self.metrics
            .observe_unit_latency(kind, elapsed.as_secs_f64());

        match outcome {
            Ok((entry, warnings)) => {
                for warning in &warnings {
                    self.metrics.inc_warning(warning);
                    self.logger.log_unit_warning(kind, &key, warning);
                }

                if let Err(e) = self.merger.merge(entry) {
                    // The merger only stops on a write failure; the run error
                    // surfaces when its task is joined
                    error!(error = %e, "Snapshot merger unavailable, stopping dispatch");
                    self.halt.trigger();
                    return;
                }

                self.report.record_success(kind, &key, &warnings);
                self.metrics.inc_collected(kind);
                self.logger
                    .log_unit_collected(kind, &key, elapsed.as_millis());
            }
            Err(e) => {
                self.report.record_failure(kind, &key, &e);
                self.metrics.inc_failed(kind);
                self.logger.log_unit_failed(kind, &key, &e);
            }
        }

        self.tick();
    }

    fn account(&mut self, outcome: PoolOutcome) {
        self.report.aborted += outcome.panicked;
        // Panicked jobs never reach the sink
        for _ in 0..outcome.panicked {
            self.tick();
        }
        if outcome.abandoned > 0 {
            self.report.interrupted = true;
        }
    }

    fn tick(&mut self) {
        self.done += 1;
        self.progress.advance(self.done, self.total);
    }
}
