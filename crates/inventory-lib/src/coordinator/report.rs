//! Per-run outcome summary
//!
//! The snapshot records what was collected; the report records what
//! happened while collecting it. It is printed at the end of a run and is
//! never persisted.

use crate::collector::{CollectionError, ErrorKind};
use crate::models::UnitKind;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters for one unit kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnitCounts {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl UnitCounts {
    /// Units that were neither collected, skipped nor failed
    pub fn pending(&self) -> usize {
        self.total
            .saturating_sub(self.succeeded + self.skipped + self.failed)
    }
}

/// A failure or warning attached to one unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitIssue {
    pub kind: UnitKind,
    pub key: String,
    pub error_kind: ErrorKind,
    pub message: String,
}

impl UnitIssue {
    fn new(kind: UnitKind, key: &str, error: &CollectionError) -> Self {
        Self {
            kind,
            key: key.to_string(),
            error_kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Summary of one inventory run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub cluster: String,
    pub has_metrics: bool,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub nodes: UnitCounts,
    pub namespaces: UnitCounts,
    pub failures: Vec<UnitIssue>,
    pub warnings: Vec<UnitIssue>,
    /// Units lost to a crashed job
    pub aborted: usize,
    /// A stop was requested before all units were dispatched
    pub interrupted: bool,
}

impl RunReport {
    pub fn new(cluster: impl Into<String>, has_metrics: bool) -> Self {
        Self {
            cluster: cluster.into(),
            has_metrics,
            started_at: Utc::now(),
            finished_at: None,
            nodes: UnitCounts::default(),
            namespaces: UnitCounts::default(),
            failures: Vec::new(),
            warnings: Vec::new(),
            aborted: 0,
            interrupted: false,
        }
    }

    pub fn counts(&self, kind: UnitKind) -> &UnitCounts {
        match kind {
            UnitKind::Node => &self.nodes,
            UnitKind::Namespace => &self.namespaces,
        }
    }

    fn counts_mut(&mut self, kind: UnitKind) -> &mut UnitCounts {
        match kind {
            UnitKind::Node => &mut self.nodes,
            UnitKind::Namespace => &mut self.namespaces,
        }
    }

    pub(crate) fn set_total(&mut self, kind: UnitKind, total: usize) {
        self.counts_mut(kind).total = total;
    }

    pub(crate) fn record_success(&mut self, kind: UnitKind, key: &str, warnings: &[CollectionError]) {
        self.counts_mut(kind).succeeded += 1;
        self.warnings
            .extend(warnings.iter().map(|w| UnitIssue::new(kind, key, w)));
    }

    pub(crate) fn record_skip(&mut self, kind: UnitKind) {
        self.counts_mut(kind).skipped += 1;
    }

    pub(crate) fn record_failure(&mut self, kind: UnitKind, key: &str, error: &CollectionError) {
        self.counts_mut(kind).failed += 1;
        self.failures.push(UnitIssue::new(kind, key, error));
    }

    pub(crate) fn finish(&mut self) {
        self.failures
            .sort_by(|a, b| (a.kind as u8, &a.key).cmp(&(b.kind as u8, &b.key)));
        self.warnings
            .sort_by(|a, b| (a.kind as u8, &a.key).cmp(&(b.kind as u8, &b.key)));
        self.finished_at = Some(Utc::now());
    }

    pub fn succeeded(&self) -> usize {
        self.nodes.succeeded + self.namespaces.succeeded
    }

    pub fn skipped(&self) -> usize {
        self.nodes.skipped + self.namespaces.skipped
    }

    pub fn failed(&self) -> usize {
        self.nodes.failed + self.namespaces.failed
    }

    /// Units a `--resume` run would still attempt
    pub fn remaining(&self) -> usize {
        (self.nodes.total + self.namespaces.total).saturating_sub(self.succeeded() + self.skipped())
    }

    /// Every unit is present in the snapshot
    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }
}
