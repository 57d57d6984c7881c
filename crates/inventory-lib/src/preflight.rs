//! Preflight checks run before an inventory starts
//!
//! Each check reports a [`ComponentStatus`]. An unhealthy check aborts the run
//! before any work is dispatched; a degraded check is reported and the
//! run continues with reduced output (for example without live usage).

use crate::cluster::ClusterAccess;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Outcome of a single preflight check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Check passed
    Healthy,
    /// Run can proceed with reduced output
    Degraded,
    /// Run cannot proceed
    Unhealthy,
}

impl ComponentStatus {
    /// Returns true if the run may proceed
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Result of one named check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            checked_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Degraded,
            message: Some(message.into()),
            checked_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Unhealthy,
            message: Some(message.into()),
            checked_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Check names
pub mod checks {
    pub const CLUSTER_ACCESS: &str = "cluster_access";
    pub const METRICS_API: &str = "metrics_api";
    pub const SNAPSHOT_OUTPUT: &str = "snapshot_output";
}

/// All preflight results for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightReport {
    pub status: ComponentStatus,
    pub checks: BTreeMap<String, ComponentHealth>,
}

impl PreflightReport {
    fn from_checks(checks: BTreeMap<String, ComponentHealth>) -> Self {
        let status = Self::compute_status(&checks);
        Self { status, checks }
    }

    /// Overall status is the worst individual status
    pub fn compute_status(checks: &BTreeMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;

        for result in checks.values() {
            match result.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => has_degraded = true,
                ComponentStatus::Healthy => {}
            }
        }

        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }

    pub fn can_proceed(&self) -> bool {
        self.status.is_operational()
    }

    /// Checks that did not pass, in name order
    pub fn problems(&self) -> impl Iterator<Item = (&str, &ComponentHealth)> {
        self.checks
            .iter()
            .filter(|(_, r)| r.status != ComponentStatus::Healthy)
            .map(|(name, r)| (name.as_str(), r))
    }
}

/// Run all preflight checks against a cluster and output location
pub async fn run_preflight(
    cluster: &dyn ClusterAccess,
    output: &Path,
    resume: bool,
) -> PreflightReport {
    let mut results = BTreeMap::new();

    let access = match cluster.list_namespaces().await {
        Ok(_) => ComponentHealth::healthy(),
        Err(e) => ComponentHealth::unhealthy(format!("cannot list namespaces: {}", e)),
    };
    let reachable = access.status == ComponentStatus::Healthy;
    results.insert(checks::CLUSTER_ACCESS.to_string(), access);

    let metrics = if !reachable {
        ComponentHealth::degraded("not probed, cluster unreachable")
    } else if cluster.metrics_available().await {
        ComponentHealth::healthy()
    } else {
        ComponentHealth::degraded("metrics API not served; actual usage will be omitted")
    };
    results.insert(checks::METRICS_API.to_string(), metrics);

    results.insert(
        checks::SNAPSHOT_OUTPUT.to_string(),
        check_output(output, resume),
    );

    PreflightReport::from_checks(results)
}

fn check_output(output: &Path, resume: bool) -> ComponentHealth {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // The store creates missing directories, so check the nearest one that exists
    let existing = dir
        .ancestors()
        .find(|p| !p.as_os_str().is_empty() && p.exists())
        .unwrap_or(Path::new("."));

    if !existing.is_dir() {
        return ComponentHealth::unhealthy(format!("{} is not a directory", existing.display()));
    }
    if let Err(e) = tempfile::tempfile_in(existing) {
        return ComponentHealth::unhealthy(format!(
            "{} is not writable: {}",
            existing.display(),
            e
        ));
    }

    if existing != dir {
        return ComponentHealth::degraded(format!(
            "{} does not exist and will be created",
            dir.display()
        ));
    }

    match (output.exists(), resume) {
        (true, false) => ComponentHealth::degraded(format!(
            "{} exists and will be replaced",
            output.display()
        )),
        (false, true) => ComponentHealth::degraded(format!(
            "{} does not exist; starting a fresh inventory",
            output.display()
        )),
        _ => ComponentHealth::healthy(),
    }
}
