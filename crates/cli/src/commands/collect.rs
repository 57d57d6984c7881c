//! Snapshot collection command

use anyhow::{bail, Context, Result};
use colored::Colorize;
use inventory_lib::coordinator::{NoProgress, UnitCounts};
use inventory_lib::{
    run_preflight, ComponentStatus, InventoryConfig, InventoryMetrics, InventoryRun, KubeCluster,
    ProgressReporter, RunReport,
};
use serde::Serialize;
use std::sync::Arc;
use tabled::Tabled;
use tokio::sync::broadcast;
use tracing::info;

use crate::config::apply_flags;
use crate::output::{
    color_status, print_error, print_info, print_success, print_table, print_warning,
    OutputFormat,
};
use crate::progress::BarProgress;
use crate::CollectArgs;

/// Row for the per-kind outcome table
#[derive(Tabled, Serialize)]
struct OutcomeRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Total")]
    total: usize,
    #[tabled(rename = "Collected")]
    collected: usize,
    #[tabled(rename = "Skipped")]
    skipped: usize,
    #[tabled(rename = "Failed")]
    failed: usize,
}

impl OutcomeRow {
    fn new(kind: &str, counts: &UnitCounts) -> Self {
        Self {
            kind: kind.to_string(),
            total: counts.total,
            collected: counts.succeeded,
            skipped: counts.skipped,
            failed: counts.failed,
        }
    }
}

/// Row for the failure table
#[derive(Tabled, Serialize)]
struct FailureRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    key: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Collect a snapshot. Returns whether every unit is now in the snapshot.
pub async fn run(settings: InventoryConfig, args: CollectArgs, verbose: bool) -> Result<bool> {
    let config = apply_flags(settings, &args);

    let cluster = KubeCluster::connect(args.context.as_deref())
        .await
        .context("Failed to connect to cluster")?;

    let preflight = run_preflight(&cluster, &config.output, config.resume).await;
    for (name, check) in preflight.problems() {
        let message = format!(
            "{}: {}",
            name,
            check.message.as_deref().unwrap_or("no details")
        );
        match check.status {
            ComponentStatus::Unhealthy => print_error(&message),
            _ => print_warning(&message),
        }
    }
    if !preflight.can_proceed() {
        bail!("Preflight checks failed");
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing in-flight units");
            let _ = shutdown_tx.send(());
        }
    });

    let progress: Arc<dyn ProgressReporter> = if args.no_progress || verbose {
        Arc::new(NoProgress)
    } else {
        Arc::new(BarProgress::new())
    };

    let output = config.output.clone();
    let outcome = InventoryRun::new(Arc::new(cluster), config)
        .with_progress(progress)
        .with_shutdown(shutdown_rx)
        .execute()
        .await?;

    print_summary(&outcome.report);

    if let Some(path) = &args.metrics_file {
        let text = InventoryMetrics::new().render()?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    }

    let complete = outcome.report.is_complete();
    if complete {
        print_success(&format!("Snapshot written to {}", output.display()));
    } else {
        print_warning(&format!(
            "Partial snapshot written to {}; re-run with --resume to collect {} remaining unit(s)",
            output.display(),
            outcome.report.remaining()
        ));
    }

    Ok(complete)
}

fn print_summary(report: &RunReport) {
    println!();
    println!("{}", "Inventory Run".bold());
    println!("{}", "=".repeat(50));
    println!("Cluster:                {}", report.cluster.cyan());
    println!(
        "Live metrics:           {}",
        color_status(if report.has_metrics { "yes" } else { "degraded" })
    );
    println!(
        "Started:                {}",
        report
            .started_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "Elapsed:                {:.1}s",
        report.elapsed().num_milliseconds() as f64 / 1000.0
    );
    let status = if report.interrupted {
        "interrupted"
    } else if report.is_complete() {
        "complete"
    } else {
        "incomplete"
    };
    println!("Status:                 {}", color_status(status));
    println!();

    print_table(
        &[
            OutcomeRow::new("node", &report.nodes),
            OutcomeRow::new("namespace", &report.namespaces),
        ],
        OutputFormat::Table,
    );

    if !report.failures.is_empty() {
        println!();
        println!("{}", "Failed Units".bold());
        let rows: Vec<FailureRow> = report
            .failures
            .iter()
            .map(|f| FailureRow {
                kind: f.kind.to_string(),
                key: f.key.clone(),
                reason: f.message.clone(),
            })
            .collect();
        print_table(&rows, OutputFormat::Table);
    }

    if !report.warnings.is_empty() {
        print_info(&format!(
            "{} unit(s) collected without live usage; their actual figures are zero",
            report.warnings.len()
        ));
    }

    if report.aborted > 0 {
        print_error(&format!("{} collection job(s) crashed", report.aborted));
    }
}
