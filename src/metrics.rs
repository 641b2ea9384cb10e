//! Pipeline metrics
//!
//! Counters and histograms are labelled by source code. Without an
//! installed recorder the macros are no-ops, so library callers and tests pay
//! nothing for them.

use crate::error::{FetcherError, Result};
use crate::types::UpsertOutcome;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::Path;
use tracing::info;

/// Metrics for one source pipeline run
pub struct PipelineMetrics;

impl PipelineMetrics {
    pub fn run_started(source: &str) {
        counter!("epi_pipeline_runs_total", "source" => source.to_string()).increment(1);
    }

    pub fn run_failed(source: &str) {
        counter!("epi_pipeline_failures_total", "source" => source.to_string()).increment(1);
    }

    pub fn fetch_completed(source: &str, rows: usize, duration_secs: f64) {
        histogram!("epi_fetch_duration_seconds", "source" => source.to_string())
            .record(duration_secs);
        counter!("epi_rows_read_total", "source" => source.to_string()).increment(rows as u64);
    }

    pub fn record_upserted(source: &str, outcome: UpsertOutcome) {
        counter!(
            "epi_records_upserted_total",
            "source" => source.to_string(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
    }

    /// Row dropped because it carries no country code
    pub fn row_skipped(source: &str) {
        counter!("epi_rows_skipped_total", "source" => source.to_string()).increment(1);
    }

    /// Record emitted with a best-effort gid or country name
    pub fn record_degraded(source: &str) {
        counter!("epi_records_degraded_total", "source" => source.to_string()).increment(1);
    }

    pub fn run_completed(source: &str, duration_secs: f64) {
        histogram!("epi_pipeline_duration_seconds", "source" => source.to_string())
            .record(duration_secs);
    }
}

/// Install the Prometheus recorder for in-process rendering.
pub fn init_metrics() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| FetcherError::Config(format!("Failed to install metrics recorder: {e}")))
}

/// Write the text exposition of every recorded metric to `path`.
pub fn write_snapshot(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, handle.render())?;
    info!("Wrote metrics snapshot to {}", path.display());
    Ok(())
}
