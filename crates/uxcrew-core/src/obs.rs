//! Structured lifecycle events for pipeline runs.
//!
//! Each function emits one `tracing` event with a stable `event` field so log
//! pipelines can filter on it. [`run_span`] tags every line logged during a
//! run with its `run_id`.

use tracing::{info, warn};

use crate::domain::Stage;

/// Span that tags every event of one pipeline run with its `run_id`.
///
/// Attach it with [`tracing::Instrument`] so it follows the future across
/// `.await` points:
///
/// ```ignore
/// async { /* stages */ }.instrument(run_span("eval_20260101_000000_ab12cd34")).await
/// ```
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("uxcrew.run", run_id = %run_id)
}

pub fn emit_pipeline_started(run_id: &str, entry_point: &str) {
    info!(event = "pipeline.started", run_id = %run_id, entry_point = %entry_point);
}

pub fn emit_stage_started(stage: Stage, model: &str) {
    info!(event = "stage.started", stage = %stage, model = %model);
}

pub fn emit_stage_completed(stage: Stage, artifact_id: &str, duration_ms: u64, issues: usize) {
    info!(
        event = "stage.completed",
        stage = %stage,
        artifact_id = %artifact_id,
        duration_ms = duration_ms,
        issues = issues,
    );
}

/// The response was persisted but could not be used.
pub fn emit_stage_malformed(stage: Stage, artifact_id: &str, reason: &str) {
    warn!(event = "stage.malformed", stage = %stage, artifact_id = %artifact_id, reason = %reason);
}

pub fn emit_stage_failed(stage: Stage, error: &dyn std::fmt::Display) {
    warn!(event = "stage.failed", stage = %stage, error = %error);
}

pub fn emit_artifact_written(stage: Stage, artifact_id: &str, bytes: usize) {
    info!(event = "artifact.written", stage = %stage, artifact_id = %artifact_id, bytes = bytes);
}

pub fn emit_pipeline_finished(run_id: &str, duration_ms: u64, success: bool) {
    info!(
        event = "pipeline.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        success = success,
    );
}
