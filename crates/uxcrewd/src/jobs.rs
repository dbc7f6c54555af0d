//! Background evaluation of uploaded screenshots.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use artifact_store::{EvaluationId, JobStore, StoreResult};
use uxcrew_core::{Screenshot, Stage};
use uxcrew_pipeline::{PipelineState, ProgressObserver};

use crate::error::ApiError;
use crate::AppState;

/// Forwards pipeline transitions to the job updater task in order.
struct ChannelObserver(mpsc::UnboundedSender<PipelineState>);

impl ProgressObserver for ChannelObserver {
    fn on_transition(&self, state: &PipelineState) {
        // The receiver only goes away once the run is over.
        let _ = self.0.send(state.clone());
    }
}

/// Mark `job_id` running and evaluate its screenshot on a background task.
///
/// Fails with 404 for an unknown job and 409 when it is already running.
pub async fn spawn_evaluation(state: AppState, job_id: Uuid) -> Result<JoinHandle<()>, ApiError> {
    let job = state.jobs.start(&job_id).await?;

    let (tx, mut rx) = mpsc::unbounded_channel::<PipelineState>();
    let pipeline = state.pipeline.with_observer(Arc::new(ChannelObserver(tx)));
    let jobs = state.jobs.clone();

    let updater = tokio::spawn(async move {
        while let Some(transition) = rx.recv().await {
            if matches!(transition, PipelineState::Failed { .. }) {
                continue;
            }
            jobs.set_progress(&job_id, &transition.to_string(), transition.progress())
                .await;
        }
    });

    let jobs = state.jobs.clone();
    Ok(tokio::spawn(async move {
        let shot = match tokio::fs::read(&job.screenshot_path).await {
            Ok(bytes) => Screenshot::from_bytes(bytes).map_err(|e| e.to_string()),
            Err(e) => Err(format!("failed to read upload: {e}")),
        };
        let shot = match shot {
            Ok(shot) => shot,
            Err(reason) => {
                drop(pipeline);
                let _ = updater.await;
                warn!(job_id = %job_id, reason = %reason, "job failed before the first stage");
                jobs.fail(&job_id, "uploaded", &reason).await;
                return;
            }
        };

        let result = pipeline.run_evaluation(&shot).await;
        drop(pipeline);
        let _ = updater.await;

        match result {
            Ok(record) => {
                finish_job(&jobs, job_id, &record.evaluation_id, record.report_text()).await;
            }
            Err(failure) => {
                warn!(job_id = %job_id, error = %failure, "job failed");
                jobs.fail(&job_id, failure.stage.as_str(), &failure.to_string())
                    .await;
            }
        }
    }))
}

/// Record a finished evaluation on the job, or fail the job if the report
/// could not be rendered.
async fn finish_job(
    jobs: &JobStore,
    job_id: Uuid,
    evaluation_id: &EvaluationId,
    report: StoreResult<String>,
) {
    match report {
        Ok(evaluation) => {
            info!(job_id = %job_id, evaluation_id = %evaluation_id, "job completed");
            jobs.complete(
                &job_id,
                json!({ "evaluation_id": evaluation_id, "evaluation": evaluation }),
            )
            .await;
        }
        Err(e) => {
            warn!(job_id = %job_id, evaluation_id = %evaluation_id, error = %e, "job report failed");
            jobs.fail(
                &job_id,
                Stage::Feedback.as_str(),
                &format!("failed to render evaluation {evaluation_id}: {e}"),
            )
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use artifact_store::{JobStatus, StoreError};

    use super::*;

    async fn running_job(jobs: &JobStore) -> Uuid {
        let id = Uuid::new_v4();
        jobs.insert(id, PathBuf::from("uploads/login.png")).await.unwrap();
        jobs.start(&id).await.unwrap();
        id
    }

    #[tokio::test]
    async fn finished_job_carries_the_report() {
        let jobs = JobStore::new();
        let id = running_job(&jobs).await;
        let evaluation_id = EvaluationId::parse("eval_20260101_000000_ab12cd34").unwrap();

        finish_job(&jobs, id, &evaluation_id, Ok("{\"summary\": {}}".to_string())).await;

        let job = jobs.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(
            job.result.unwrap(),
            json!({"evaluation_id": "eval_20260101_000000_ab12cd34", "evaluation": "{\"summary\": {}}"})
        );
    }

    #[tokio::test]
    async fn report_error_fails_the_job() {
        let jobs = JobStore::new();
        let id = running_job(&jobs).await;
        let evaluation_id = EvaluationId::parse("eval_20260101_000000_ab12cd34").unwrap();

        finish_job(
            &jobs,
            id,
            &evaluation_id,
            Err(StoreError::Serialization("key must be a string".into())),
        )
        .await;

        let job = jobs.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.step.as_deref(), Some("feedback"));
        let error = job.result.unwrap()["error"].as_str().unwrap().to_string();
        assert!(error.contains("key must be a string"), "{error}");
        assert!(error.contains("eval_20260101_000000_ab12cd34"), "{error}");
    }
}
