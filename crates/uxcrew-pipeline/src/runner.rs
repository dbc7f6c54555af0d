//! Stage execution: one generation request, one persisted artifact.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument, warn};

use artifact_store::{ArtifactId, ArtifactStore, NewArtifact};
use uxcrew_core::{
    emit_artifact_written, emit_stage_completed, emit_stage_failed, emit_stage_malformed,
    emit_stage_started, Attachment, GenerationBackend, GenerationError, GenerationRequest,
    Normalized, PipelineConfig, PolicyOutcome, Stage, ValidationIssue,
};

use crate::error::StageError;
use crate::stage::{compose_instructions, StageConfig, StageInput, StagePayload};

/// A stage payload together with the artifact it was stored as.
#[derive(Debug, Clone)]
pub struct StageOutput<P> {
    pub payload: P,
    pub artifact_id: ArtifactId,
    /// Validation issues found before any repair.
    pub issues: Vec<ValidationIssue>,
    pub duration_ms: u64,
}

/// Runs single stages against a generation backend and an artifact store.
#[derive(Clone)]
pub struct StageExecutor {
    backend: Arc<dyn GenerationBackend>,
    store: Arc<dyn ArtifactStore>,
    config: PipelineConfig,
}

impl StageExecutor {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        store: Arc<dyn ArtifactStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            backend,
            store,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Build the single request a stage sends.
    pub fn compose(
        &self,
        stage: Stage,
        inputs: &[StageInput<'_>],
    ) -> Result<GenerationRequest, StageError> {
        let config = StageConfig::from_pipeline(stage, &self.config);
        let mut request = GenerationRequest::new(config.model, compose_instructions(stage, inputs)?);
        for input in inputs {
            if let StageInput::Screenshot(shot) = input {
                request = request.with_attachment(Attachment::image(shot));
            }
        }
        Ok(request)
    }

    /// Run stage `P::STAGE` once.
    ///
    /// Exactly one backend call and, unless that call fails, exactly one
    /// artifact write. A malformed or rejected response is persisted before
    /// the error is returned.
    #[instrument(skip(self, inputs), fields(stage = %P::STAGE, model = %self.config.models.get(P::STAGE)))]
    pub async fn execute<P: StagePayload>(
        &self,
        inputs: &[StageInput<'_>],
    ) -> Result<StageOutput<P>, StageError> {
        let stage = P::STAGE;
        let config = StageConfig::from_pipeline(stage, &self.config);
        let request = self.compose(stage, inputs)?;
        let start = Instant::now();

        emit_stage_started(stage, &config.model);
        let raw = match self.call_backend(&config, &request).await {
            Ok(raw) => raw,
            Err(e) => {
                emit_stage_failed(stage, &e);
                return Err(e.into());
            }
        };
        debug!(bytes = raw.len(), "stage response received");

        let mut payload = match P::normalize(&raw) {
            Normalized::Valid(payload) => payload,
            Normalized::Malformed { reason, .. } => {
                let artifact_id = self
                    .store
                    .put(NewArtifact::malformed(stage, raw.as_str(), reason.as_str()))
                    .await?;
                emit_artifact_written(stage, artifact_id.as_str(), raw.len());
                emit_stage_malformed(stage, artifact_id.as_str(), &reason);
                return Err(StageError::UnparseableResponse {
                    stage,
                    artifact_id,
                    reason,
                });
            }
        };

        match config.policy.apply(&mut payload) {
            PolicyOutcome::Accepted { issues } => {
                for issue in &issues {
                    warn!(stage = %stage, field = %issue.field, "{}", issue.message);
                }
                let value = serde_json::to_value(&payload)?;
                let artifact_id = self
                    .store
                    .put(NewArtifact::parsed(stage, raw.as_str(), value).with_issues(issues.clone()))
                    .await?;
                let duration_ms = start.elapsed().as_millis() as u64;
                emit_artifact_written(stage, artifact_id.as_str(), raw.len());
                emit_stage_completed(stage, artifact_id.as_str(), duration_ms, issues.len());
                Ok(StageOutput {
                    payload,
                    artifact_id,
                    issues,
                    duration_ms,
                })
            }
            PolicyOutcome::Rejected { issues } => {
                let artifact_id = self
                    .store
                    .put(
                        NewArtifact::malformed(stage, raw.as_str(), "validation failed")
                            .with_issues(issues.clone()),
                    )
                    .await?;
                emit_artifact_written(stage, artifact_id.as_str(), raw.len());
                emit_stage_malformed(stage, artifact_id.as_str(), "validation failed");
                Err(StageError::Rejected {
                    stage,
                    artifact_id,
                    issues,
                })
            }
        }
    }

    async fn call_backend(
        &self,
        config: &StageConfig,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError> {
        match config.timeout {
            Some(limit) => tokio::time::timeout(limit, self.backend.generate(request))
                .await
                .map_err(|_| GenerationError::Timeout(limit.as_secs()))?,
            None => self.backend.generate(request).await,
        }
    }
}
