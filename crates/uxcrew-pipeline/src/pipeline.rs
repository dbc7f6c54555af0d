//! Pipeline orchestration.
//!
//! A run walks `Uploaded -> VisionAnalyzed -> HeuristicsEvaluated ->
//! FeedbackGenerated -> WireframeGenerated`, or stops in `Failed` at the first
//! stage error. Stages are strictly sequential and each stage's artifact is
//! stored before the next stage starts. Nothing is skipped or retried.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, Instrument};

use artifact_store::{ArtifactId, ArtifactStore, EvaluationId, EvaluationRecord, EvaluationStore};
use uxcrew_core::{
    emit_pipeline_finished, emit_pipeline_started, run_span, FeedbackReport, GenerationBackend,
    HeuristicEvaluation, PipelineConfig, Screenshot, Stage, VisionAnalysis, Wireframe,
};

use crate::error::{PipelineFailure, StageError};
use crate::runner::StageExecutor;
use crate::stage::StageInput;

/// Where a run currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Uploaded,
    VisionAnalyzed,
    HeuristicsEvaluated,
    FeedbackGenerated,
    WireframeGenerated,
    Failed { stage: Stage, reason: String },
}

impl PipelineState {
    /// State reached once `stage` has succeeded.
    pub fn after(stage: Stage) -> Self {
        match stage {
            Stage::Vision => PipelineState::VisionAnalyzed,
            Stage::Heuristics => PipelineState::HeuristicsEvaluated,
            Stage::Feedback => PipelineState::FeedbackGenerated,
            Stage::Wireframe => PipelineState::WireframeGenerated,
        }
    }

    /// Fraction of the evaluation phase completed, for progress reporting.
    pub fn progress(&self) -> f32 {
        match self {
            PipelineState::Uploaded | PipelineState::Failed { .. } => 0.0,
            PipelineState::VisionAnalyzed => 0.33,
            PipelineState::HeuristicsEvaluated => 0.66,
            PipelineState::FeedbackGenerated | PipelineState::WireframeGenerated => 1.0,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Uploaded => f.write_str("uploaded"),
            PipelineState::VisionAnalyzed => f.write_str("vision_analyzed"),
            PipelineState::HeuristicsEvaluated => f.write_str("heuristics_evaluated"),
            PipelineState::FeedbackGenerated => f.write_str("feedback_generated"),
            PipelineState::WireframeGenerated => f.write_str("wireframe_generated"),
            PipelineState::Failed { stage, reason } => write!(f, "Failed({stage}, {reason})"),
        }
    }
}

/// Receives every state transition of a run.
pub trait ProgressObserver: Send + Sync {
    fn on_transition(&self, state: &PipelineState);
}

/// Observer that ignores transitions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_transition(&self, _state: &PipelineState) {}
}

/// Result of [`Pipeline::run_wireframe`].
#[derive(Debug, Clone)]
pub struct WireframeOutput {
    pub evaluation_id: EvaluationId,
    pub wireframe: Wireframe,
    pub artifact_id: ArtifactId,
}

/// Result of [`Pipeline::run_full`].
#[derive(Debug, Clone)]
pub struct FullRun {
    pub evaluation: EvaluationRecord,
    pub wireframe: WireframeOutput,
}

/// Pipeline orchestrator.
#[derive(Clone)]
pub struct Pipeline {
    executor: StageExecutor,
    evaluations: Arc<dyn EvaluationStore>,
    observer: Arc<dyn ProgressObserver>,
}

impl Pipeline {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        artifacts: Arc<dyn ArtifactStore>,
        evaluations: Arc<dyn EvaluationStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            executor: StageExecutor::new(backend, artifacts, config),
            evaluations,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Same pipeline, reporting transitions to `observer`.
    pub fn with_observer(&self, observer: Arc<dyn ProgressObserver>) -> Self {
        Self {
            executor: self.executor.clone(),
            evaluations: Arc::clone(&self.evaluations),
            observer,
        }
    }

    pub fn artifacts(&self) -> &Arc<dyn ArtifactStore> {
        self.executor.store()
    }

    pub fn evaluations(&self) -> &Arc<dyn EvaluationStore> {
        &self.evaluations
    }

    fn fail(&self, stage: Stage, error: StageError) -> PipelineFailure {
        self.observer.on_transition(&PipelineState::Failed {
            stage,
            reason: error.to_string(),
        });
        PipelineFailure::new(stage, error)
    }

    fn advance(&self, stage: Stage) {
        self.observer.on_transition(&PipelineState::after(stage));
    }

    /// Vision, heuristics and feedback on `screenshot`, then store the
    /// combined record so the wireframe stage can resume from it.
    pub async fn run_evaluation(
        &self,
        screenshot: &Screenshot,
    ) -> Result<EvaluationRecord, PipelineFailure> {
        let created_at = Utc::now();
        let evaluation_id = EvaluationId::generate(created_at);
        let span = run_span(evaluation_id.as_str());

        async {
            let start = Instant::now();
            emit_pipeline_started(evaluation_id.as_str(), "evaluation");
            self.observer.on_transition(&PipelineState::Uploaded);

            let result = self.evaluate(screenshot, evaluation_id.clone(), created_at).await;
            emit_pipeline_finished(
                evaluation_id.as_str(),
                start.elapsed().as_millis() as u64,
                result.is_ok(),
            );
            result
        }
        .instrument(span)
        .await
    }

    async fn evaluate(
        &self,
        screenshot: &Screenshot,
        evaluation_id: EvaluationId,
        created_at: chrono::DateTime<Utc>,
    ) -> Result<EvaluationRecord, PipelineFailure> {
        let vision = self
            .executor
            .execute::<VisionAnalysis>(&[StageInput::Screenshot(screenshot)])
            .await
            .map_err(|e| self.fail(Stage::Vision, e))?;
        self.advance(Stage::Vision);

        let vision_input = StageInput::json("vision_analysis", &vision.payload)
            .map_err(|e| self.fail(Stage::Heuristics, e))?;
        let heuristics = self
            .executor
            .execute::<HeuristicEvaluation>(&[vision_input.clone()])
            .await
            .map_err(|e| self.fail(Stage::Heuristics, e))?;
        self.advance(Stage::Heuristics);

        let heuristics_input = StageInput::json("heuristic_evaluation", &heuristics.payload)
            .map_err(|e| self.fail(Stage::Feedback, e))?;
        let feedback = self
            .executor
            .execute::<FeedbackReport>(&[vision_input, heuristics_input])
            .await
            .map_err(|e| self.fail(Stage::Feedback, e))?;

        let record = EvaluationRecord {
            evaluation_id,
            created_at,
            vision_analysis: vision.payload,
            heuristic_evaluation: heuristics.payload,
            feedback_report: feedback.payload,
            artifacts: vec![vision.artifact_id, heuristics.artifact_id, feedback.artifact_id],
        };
        self.evaluations
            .save(&record)
            .await
            .map_err(|e| self.fail(Stage::Feedback, e.into()))?;
        self.advance(Stage::Feedback);

        info!(
            evaluation_id = %record.evaluation_id,
            violations = record.heuristic_evaluation.violations.len(),
            feedback_items = record.feedback_report.feedback_items.len(),
            "evaluation stored"
        );
        Ok(record)
    }

    /// Wireframe stage for a stored evaluation.
    ///
    /// Fails with `NotFound` before any generation call when no record
    /// exists for `evaluation_id`.
    pub async fn run_wireframe(
        &self,
        evaluation_id: &EvaluationId,
    ) -> Result<WireframeOutput, PipelineFailure> {
        let span = run_span(evaluation_id.as_str());
        async {
            let start = Instant::now();
            emit_pipeline_started(evaluation_id.as_str(), "wireframe");

            let result = self.wireframe(evaluation_id).await;
            emit_pipeline_finished(
                evaluation_id.as_str(),
                start.elapsed().as_millis() as u64,
                result.is_ok(),
            );
            result
        }
        .instrument(span)
        .await
    }

    async fn wireframe(&self, evaluation_id: &EvaluationId) -> Result<WireframeOutput, PipelineFailure> {
        let record = self
            .evaluations
            .load(evaluation_id)
            .await
            .map_err(|e| self.fail(Stage::Wireframe, e.into()))?;
        self.generate_wireframe(&record).await
    }

    async fn generate_wireframe(
        &self,
        record: &EvaluationRecord,
    ) -> Result<WireframeOutput, PipelineFailure> {
        let inputs = [
            StageInput::json("vision_analysis", &record.vision_analysis),
            StageInput::json("feedback_report", &record.feedback_report),
        ]
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| self.fail(Stage::Wireframe, e))?;

        let output = self
            .executor
            .execute::<Wireframe>(&inputs)
            .await
            .map_err(|e| self.fail(Stage::Wireframe, e))?;
        self.advance(Stage::Wireframe);

        Ok(WireframeOutput {
            evaluation_id: record.evaluation_id.clone(),
            wireframe: output.payload,
            artifact_id: output.artifact_id,
        })
    }

    /// All four stages on `screenshot`.
    pub async fn run_full(&self, screenshot: &Screenshot) -> Result<FullRun, PipelineFailure> {
        let created_at = Utc::now();
        let evaluation_id = EvaluationId::generate(created_at);
        let span = run_span(evaluation_id.as_str());

        async {
            let start = Instant::now();
            emit_pipeline_started(evaluation_id.as_str(), "full");
            self.observer.on_transition(&PipelineState::Uploaded);

            let result = async {
                let evaluation = self
                    .evaluate(screenshot, evaluation_id.clone(), created_at)
                    .await?;
                let wireframe = self.generate_wireframe(&evaluation).await?;
                Ok::<_, PipelineFailure>(FullRun {
                    evaluation,
                    wireframe,
                })
            }
            .await;
            emit_pipeline_finished(
                evaluation_id.as_str(),
                start.elapsed().as_millis() as u64,
                result.is_ok(),
            );
            result
        }
        .instrument(span)
        .await
    }
}
