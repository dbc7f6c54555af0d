//! Stage and pipeline error taxonomy.

use std::fmt;

use artifact_store::{ArtifactId, StoreError};
use thiserror::Error;
use uxcrew_core::{GenerationError, Stage, ValidationIssue};

/// Why a single stage did not produce a usable payload.
#[derive(Error, Debug)]
pub enum StageError {
    /// The backend call failed; nothing was persisted.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The response could not be parsed. The raw text is stored as `artifact_id`.
    #[error("unparseable {stage} response (artifact {artifact_id}): {reason}")]
    UnparseableResponse {
        stage: Stage,
        artifact_id: ArtifactId,
        reason: String,
    },

    /// The response parsed but failed validation under the enforce policy.
    #[error("{stage} output rejected (artifact {artifact_id}): {}", join_issues(.issues))]
    Rejected {
        stage: Stage,
        artifact_id: ArtifactId,
        issues: Vec<ValidationIssue>,
    },

    #[error("missing input {input} for {stage} stage")]
    MissingInput { stage: Stage, input: &'static str },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(StoreError),

    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<StoreError> for StageError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => StageError::NotFound(format!("{kind} {id}")),
            other => StageError::Storage(other),
        }
    }
}

impl StageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StageError::NotFound(_))
    }

    /// Artifact holding the unusable response, if one was written.
    pub fn artifact_id(&self) -> Option<&ArtifactId> {
        match self {
            StageError::UnparseableResponse { artifact_id, .. }
            | StageError::Rejected { artifact_id, .. } => Some(artifact_id),
            _ => None,
        }
    }
}

/// Terminal failure of a run: the stage that failed and why.
#[derive(Debug)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: StageError,
}

impl PipelineFailure {
    pub fn new(stage: Stage, error: StageError) -> Self {
        Self { stage, error }
    }
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed({}, {})", self.stage, self.error)
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
