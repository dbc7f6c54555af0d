//! Storage trait definitions for uxcrew
//!
//! - `ArtifactStore`: append-only stage artifacts (put/get/list)
//! - `EvaluationStore`: combined evaluation records, keyed by evaluation id
//!
//! Both traits are async and backend-agnostic. Filesystem implementations
//! live in `fs` and `evaluation`; in-memory fakes in `fakes`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use uuid::Uuid;

use uxcrew_core::{FeedbackReport, HeuristicEvaluation, Stage, ValidationIssue, VisionAnalysis};

use crate::error::{StoreError, StoreResult};

const MAX_ID_LEN: usize = 128;

/// Ids double as file names, so only `[A-Za-z0-9_-]` is allowed.
fn validate_id(kind: &'static str, id: &str) -> StoreResult<()> {
    let ok = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidId {
            kind,
            id: id.to_string(),
        })
    }
}

/// SHA-256 of `raw`, lowercase hex.
pub fn digest_hex(raw: &str) -> String {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Stage artifacts
// ---------------------------------------------------------------------------

/// Artifact identity: `{stage}_{YYYYmmdd_HHMMSS_mmm}`, with a `-N` suffix
/// when an earlier write already took the same millisecond.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactId(String);

impl ArtifactId {
    pub fn new(stage: Stage, created_at: DateTime<Utc>, seq: u32) -> Self {
        let base = format!(
            "{}_{}",
            stage.artifact_name(),
            created_at.format("%Y%m%d_%H%M%S_%3f")
        );
        if seq <= 1 {
            ArtifactId(base)
        } else {
            ArtifactId(format!("{base}-{seq}"))
        }
    }

    pub fn parse(id: &str) -> StoreResult<Self> {
        validate_id("artifact", id)?;
        Ok(ArtifactId(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stage encoded in the id prefix.
    pub fn stage(&self) -> Option<Stage> {
        Stage::ALL.into_iter().find(|s| {
            self.0
                .strip_prefix(s.artifact_name())
                .is_some_and(|rest| rest.starts_with('_'))
        })
    }

    /// Collision sequence number; 1 for an unsuffixed id.
    pub fn sequence(&self) -> u32 {
        self.0
            .rsplit_once('-')
            .and_then(|(_, n)| n.parse().ok())
            .unwrap_or(1)
    }

    /// Key that orders ids by creation: timestamp first, then sequence.
    pub fn sort_key(&self) -> (&str, u32) {
        let base = self.0.rsplit_once('-').map_or(self.0.as_str(), |(b, _)| b);
        (base, self.sequence())
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ArtifactId {
    type Error = StoreError;

    fn try_from(s: String) -> StoreResult<Self> {
        validate_id("artifact", &s)?;
        Ok(ArtifactId(s))
    }
}

impl From<ArtifactId> for String {
    fn from(id: ArtifactId) -> Self {
        id.0
    }
}

/// Whether the stage response could be used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    Parsed { payload: Value },
    Malformed { reason: String },
}

/// A stage result about to be persisted. The store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArtifact {
    pub stage: Stage,
    pub raw: String,
    pub outcome: ArtifactOutcome,
    pub issues: Vec<ValidationIssue>,
}

impl NewArtifact {
    pub fn parsed(stage: Stage, raw: impl Into<String>, payload: Value) -> Self {
        Self {
            stage,
            raw: raw.into(),
            outcome: ArtifactOutcome::Parsed { payload },
            issues: Vec::new(),
        }
    }

    pub fn malformed(stage: Stage, raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stage,
            raw: raw.into(),
            outcome: ArtifactOutcome::Malformed {
                reason: reason.into(),
            },
            issues: Vec::new(),
        }
    }

    pub fn with_issues(mut self, issues: Vec<ValidationIssue>) -> Self {
        self.issues = issues;
        self
    }
}

/// Persisted record of one stage invocation. Never mutated after write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageArtifact {
    pub id: ArtifactId,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    /// SHA-256 of `raw`.
    pub digest: String,
    pub outcome: ArtifactOutcome,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ValidationIssue>,
    pub raw: String,
}

impl StageArtifact {
    /// Attach identity and digest to a new artifact.
    pub fn seal(new: NewArtifact, id: ArtifactId, created_at: DateTime<Utc>) -> Self {
        Self {
            digest: digest_hex(&new.raw),
            id,
            stage: new.stage,
            created_at,
            outcome: new.outcome,
            issues: new.issues,
            raw: new.raw,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self.outcome, ArtifactOutcome::Malformed { .. })
    }

    pub fn payload(&self) -> Option<&Value> {
        match &self.outcome {
            ArtifactOutcome::Parsed { payload } => Some(payload),
            ArtifactOutcome::Malformed { .. } => None,
        }
    }

    /// Decode the parsed payload into `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> StoreResult<T> {
        match &self.outcome {
            ArtifactOutcome::Parsed { payload } => Ok(serde_json::from_value(payload.clone())?),
            ArtifactOutcome::Malformed { reason } => Err(StoreError::Serialization(format!(
                "artifact {} is malformed: {reason}",
                self.id
            ))),
        }
    }

    /// Check the raw text against the recorded digest.
    pub fn verify(&self) -> StoreResult<()> {
        let actual = digest_hex(&self.raw);
        if actual == self.digest {
            Ok(())
        } else {
            Err(StoreError::DigestMismatch {
                id: self.id.to_string(),
                expected: self.digest.clone(),
                actual,
            })
        }
    }
}

/// Append-only store of stage artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist `artifact` durably and return its unique id.
    async fn put(&self, artifact: NewArtifact) -> StoreResult<ArtifactId>;

    /// Read an artifact back, verifying its digest.
    async fn get(&self, id: &ArtifactId) -> StoreResult<StageArtifact>;

    /// Ids for `stage` in creation order.
    async fn list(&self, stage: Stage) -> StoreResult<Vec<ArtifactId>>;
}

// ---------------------------------------------------------------------------
// Evaluations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EvaluationId(String);

impl EvaluationId {
    /// Fresh id: `eval_{YYYYmmdd_HHMMSS}_{8 hex}`.
    pub fn generate(created_at: DateTime<Utc>) -> Self {
        let entropy = Uuid::new_v4().simple().to_string();
        EvaluationId(format!(
            "eval_{}_{}",
            created_at.format("%Y%m%d_%H%M%S"),
            &entropy[..8]
        ))
    }

    pub fn parse(id: &str) -> StoreResult<Self> {
        validate_id("evaluation", id)?;
        Ok(EvaluationId(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EvaluationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EvaluationId {
    type Error = StoreError;

    fn try_from(s: String) -> StoreResult<Self> {
        validate_id("evaluation", &s)?;
        Ok(EvaluationId(s))
    }
}

impl From<EvaluationId> for String {
    fn from(id: EvaluationId) -> Self {
        id.0
    }
}

/// Output of the evaluation phase, stored so wireframe generation can resume
/// from it without re-running earlier stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub evaluation_id: EvaluationId,
    pub created_at: DateTime<Utc>,
    pub vision_analysis: VisionAnalysis,
    pub heuristic_evaluation: HeuristicEvaluation,
    pub feedback_report: FeedbackReport,
    /// Stage artifacts that produced this record, in stage order.
    #[serde(default)]
    pub artifacts: Vec<ArtifactId>,
}

impl EvaluationRecord {
    /// The feedback report as pretty JSON, as returned to HTTP clients.
    pub fn report_text(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(&self.feedback_report)?)
    }
}

/// Keyed store of evaluation records.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn save(&self, record: &EvaluationRecord) -> StoreResult<()>;

    /// Fails with `NotFound` when no record exists for `id`.
    async fn load(&self, id: &EvaluationId) -> StoreResult<EvaluationRecord>;
}
