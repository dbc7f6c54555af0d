//! artifact-store: flat-file persistence for uxcrew
//!
//! Stage artifacts are append-only JSON envelopes holding the raw model
//! response, its SHA-256 digest and either the parsed payload or a
//! malformed marker. Every invocation attempt leaves exactly one of them.
//!
//! ## Key Components
//!
//! - `FsArtifactStore`: `{stage}_{timestamp}.json` files under the output directory
//! - `FsEvaluationStore`: `{evaluation_id}_evaluation.json` resume records
//! - `JobStore`: in-memory status of uploaded screenshots

mod error;
pub mod evaluation;
pub mod fakes;
pub mod fs;
pub mod jobs;
pub mod storage_traits;

pub use error::{StoreError, StoreResult};
pub use evaluation::FsEvaluationStore;
pub use fs::FsArtifactStore;
pub use jobs::{JobRecord, JobStatus, JobStore};
pub use storage_traits::{
    digest_hex, ArtifactId, ArtifactOutcome, ArtifactStore, EvaluationId, EvaluationRecord,
    EvaluationStore, NewArtifact, StageArtifact,
};
