//! uxcrew-pipeline: staged screenshot evaluation
//!
//! Drives the four generation stages in order:
//! - Vision: screenshot → `VisionAnalysis`
//! - Heuristics: analysis → `HeuristicEvaluation`
//! - Feedback: analysis + evaluation → `FeedbackReport`
//! - Wireframe: analysis + feedback → `Wireframe`
//!
//! Each stage sends exactly one request and leaves exactly one artifact,
//! unless the backend call itself fails.

pub mod error;
pub mod pipeline;
pub mod runner;
pub mod stage;

pub use error::{PipelineFailure, StageError};
pub use pipeline::{
    FullRun, NoopObserver, Pipeline, PipelineState, ProgressObserver, WireframeOutput,
};
pub use runner::{StageExecutor, StageOutput};
pub use stage::{compose_instructions, StageConfig, StageInput, StagePayload};
