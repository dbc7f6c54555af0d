//! Domain models for uxcrew.
//!
//! Canonical definitions for the artifacts threaded through the pipeline:
//! - `Screenshot`: the uploaded image, input to the vision stage only
//! - `VisionAnalysis`: structured description of the screen
//! - `HeuristicEvaluation`: violations and strengths against Nielsen's heuristics
//! - `FeedbackReport`: prioritized, actionable developer feedback
//! - `Wireframe`: regenerated markup reflecting the feedback
//!
//! `Stage` names the four steps that produce them.

pub mod error;
pub mod feedback;
pub mod heuristics;
pub mod priority;
pub mod screenshot;
pub mod stage;
pub mod validation;
pub mod vision;
pub mod wireframe;

// Re-export main types and errors
pub use error::{ConfigError, DomainError, GenerationError};
pub use feedback::{FeedbackItem, FeedbackReport, QuickWin, Summary};
pub use heuristics::{
    heuristic, Heuristic, HeuristicEvaluation, HeuristicViolation, Strength, NIELSEN_HEURISTICS,
};
pub use priority::{Priority, Severity};
pub use screenshot::{ImageFormat, Screenshot};
pub use stage::Stage;
pub use validation::{PolicyOutcome, Validate, ValidationIssue, ValidationPolicy};
pub use vision::{ColorScheme, SpacingAndDensity, Typography, UiComponent, VisionAnalysis};
pub use wireframe::{Wireframe, WIREFRAME_WIDTH_PX};
