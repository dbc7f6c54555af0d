//! uxcrew core library
//!
//! Domain model for the screenshot → feedback → wireframe pipeline, plus the
//! pieces every other crate shares: response normalization, the generation
//! backend trait, configuration, report rendering and tracing setup.

pub mod backend;
pub mod config;
pub mod domain;
pub mod fakes;
pub mod normalize;
pub mod obs;
pub mod reporting;
pub mod telemetry;

pub use backend::{Attachment, GenerationBackend, GenerationRequest};
pub use config::{ModelTable, PipelineConfig};
pub use domain::{
    heuristic, ColorScheme, ConfigError, DomainError, FeedbackItem, FeedbackReport,
    GenerationError, Heuristic, HeuristicEvaluation, HeuristicViolation, ImageFormat,
    PolicyOutcome, Priority, QuickWin, Screenshot, Severity, SpacingAndDensity, Stage, Strength,
    Summary, Typography, UiComponent, Validate, ValidationIssue, ValidationPolicy, VisionAnalysis,
    Wireframe, NIELSEN_HEURISTICS, WIREFRAME_WIDTH_PX,
};
pub use normalize::{
    decode_json, extract_fenced_block, fenced_blocks, normalize_json, normalize_markup,
    strip_fences, FencedBlock, Normalized, ResponseFormat,
};
pub use obs::{
    emit_artifact_written, emit_pipeline_finished, emit_pipeline_started, emit_stage_completed,
    emit_stage_failed, emit_stage_malformed, emit_stage_started, run_span,
};
pub use reporting::{
    feedback_report_file_name, render_feedback_report_md, write_feedback_report_md,
};
pub use telemetry::{init_tracing, LogSettings};

/// uxcrew version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
