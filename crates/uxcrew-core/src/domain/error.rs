//! Domain-level error taxonomy for uxcrew.

/// Errors produced by a generation backend call.
///
/// Every variant means the stage never received a usable response, so no
/// artifact is written for it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("backend unreachable: {0}")]
    Transport(String),

    #[error("backend returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("backend quota exhausted: {0}")]
    Quota(String),

    #[error("generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("backend returned an empty response")]
    EmptyResponse,

    #[error("backend credential missing: {0}")]
    MissingCredential(String),
}

/// Configuration errors. Fatal at startup, before any stage runs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(String),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

/// Errors raised by domain constructors.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("unsupported image format (first bytes: {0})")]
    UnsupportedImage(String),

    #[error("empty image payload")]
    EmptyImage,

    #[error("unknown priority level: {0}")]
    UnknownPriority(String),

    #[error("unknown stage: {0}")]
    UnknownStage(String),
}
