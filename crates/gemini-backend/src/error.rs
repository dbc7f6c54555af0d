//! Error types for gemini-backend

use thiserror::Error;
use uxcrew_core::GenerationError;

#[derive(Error, Debug)]
pub enum GeminiError {
    /// Request never completed (DNS, TLS, connect, read)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request exceeded the client timeout
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Non-success status other than quota exhaustion
    #[error("Gemini API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// HTTP 429 / RESOURCE_EXHAUSTED
    #[error("Gemini quota exhausted: {0}")]
    Quota(String),

    /// Prompt or candidate blocked by safety filters
    #[error("response blocked: {0}")]
    Blocked(String),

    /// Success status but no text in the first candidate
    #[error("Gemini returned no text")]
    EmptyResponse,

    /// Response body was not the expected JSON
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GeminiError {
    fn from(err: reqwest::Error) -> Self {
        GeminiError::Http(err.to_string())
    }
}

impl From<GeminiError> for GenerationError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::Http(msg) => GenerationError::Transport(msg),
            GeminiError::Timeout(secs) => GenerationError::Timeout(secs),
            GeminiError::Api { status, message } => GenerationError::Api { status, message },
            GeminiError::Quota(msg) => GenerationError::Quota(msg),
            GeminiError::Blocked(reason) => GenerationError::Api {
                status: 200,
                message: format!("response blocked: {reason}"),
            },
            GeminiError::EmptyResponse => GenerationError::EmptyResponse,
            GeminiError::Json(e) => GenerationError::Transport(format!("unreadable response: {e}")),
        }
    }
}
