//! Gemini REST client
//!
//! Talks to `POST {base_url}/v1beta/models/{model}:generateContent` with the
//! API key in the `x-goog-api-key` header.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use uxcrew_core::{ConfigError, GenerationBackend, GenerationError, GenerationRequest};

use crate::error::GeminiError;
use crate::wire::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const BASE_URL_VAR: &str = "GEMINI_BASE_URL";

/// Upper bound on one HTTP exchange. The pipeline applies its own, usually
/// shorter, per-stage timeout on top.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Gemini configuration
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        GeminiConfig {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Read `GEMINI_API_KEY` (required) and `GEMINI_BASE_URL` (optional).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::Missing(API_KEY_VAR.to_string()))?;
        let mut config = GeminiConfig::new(api_key);
        if let Some(url) = lookup(BASE_URL_VAR).filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        Ok(config)
    }
}

/// Gemini client implementing [`GenerationBackend`]
pub struct GeminiClient {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GeminiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("uxcrew-gemini-backend/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(GeminiClient {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    /// Send one `generateContent` call and return the response text.
    #[instrument(skip(self, request), fields(model = %request.model, attachments = request.attachments.len()))]
    pub async fn generate_content(&self, request: &GenerationRequest) -> Result<String, GeminiError> {
        let body = GenerateContentRequest::from(request);
        let response = self
            .http_client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeminiError::Timeout(REQUEST_TIMEOUT.as_secs())
                } else {
                    GeminiError::from(e)
                }
            })?;

        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), bytes = text.len(), "Gemini response received");

        if !status.is_success() {
            let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => (envelope.error.message, envelope.error.status),
                Err(_) => (text.chars().take(500).collect(), None),
            };
            warn!(status = status.as_u16(), message = %message, "Gemini request failed");
            if status.as_u16() == 429 || api_status.as_deref() == Some("RESOURCE_EXHAUSTED") {
                return Err(GeminiError::Quota(message));
            }
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)?;
        parsed.into_text()
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        Ok(self.generate_content(request).await?)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
