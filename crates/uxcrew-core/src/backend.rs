//! Generation backend abstraction.
//!
//! A backend turns instructions plus attachments into free text. It makes no
//! promise about the shape of that text; callers run it through
//! [`crate::normalize`] before trusting it.

use std::fmt;

use async_trait::async_trait;

use crate::domain::{GenerationError, Screenshot};

/// One input attached to a generation request.
#[derive(Clone, PartialEq, Eq)]
pub enum Attachment {
    Image { mime_type: String, bytes: Vec<u8> },
}

impl Attachment {
    pub fn image(screenshot: &Screenshot) -> Self {
        Attachment::Image {
            mime_type: screenshot.format().mime_type().to_string(),
            bytes: screenshot.bytes().to_vec(),
        }
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attachment::Image { mime_type, bytes } => f
                .debug_struct("Image")
                .field("mime_type", mime_type)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

/// A single generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Backend model identifier, taken from the stage model table.
    pub model: String,
    pub instructions: String,
    pub attachments: Vec<Attachment>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            instructions: instructions.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Whether any binary attachment is present.
    pub fn has_binary(&self) -> bool {
        !self.attachments.is_empty()
    }
}

/// A text generation service.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Issue one request and return the raw response text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Short name used in log fields.
    fn name(&self) -> &str {
        "backend"
    }
}

#[async_trait]
impl<B: GenerationBackend + ?Sized> GenerationBackend for std::sync::Arc<B> {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        (**self).generate(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
