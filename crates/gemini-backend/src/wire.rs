//! `generateContent` request and response bodies.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use uxcrew_core::{Attachment, GenerationRequest};

use crate::error::GeminiError;

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(alias = "inlineData")]
        inline_data: InlineData,
    },
    /// Part kinds this backend never sends and ignores on receipt.
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InlineData {
    #[serde(alias = "mimeType")]
    pub mime_type: String,
    /// Base64, standard alphabet with padding.
    pub data: String,
}

impl From<&GenerationRequest> for GenerateContentRequest {
    fn from(request: &GenerationRequest) -> Self {
        let mut parts = vec![Part::Text {
            text: request.instructions.clone(),
        }];
        for attachment in &request.attachments {
            parts.push(match attachment {
                Attachment::Image { mime_type, bytes } => Part::InlineData {
                    inline_data: InlineData {
                        mime_type: mime_type.clone(),
                        data: STANDARD.encode(bytes),
                    },
                },
            });
        }
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn into_text(self) -> Result<String, GeminiError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GeminiError::Blocked(reason));
        }
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(GeminiError::EmptyResponse);
        };
        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text),
                Part::InlineData { .. } | Part::Other(_) => None,
            })
            .collect();
        if !text.trim().is_empty() {
            return Ok(text);
        }
        match candidate.finish_reason.as_deref() {
            Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => {
                Err(GeminiError::Blocked(candidate.finish_reason.unwrap_or_default()))
            }
            _ => Err(GeminiError::EmptyResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_puts_instructions_first_and_encodes_images() {
        let request = GenerationRequest::new("gemini-2.5-flash", "Describe this screen")
            .with_attachment(Attachment::Image {
                mime_type: "image/png".into(),
                bytes: vec![1, 2, 3],
            });
        let body = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();
        assert_eq!(
            body,
            json!({"contents": [{"role": "user", "parts": [
                {"text": "Describe this screen"},
                {"inline_data": {"mime_type": "image/png", "data": "AQID"}}
            ]}]})
        );
    }

    #[test]
    fn response_text_is_concatenated() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "```json\n"}, {"text": "{}\n```"}]}, "finishReason": "STOP"}]
        }))
        .unwrap();
        assert_eq!(resp.into_text().unwrap(), "```json\n{}\n```");
    }

    #[test]
    fn blocked_and_empty_responses() {
        let blocked: GenerateContentResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap();
        assert!(matches!(blocked.into_text(), Err(GeminiError::Blocked(r)) if r == "SAFETY"));

        let empty: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "MAX_TOKENS"}]})).unwrap();
        assert!(matches!(empty.into_text(), Err(GeminiError::EmptyResponse)));
    }
}
