//! Model response normalization.
//!
//! Generation backends return free text that is expected, but not
//! guaranteed, to hold a single JSON document or HTML page, often wrapped in a
//! Markdown code fence. Everything here is total: malformed input yields
//! [`Normalized::Malformed`] carrying the trimmed original text, never a panic
//! or an error. Whether malformed output is fatal is the caller's decision.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Code fence marker.
pub const FENCE: &str = "```";

/// Outcome of normalizing one model response.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized<T> {
    /// The response held a well-formed payload.
    Valid(T),
    /// The response could not be validated. `raw` is the trimmed original text.
    Malformed { raw: String, reason: String },
}

impl<T> Normalized<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Normalized::Valid(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Normalized<U> {
        match self {
            Normalized::Valid(v) => Normalized::Valid(f(v)),
            Normalized::Malformed { raw, reason } => Normalized::Malformed { raw, reason },
        }
    }

    pub fn valid(self) -> Option<T> {
        match self {
            Normalized::Valid(v) => Some(v),
            Normalized::Malformed { .. } => None,
        }
    }
}

/// Expected shape of a stage's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Html,
}

impl ResponseFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ResponseFormat::Json => "json",
            ResponseFormat::Html => "html",
        }
    }
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.')
}

/// Length in bytes of a fence label at the start of `rest`, or 0 when the
/// leading word is payload rather than a label.
fn label_len(rest: &str) -> usize {
    let len: usize = rest
        .chars()
        .take_while(|c| is_label_char(*c))
        .map(char::len_utf8)
        .sum();
    if len == 0 {
        return 0;
    }
    match rest[len..].chars().next() {
        None => len,
        Some(c) if c.is_whitespace() || matches!(c, '{' | '[' | '<' | '"') => len,
        Some(_) => 0,
    }
}

/// Strip a leading (labeled or bare) fence and a trailing fence, whichever
/// are present, and trim the result.
///
/// Partial fences are tolerated; unfenced text is returned trimmed.
pub fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix(FENCE) {
        text = &rest[label_len(rest)..];
    }
    let trimmed_end = text.trim_end();
    if let Some(rest) = trimmed_end.strip_suffix(FENCE) {
        text = rest;
    }
    text.trim()
}

/// A complete fenced block: its label (possibly empty) and trimmed body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FencedBlock<'a> {
    pub label: &'a str,
    pub body: &'a str,
}

/// Every complete fenced block in `text`, in order. An opening fence with no
/// closing fence ends the scan.
pub fn fenced_blocks(text: &str) -> Vec<FencedBlock<'_>> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        let label_end = label_len(after_open);
        let body = &after_open[label_end..];
        let Some(close) = body.find(FENCE) else {
            break;
        };
        blocks.push(FencedBlock {
            label: &after_open[..label_end],
            body: body[..close].trim(),
        });
        rest = &body[close + FENCE.len()..];
    }
    blocks
}

/// Find the first complete fenced block anywhere in `text` and return its
/// trimmed body. Returns `None` when no closing fence follows an opening one.
pub fn extract_fenced_block(text: &str) -> Option<&str> {
    fenced_blocks(text).first().map(|block| block.body)
}

/// Normalize a response expected to hold one JSON document.
pub fn normalize_json(raw: &str) -> Normalized<Value> {
    let trimmed = raw.trim();
    let body = strip_fences(trimmed);
    let first_error = match serde_json::from_str::<Value>(body) {
        Ok(value) => return Normalized::Valid(value),
        Err(e) => e,
    };

    // Prose around a fenced block: try the block itself.
    if let Some(block) = extract_fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(block) {
            return Normalized::Valid(value);
        }
    }

    Normalized::Malformed {
        raw: trimmed.to_string(),
        reason: if body.is_empty() {
            "empty response".to_string()
        } else {
            format!("invalid JSON: {first_error}")
        },
    }
}

/// Normalize a JSON response and decode it into `T`.
///
/// Well-formed JSON that does not match `T`'s schema is also `Malformed`.
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Normalized<T> {
    match normalize_json(raw) {
        Normalized::Valid(value) => match serde_json::from_value::<T>(value) {
            Ok(decoded) => Normalized::Valid(decoded),
            Err(e) => Normalized::Malformed {
                raw: raw.trim().to_string(),
                reason: format!("schema mismatch: {e}"),
            },
        },
        Normalized::Malformed { raw, reason } => Normalized::Malformed { raw, reason },
    }
}

fn looks_like_markup(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    ["<html", "<!doctype", "<body", "<div"]
        .iter()
        .any(|tag| lower.contains(tag))
}

/// Pick the block holding the document: the first one labelled `html`, else
/// the first whose body looks like markup.
fn markup_block(text: &str) -> Option<&str> {
    let blocks = fenced_blocks(text);
    blocks
        .iter()
        .find(|block| block.label.eq_ignore_ascii_case("html"))
        .or_else(|| blocks.iter().find(|block| looks_like_markup(block.body)))
        .map(|block| block.body)
}

/// Normalize a response expected to hold an HTML document.
///
/// A fenced block anywhere in the response wins over the surrounding prose.
pub fn normalize_markup(raw: &str) -> Normalized<String> {
    let trimmed = raw.trim();
    let body = markup_block(trimmed).unwrap_or_else(|| strip_fences(trimmed));
    if looks_like_markup(body) {
        Normalized::Valid(body.to_string())
    } else {
        Normalized::Malformed {
            raw: trimmed.to_string(),
            reason: if body.is_empty() {
                "empty response".to_string()
            } else {
                "no HTML document found".to_string()
            },
        }
    }
}
