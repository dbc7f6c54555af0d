use serde::{Deserialize, Serialize};

use super::validation::{Validate, ValidationIssue};

/// Reference viewport width for generated wireframes, in CSS pixels.
pub const WIREFRAME_WIDTH_PX: u32 = 375;

/// Stage 4 output: a rendered markup mockup. Opaque beyond basic shape checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wireframe {
    pub html: String,
}

impl Wireframe {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.html
    }
}

impl Validate for Wireframe {
    /// Any markup the normalizer accepted is usable.
    fn validate(&self) -> Vec<ValidationIssue> {
        Vec::new()
    }

    fn advisories(&self) -> Vec<ValidationIssue> {
        let lower = self.html.to_ascii_lowercase();
        let mut issues = Vec::new();
        if !lower.contains("<html") {
            issues.push(ValidationIssue::new("html", "not a complete HTML document"));
        }
        if !lower.contains("viewport") && !lower.contains(&format!("{WIREFRAME_WIDTH_PX}px")) {
            issues.push(ValidationIssue::new(
                "html",
                format!("no mobile viewport or {WIREFRAME_WIDTH_PX}px width declared"),
            ));
        }
        issues
    }
}
