//! Structured visual analysis produced by the vision stage.

use serde::{Deserialize, Serialize};

use super::validation::{Validate, ValidationIssue};

/// One UI component detected on the screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiComponent {
    /// Component kind (button, text_input, image, label, icon, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Visible text, if any.
    pub text: Option<String>,
    pub position: String,
    pub color: String,
    pub size: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorScheme {
    pub primary_colors: Vec<String>,
    pub background: String,
    pub text_colors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Typography {
    pub heading_sizes: String,
    pub body_text_size: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingAndDensity {
    /// tight / comfortable / spacious
    pub overall_density: String,
    pub element_spacing: String,
}

/// Stage 1 output. Read-only once produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionAnalysis {
    /// Screen classification (login, home, profile, list, ...).
    pub screen_type: String,
    /// Components in reading order.
    pub components: Vec<UiComponent>,
    pub layout_structure: String,
    pub color_scheme: ColorScheme,
    pub typography: Typography,
    pub spacing_and_density: SpacingAndDensity,
    pub accessibility_observations: Vec<String>,
    pub notable_patterns: Vec<String>,
}

impl Validate for VisionAnalysis {
    /// Every field is optional in the response schema.
    fn validate(&self) -> Vec<ValidationIssue> {
        Vec::new()
    }

    fn advisories(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.screen_type.trim().is_empty() {
            issues.push(ValidationIssue::new(
                "screen_type",
                "screen classification is missing",
            ));
        }
        if self.components.is_empty() {
            issues.push(ValidationIssue::new("components", "no components were detected"));
        }
        issues
    }
}
