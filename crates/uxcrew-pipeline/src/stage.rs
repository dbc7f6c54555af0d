//! Stage definitions: instruction templates, inputs and payload types.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use uxcrew_core::{
    decode_json, normalize_markup, FeedbackReport, HeuristicEvaluation, Normalized,
    PipelineConfig, Screenshot, Stage, Validate, ValidationPolicy, VisionAnalysis, Wireframe,
    NIELSEN_HEURISTICS, WIREFRAME_WIDTH_PX,
};

use crate::error::StageError;

const VISION_TEMPLATE: &str = r#"You are a mobile UI analyst. Study the attached screenshot and describe what is on screen.

Return ONLY valid JSON with exactly this structure:
{
  "screen_type": "login/home/profile/list/settings/etc",
  "components": [
    {
      "type": "button/text_input/image/label/icon/etc",
      "text": "visible text, or null",
      "position": "top/middle/bottom/etc",
      "color": "color description",
      "size": "small/medium/large"
    }
  ],
  "layout_structure": "overall layout description",
  "color_scheme": {
    "primary_colors": ["main colors"],
    "background": "background color",
    "text_colors": ["text colors"]
  },
  "typography": {
    "heading_sizes": "heading size description",
    "body_text_size": "body size description"
  },
  "spacing_and_density": {
    "overall_density": "tight/comfortable/spacious",
    "element_spacing": "spacing description"
  },
  "accessibility_observations": ["accessibility issues"],
  "notable_patterns": ["UI patterns in use"]
}

List components in reading order, top to bottom."#;

const HEURISTICS_TEMPLATE: &str = r#"You are a UX evaluation expert. Evaluate the mobile UI described below against Nielsen's 10 usability heuristics.

## UI ANALYSIS:
{vision_analysis}

## HEURISTICS:
{heuristics}

## OUTPUT FORMAT:
Return ONLY valid JSON:
{
  "violations": [
    {
      "heuristic_id": 1,
      "heuristic_name": "Visibility of system status",
      "severity": "high/medium/low",
      "issue": "what is wrong",
      "affected_components": ["component references"],
      "improvement_suggestion": "how to fix it"
    }
  ],
  "strengths": [
    {
      "heuristic_name": "heuristic name",
      "observation": "what works well"
    }
  ],
  "overall_score": 7.5
}

heuristic_id must be one of the ids listed above. overall_score is 0-10 with one decimal."#;

const FEEDBACK_TEMPLATE: &str = r#"Turn the UX violations below into actionable feedback for developers.

## VISION ANALYSIS:
{vision_analysis}

## HEURISTIC EVALUATION:
{heuristic_evaluation}

## OUTPUT FORMAT:
Return ONLY valid JSON:
{
  "feedback_items": [
    {
      "id": 1,
      "title": "action-oriented title",
      "priority": "high/medium/low",
      "why_it_matters": "impact on users",
      "what_to_do": ["step 1", "step 2"],
      "wireframe_changes": "visual changes needed"
    }
  ],
  "quick_wins": [
    {
      "change": "easy fix",
      "impact": "expected impact",
      "effort": "5 minutes"
    }
  ],
  "summary": {
    "total_issues": 1,
    "high": 1,
    "medium": 0,
    "low": 0
  }
}

Number feedback items from 1 in order. summary.total_issues must equal the number of feedback items and the per-priority counts must match the items."#;

const WIREFRAME_TEMPLATE: &str = r#"Create an improved mobile UI wireframe in HTML and CSS.

## ORIGINAL DESIGN:
{vision_analysis}

## IMPROVEMENTS TO IMPLEMENT:
{feedback_report}

## REQUIREMENTS:
1. A complete, self-contained HTML document
2. Mobile-first layout at {width}px width with a viewport meta tag
3. Every feedback item implemented
4. Clean, modern styling with consistent spacing and typography

Return ONLY the HTML between ```html and ```."#;

/// Instruction template for `stage`. `{name}` marks an input placeholder.
pub fn template(stage: Stage) -> &'static str {
    match stage {
        Stage::Vision => VISION_TEMPLATE,
        Stage::Heuristics => HEURISTICS_TEMPLATE,
        Stage::Feedback => FEEDBACK_TEMPLATE,
        Stage::Wireframe => WIREFRAME_TEMPLATE,
    }
}

/// Names of the structured inputs each stage embeds, in order.
pub fn input_names(stage: Stage) -> &'static [&'static str] {
    match stage {
        Stage::Vision => &[],
        Stage::Heuristics => &["vision_analysis"],
        Stage::Feedback => &["vision_analysis", "heuristic_evaluation"],
        Stage::Wireframe => &["vision_analysis", "feedback_report"],
    }
}

/// One input to a stage.
#[derive(Debug, Clone)]
pub enum StageInput<'a> {
    /// Sent as a binary attachment, never embedded in text.
    Screenshot(&'a Screenshot),
    /// A prior stage's payload in canonical (pretty JSON) text form.
    Json { name: &'static str, text: String },
}

impl<'a> StageInput<'a> {
    pub fn json<T: Serialize>(name: &'static str, value: &T) -> Result<Self, StageError> {
        Ok(StageInput::Json {
            name,
            text: serde_json::to_string_pretty(value)?,
        })
    }
}

fn heuristic_catalogue() -> String {
    NIELSEN_HEURISTICS
        .iter()
        .map(|h| format!("{}. {}: {}", h.id, h.name, h.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replace `{name}` placeholders in one pass. Substituted text is never
/// rescanned, so payloads containing braces are embedded verbatim.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;
    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let hit = values.iter().find(|(name, _)| {
            tail.strip_prefix('{')
                .and_then(|t| t.strip_prefix(*name))
                .is_some_and(|t| t.starts_with('}'))
        });
        match hit {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 2..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Compose the full instructions for `stage` from its template and inputs.
///
/// Fails if a required input is missing.
pub fn compose_instructions(stage: Stage, inputs: &[StageInput<'_>]) -> Result<String, StageError> {
    let mut values: Vec<(&str, &str)> = Vec::new();
    for required in input_names(stage) {
        let text = inputs
            .iter()
            .find_map(|input| match input {
                StageInput::Json { name, text } if name == required => Some(text.as_str()),
                _ => None,
            })
            .ok_or_else(|| StageError::MissingInput {
                stage,
                input: required,
            })?;
        values.push((required, text));
    }

    let catalogue = heuristic_catalogue();
    let width = WIREFRAME_WIDTH_PX.to_string();
    match stage {
        Stage::Heuristics => values.push(("heuristics", catalogue.as_str())),
        Stage::Wireframe => values.push(("width", width.as_str())),
        _ => {}
    }
    Ok(render(template(stage), &values))
}

/// Per-invocation stage settings.
#[derive(Debug, Clone, PartialEq)]
pub struct StageConfig {
    pub stage: Stage,
    /// Backend model identifier.
    pub model: String,
    /// `None` waits for the backend indefinitely.
    pub timeout: Option<Duration>,
    pub policy: ValidationPolicy,
}

impl StageConfig {
    pub fn from_pipeline(stage: Stage, config: &PipelineConfig) -> Self {
        Self {
            stage,
            model: config.models.get(stage).to_string(),
            timeout: config.stage_timeout,
            policy: config.validation,
        }
    }
}

/// A typed stage output.
pub trait StagePayload: Validate + Serialize + DeserializeOwned + Send + Sync + 'static {
    const STAGE: Stage;

    /// Turn a raw response into a payload or a malformed marker.
    fn normalize(raw: &str) -> Normalized<Self> {
        decode_json(raw)
    }
}

impl StagePayload for VisionAnalysis {
    const STAGE: Stage = Stage::Vision;
}

impl StagePayload for HeuristicEvaluation {
    const STAGE: Stage = Stage::Heuristics;
}

impl StagePayload for FeedbackReport {
    const STAGE: Stage = Stage::Feedback;
}

impl StagePayload for Wireframe {
    const STAGE: Stage = Stage::Wireframe;

    fn normalize(raw: &str) -> Normalized<Self> {
        normalize_markup(raw).map(Wireframe::new)
    }
}
