use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use crate::normalize::ResponseFormat;

/// The four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Vision,
    Heuristics,
    Feedback,
    Wireframe,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Vision,
        Stage::Heuristics,
        Stage::Feedback,
        Stage::Wireframe,
    ];

    /// Short label used in logs, config keys and failure reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Vision => "vision",
            Stage::Heuristics => "heuristics",
            Stage::Feedback => "feedback",
            Stage::Wireframe => "wireframe",
        }
    }

    /// Name used as the artifact file prefix.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            Stage::Vision => "vision_analysis",
            Stage::Heuristics => "heuristic_evaluation",
            Stage::Feedback => "feedback_report",
            Stage::Wireframe => "wireframe",
        }
    }

    pub fn response_format(&self) -> ResponseFormat {
        match self {
            Stage::Wireframe => ResponseFormat::Html,
            _ => ResponseFormat::Json,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = DomainError;

    /// Accepts either the short label or the artifact name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == needle || stage.artifact_name() == needle)
            .ok_or_else(|| DomainError::UnknownStage(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_and_artifact_names() {
        assert_eq!("vision".parse::<Stage>().unwrap(), Stage::Vision);
        assert_eq!("feedback_report".parse::<Stage>().unwrap(), Stage::Feedback);
        assert_eq!("Wireframe".parse::<Stage>().unwrap(), Stage::Wireframe);
        assert!("layout".parse::<Stage>().is_err());
    }

    #[test]
    fn only_wireframe_is_markup() {
        for stage in Stage::ALL {
            let expected = if stage == Stage::Wireframe {
                ResponseFormat::Html
            } else {
                ResponseFormat::Json
            };
            assert_eq!(stage.response_format(), expected);
        }
    }
}
