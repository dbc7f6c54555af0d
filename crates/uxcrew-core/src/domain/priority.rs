use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Three-level ranking shared by violation severity and feedback priority.
///
/// Parsing is case-insensitive so that `"High"` from a model response is
/// accepted alongside `"high"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Severity of a heuristic violation.
pub type Severity = Priority;

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Marker used by the report formatter.
    pub fn marker(&self) -> &'static str {
        match self {
            Priority::High => "🔴 HIGH",
            Priority::Medium => "🟡 MEDIUM",
            Priority::Low => "🟢 LOW",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "critical" => Ok(Priority::High),
            "medium" | "moderate" => Ok(Priority::Medium),
            "low" | "minor" => Ok(Priority::Low),
            _ => Err(DomainError::UnknownPriority(s.to_string())),
        }
    }
}

impl TryFrom<String> for Priority {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
