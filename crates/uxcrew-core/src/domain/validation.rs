//! Semantic validation of parsed stage payloads.
//!
//! A payload that parses is not necessarily consistent: the model may report a
//! summary that disagrees with its own items, or cite a heuristic that does
//! not exist. [`Validate`] surfaces those problems and [`ValidationPolicy`]
//! decides whether they are logged, repaired, or fatal for the stage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// A single consistency problem found in a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// JSON-ish path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Consistency checks for a stage payload.
pub trait Validate {
    /// Report every inconsistency without modifying the payload.
    fn validate(&self) -> Vec<ValidationIssue>;

    /// Quality notes that are recorded with the payload but never reject it,
    /// whatever the policy.
    fn advisories(&self) -> Vec<ValidationIssue> {
        Vec::new()
    }

    /// Recompute derived fields in place.
    ///
    /// The default does nothing; payloads with derivable fields override it.
    fn reconcile(&mut self) {}
}

/// What to do when a parsed payload fails validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Keep the payload untouched, log and record the issues.
    Warn,
    /// Repair derived fields, log and record the issues.
    #[default]
    Reconcile,
    /// Reject the payload and fail the stage.
    Enforce,
}

impl ValidationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationPolicy::Warn => "warn",
            ValidationPolicy::Reconcile => "reconcile",
            ValidationPolicy::Enforce => "enforce",
        }
    }
}

impl fmt::Display for ValidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(ValidationPolicy::Warn),
            "reconcile" => Ok(ValidationPolicy::Reconcile),
            "enforce" => Ok(ValidationPolicy::Enforce),
            _ => Err(ConfigError::Invalid {
                key: "validation policy".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Result of applying a [`ValidationPolicy`] to a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    /// The payload may be used. `issues` lists what was found before any repair.
    Accepted { issues: Vec<ValidationIssue> },
    /// The payload must not be used.
    Rejected { issues: Vec<ValidationIssue> },
}

impl ValidationPolicy {
    /// Validate `payload` and apply the policy, repairing it in place under
    /// [`ValidationPolicy::Reconcile`]. Advisories are appended to the
    /// reported issues but only [`Validate::validate`] findings can reject.
    pub fn apply<T: Validate>(&self, payload: &mut T) -> PolicyOutcome {
        let mut issues = payload.validate();
        let blocking = !issues.is_empty();
        issues.extend(payload.advisories());
        if !blocking {
            return PolicyOutcome::Accepted { issues };
        }
        match self {
            ValidationPolicy::Warn => PolicyOutcome::Accepted { issues },
            ValidationPolicy::Reconcile => {
                payload.reconcile();
                PolicyOutcome::Accepted { issues }
            }
            ValidationPolicy::Enforce => PolicyOutcome::Rejected { issues },
        }
    }
}
