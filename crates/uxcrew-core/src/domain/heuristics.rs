//! Heuristic evaluation against Nielsen's ten usability heuristics.

use serde::{Deserialize, Serialize};

use super::priority::Severity;
use super::validation::{Validate, ValidationIssue};

/// One entry of the heuristic catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Heuristic {
    pub id: u8,
    pub name: &'static str,
    pub description: &'static str,
}

/// Nielsen's ten usability heuristics, ids 1..=10.
pub const NIELSEN_HEURISTICS: [Heuristic; 10] = [
    Heuristic {
        id: 1,
        name: "Visibility of system status",
        description: "The design should always keep users informed about what is going on, through appropriate feedback within a reasonable amount of time.",
    },
    Heuristic {
        id: 2,
        name: "Match between system and the real world",
        description: "The design should speak the users' language, using words, phrases and concepts familiar to the user rather than internal jargon.",
    },
    Heuristic {
        id: 3,
        name: "User control and freedom",
        description: "Users often perform actions by mistake and need a clearly marked emergency exit to leave the unwanted action without an extended process.",
    },
    Heuristic {
        id: 4,
        name: "Consistency and standards",
        description: "Users should not have to wonder whether different words, situations or actions mean the same thing. Follow platform and industry conventions.",
    },
    Heuristic {
        id: 5,
        name: "Error prevention",
        description: "Good error messages are important, but the best designs carefully prevent problems from occurring in the first place.",
    },
    Heuristic {
        id: 6,
        name: "Recognition rather than recall",
        description: "Minimize the user's memory load by making elements, actions and options visible.",
    },
    Heuristic {
        id: 7,
        name: "Flexibility and efficiency of use",
        description: "Shortcuts, hidden from novice users, may speed up the interaction for the expert user.",
    },
    Heuristic {
        id: 8,
        name: "Aesthetic and minimalist design",
        description: "Interfaces should not contain information which is irrelevant or rarely needed.",
    },
    Heuristic {
        id: 9,
        name: "Help users recognize, diagnose, and recover from errors",
        description: "Error messages should be expressed in plain language, precisely indicate the problem, and constructively suggest a solution.",
    },
    Heuristic {
        id: 10,
        name: "Help and documentation",
        description: "It is best if the system does not need additional explanation, but documentation may be needed to help users complete their tasks.",
    },
];

/// Look up a heuristic by id.
pub fn heuristic(id: i64) -> Option<&'static Heuristic> {
    NIELSEN_HEURISTICS.iter().find(|h| i64::from(h.id) == id)
}

/// A detected mismatch against a named heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicViolation {
    /// As reported by the model; ids outside 1..=10 are a validation issue.
    pub heuristic_id: i64,
    #[serde(default)]
    pub heuristic_name: String,
    pub severity: Severity,
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub affected_components: Vec<String>,
    #[serde(default, rename = "improvement_suggestion")]
    pub suggested_fix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Strength {
    pub heuristic_name: String,
    pub observation: String,
}

/// Stage 2 output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeuristicEvaluation {
    #[serde(default)]
    pub violations: Vec<HeuristicViolation>,
    #[serde(default)]
    pub strengths: Vec<Strength>,
    /// Overall score, 0-10 with one decimal.
    pub overall_score: f64,
}

fn round_score(score: f64) -> f64 {
    (score.clamp(0.0, 10.0) * 10.0).round() / 10.0
}

impl Validate for HeuristicEvaluation {
    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if !self.overall_score.is_finite() || !(0.0..=10.0).contains(&self.overall_score) {
            issues.push(ValidationIssue::new(
                "overall_score",
                format!("{} is outside 0-10", self.overall_score),
            ));
        } else if round_score(self.overall_score) != self.overall_score {
            issues.push(ValidationIssue::new(
                "overall_score",
                format!("{} has more than one decimal", self.overall_score),
            ));
        }
        for (idx, violation) in self.violations.iter().enumerate() {
            if heuristic(violation.heuristic_id).is_none() {
                issues.push(ValidationIssue::new(
                    format!("violations[{idx}].heuristic_id"),
                    format!("{} is not a heuristic id (1-10)", violation.heuristic_id),
                ));
            }
        }
        issues
    }

    fn reconcile(&mut self) {
        self.overall_score = if self.overall_score.is_finite() {
            round_score(self.overall_score)
        } else {
            0.0
        };
        for violation in &mut self.violations {
            if violation.heuristic_name.trim().is_empty() {
                if let Some(h) = heuristic(violation.heuristic_id) {
                    violation.heuristic_name = h.name.to_string();
                }
            }
        }
    }
}
