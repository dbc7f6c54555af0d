//! Prioritized developer feedback produced by the feedback stage.

use serde::{Deserialize, Serialize};

use super::priority::Priority;
use super::validation::{Validate, ValidationIssue};

/// One actionable feedback item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackItem {
    /// Stable per report; assigned in emission order starting at 1.
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub title: String,
    pub priority: Priority,
    #[serde(default, rename = "why_it_matters")]
    pub rationale: Option<String>,
    #[serde(default, rename = "what_to_do")]
    pub steps: Vec<String>,
    #[serde(default)]
    pub wireframe_changes: Option<String>,
}

/// A low-effort, high-impact improvement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickWin {
    pub change: Option<String>,
    pub impact: Option<String>,
    /// Free text, e.g. "5 minutes".
    pub effort: Option<String>,
}

/// Issue counters. Must equal the tally of the report's items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Summary {
    pub total_issues: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl Summary {
    /// Count `items` by priority.
    pub fn tally(items: &[FeedbackItem]) -> Self {
        let count = |p: Priority| items.iter().filter(|i| i.priority == p).count();
        Self {
            total_issues: items.len(),
            high: count(Priority::High),
            medium: count(Priority::Medium),
            low: count(Priority::Low),
        }
    }

    pub fn count(&self, priority: Priority) -> usize {
        match priority {
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }
}

/// Stage 3 output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackReport {
    pub feedback_items: Vec<FeedbackItem>,
    pub quick_wins: Vec<QuickWin>,
    pub summary: Summary,
}

impl FeedbackReport {
    /// The summary recomputed from the items, regardless of what was stated.
    pub fn tallied_summary(&self) -> Summary {
        Summary::tally(&self.feedback_items)
    }

    /// Whether the stated summary agrees with the items.
    pub fn summary_is_consistent(&self) -> bool {
        self.summary == self.tallied_summary()
    }

    /// Items ordered by id ascending.
    pub fn items_by_id(&self) -> Vec<&FeedbackItem> {
        let mut items: Vec<&FeedbackItem> = self.feedback_items.iter().collect();
        items.sort_by_key(|i| i.id);
        items
    }

    fn ids_are_sequential(&self) -> bool {
        self.feedback_items
            .iter()
            .enumerate()
            .all(|(idx, item)| item.id as usize == idx + 1)
    }
}

impl Validate for FeedbackReport {
    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let tally = self.tallied_summary();

        if self.summary.total_issues != tally.total_issues {
            issues.push(ValidationIssue::new(
                "summary.total_issues",
                format!(
                    "stated {} but report has {} feedback items",
                    self.summary.total_issues, tally.total_issues
                ),
            ));
        }
        for priority in Priority::ALL {
            let stated = self.summary.count(priority);
            let actual = tally.count(priority);
            if stated != actual {
                issues.push(ValidationIssue::new(
                    format!("summary.{priority}"),
                    format!("stated {stated} but {actual} items have priority {priority}"),
                ));
            }
        }
        if !self.ids_are_sequential() {
            issues.push(ValidationIssue::new(
                "feedback_items.id",
                "ids are not 1..n in emission order",
            ));
        }
        issues
    }

    fn reconcile(&mut self) {
        if !self.ids_are_sequential() {
            for (idx, item) in self.feedback_items.iter_mut().enumerate() {
                item.id = (idx + 1) as u32;
            }
        }
        self.summary = self.tallied_summary();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(id: u32, priority: Priority) -> FeedbackItem {
        FeedbackItem {
            id,
            title: format!("Item {id}"),
            priority,
            rationale: None,
            steps: vec![],
            wireframe_changes: None,
        }
    }

    #[test]
    fn parses_wire_field_names() {
        let report: FeedbackReport = serde_json::from_value(json!({
            "feedback_items": [{
                "id": 1,
                "title": "Add loading state to sign in",
                "priority": "high",
                "why_it_matters": "Users tap twice",
                "what_to_do": ["Disable button", "Show spinner"],
                "wireframe_changes": "Spinner inside button"
            }],
            "quick_wins": [{"change": "Raise contrast", "impact": "Readability", "effort": "5 minutes"}],
            "summary": {"total_issues": 1, "high": 1, "medium": 0, "low": 0}
        }))
        .unwrap();

        let first = &report.feedback_items[0];
        assert_eq!(first.rationale.as_deref(), Some("Users tap twice"));
        assert_eq!(first.steps.len(), 2);
        assert_eq!(report.quick_wins[0].effort.as_deref(), Some("5 minutes"));
        assert!(report.summary_is_consistent());
        assert!(report.validate().is_empty());
    }

    #[test]
    fn summary_mismatch_is_flagged_not_trusted() {
        let report = FeedbackReport {
            feedback_items: vec![item(1, Priority::High), item(2, Priority::Low)],
            quick_wins: vec![],
            summary: Summary {
                total_issues: 5,
                high: 2,
                medium: 2,
                low: 1,
            },
        };
        let fields: Vec<String> = report.validate().into_iter().map(|i| i.field).collect();
        assert_eq!(
            fields,
            vec!["summary.total_issues", "summary.high", "summary.medium"]
        );
        assert_eq!(
            report.tallied_summary(),
            Summary {
                total_issues: 2,
                high: 1,
                medium: 0,
                low: 1
            }
        );
    }

    #[test]
    fn reconcile_renumbers_and_recounts() {
        let mut report = FeedbackReport {
            feedback_items: vec![item(4, Priority::Medium), item(4, Priority::Medium)],
            quick_wins: vec![],
            summary: Summary::default(),
        };
        report.reconcile();
        let ids: Vec<u32> = report.feedback_items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(report.summary.medium, 2);
        assert!(report.validate().is_empty());
    }

    #[test]
    fn items_by_id_sorts_ascending() {
        let report = FeedbackReport {
            feedback_items: vec![item(2, Priority::Low), item(1, Priority::High)],
            ..Default::default()
        };
        let ids: Vec<u32> = report.items_by_id().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
