use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::domain::{FeedbackReport, Priority};

const PLACEHOLDER: &str = "N/A";

fn or_na(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => PLACEHOLDER,
    }
}

/// File name for a markdown export generated at `generated_at`.
pub fn feedback_report_file_name(generated_at: DateTime<Utc>) -> String {
    format!("feedback_report_{}.md", generated_at.format("%Y%m%d_%H%M%S"))
}

/// Render a feedback report as a markdown document.
///
/// Counters are recomputed from the items; a disagreeing stated summary is
/// noted rather than echoed. Missing optional fields render as `N/A`.
pub fn render_feedback_report_md(report: &FeedbackReport, generated_at: DateTime<Utc>) -> String {
    let tally = report.tallied_summary();
    let mut out = String::new();

    out.push_str("# UX Feedback Report\n\n");
    let _ = writeln!(out, "Generated: {}\n", generated_at.format("%Y-%m-%d %H:%M:%S UTC"));

    out.push_str("## Summary\n\n");
    let _ = writeln!(out, "- Total issues: {}", tally.total_issues);
    for priority in Priority::ALL {
        let _ = writeln!(out, "- {}: {}", priority.marker(), tally.count(priority));
    }
    if !report.summary_is_consistent() {
        let stated = report.summary;
        let _ = writeln!(
            out,
            "\n> Stated summary (total {}, high {}, medium {}, low {}) did not match the items; counts above are recomputed.",
            stated.total_issues, stated.high, stated.medium, stated.low
        );
    }
    out.push('\n');

    out.push_str("## Feedback Items\n\n");
    let items = report.items_by_id();
    if items.is_empty() {
        let _ = writeln!(out, "{PLACEHOLDER}\n");
    }
    for item in items {
        let title = or_na(Some(item.title.as_str()));
        let _ = writeln!(out, "### {}. {}\n", item.id, title);
        let _ = writeln!(out, "**Priority:** {}\n", item.priority.marker());
        let _ = writeln!(out, "**Why it matters:** {}\n", or_na(item.rationale.as_deref()));
        out.push_str("**What to do:**\n");
        if item.steps.is_empty() {
            let _ = writeln!(out, "{PLACEHOLDER}");
        }
        for (n, step) in item.steps.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", n + 1, or_na(Some(step.as_str())));
        }
        let _ = writeln!(
            out,
            "\n**Wireframe changes:** {}\n",
            or_na(item.wireframe_changes.as_deref())
        );
    }

    out.push_str("## Quick Wins\n\n");
    if report.quick_wins.is_empty() {
        let _ = writeln!(out, "{PLACEHOLDER}");
    }
    for (n, win) in report.quick_wins.iter().enumerate() {
        let _ = writeln!(out, "{}. **{}**", n + 1, or_na(win.change.as_deref()));
        let _ = writeln!(out, "   - Impact: {}", or_na(win.impact.as_deref()));
        let _ = writeln!(out, "   - Effort: {}", or_na(win.effort.as_deref()));
    }
    out
}

/// Write the markdown rendering of `report` to `path`.
pub fn write_feedback_report_md(
    path: &Path,
    report: &FeedbackReport,
    generated_at: DateTime<Utc>,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
    }
    let md = render_feedback_report_md(report, generated_at);
    std::fs::write(path, md).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
