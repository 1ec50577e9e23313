//! Markdown rendering of a [`Comparison`].

use chrono::{DateTime, Local};
use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::compare::{Comparison, CoverageStatus, SetCoverage};
use crate::error::{EvalError, Result};

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "**{}**", heading);
    for item in items {
        let _ = writeln!(out, "- {}", item);
    }
    out.push('\n');
}

fn push_set_section(out: &mut String, title: &str, noun: &str, coverage: &SetCoverage) {
    let status = CoverageStatus::from_percentage(coverage.coverage_percentage);
    let _ = writeln!(out, "## {}\n", title);
    let _ = writeln!(
        out,
        "**Status:** {} {:.2}% Coverage\n",
        status.symbol(),
        coverage.coverage_percentage
    );
    out.push_str("| Metric | Count |\n|--------|-------|\n");
    let _ = writeln!(out, "| Actual {} | {} |", noun, coverage.total_actual);
    let _ = writeln!(out, "| Predicted {} | {} |", noun, coverage.total_predicted);
    let _ = writeln!(out, "| Matched | {} |\n", coverage.matched.len());
    push_list(out, &format!("✅ Matched {}:", noun), &coverage.matched);
    let missing = format!("❌ Missing {} (in Actual but not Predicted):", noun);
    push_list(out, &missing, &coverage.missing);
    push_list(out, &format!("➕ Extra {} (in Predicted but not Actual):", noun), &coverage.extra);
}

/// Render the full report. `generated_at` is printed in the header.
pub fn render_markdown(comparison: &Comparison, generated_at: DateTime<Local>) -> String {
    let mut out = String::new();
    let hours = &comparison.hours;

    out.push_str("# Estimation Comparison Report\n\n");
    let _ = writeln!(out, "**Generated:** {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "**Fuzzy Match Threshold:** {}\n", comparison.threshold);
    out.push_str("---\n\n");

    out.push_str("## 1. Total Hours Comparison\n\n");
    let _ = writeln!(out, "**Status:** {} {}\n", hours.band().symbol(), hours.status);
    out.push_str("| Metric | Value |\n|--------|-------|\n");
    let _ = writeln!(out, "| Actual Hours | {} |", hours.actual_hours);
    let _ = writeln!(out, "| Predicted Hours | {} |", hours.predicted_hours);
    let _ = writeln!(
        out,
        "| Difference | {:+} ({:+.2}%) |\n",
        hours.difference, hours.difference_percentage
    );

    push_set_section(&mut out, "2. Platform Coverage", "Platforms", &comparison.platforms);
    push_set_section(&mut out, "3. User Role Coverage", "User Roles", &comparison.user_roles);

    let epics = &comparison.epics;
    let status = CoverageStatus::from_percentage(epics.coverage_percentage);
    out.push_str("## 4. Epic Coverage\n\n");
    let _ = writeln!(
        out,
        "**Status:** {} {:.2}% Coverage\n",
        status.symbol(),
        epics.coverage_percentage
    );
    out.push_str("| Metric | Count |\n|--------|-------|\n");
    let _ = writeln!(out, "| Actual Epics | {} |", epics.total_actual);
    let _ = writeln!(out, "| Predicted Epics | {} |", epics.total_predicted);
    let _ = writeln!(out, "| Matched (Total) | {} |", epics.matches.len());
    let _ = writeln!(out, "| Matched (Exact) | {} |", epics.exact_count());
    let _ = writeln!(out, "| Matched (Fuzzy) | {} |", epics.fuzzy_count());
    let _ = writeln!(out, "| Missing | {} |", epics.missing.len());
    let _ = writeln!(out, "| Extra | {} |\n", epics.extra.len());

    if !epics.matches.is_empty() {
        out.push_str("**✅ Matched Epics:**\n\n");
        out.push_str("| Actual Epic | Predicted Epic | Match Type | Similarity |\n");
        out.push_str("|-------------|----------------|------------|------------|\n");
        for m in &epics.matches {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {:.2} |",
                m.actual.name, m.predicted.name, m.match_type, m.similarity
            );
        }
        out.push('\n');
    }
    let missing: Vec<String> = epics
        .missing
        .iter()
        .map(|e| if e.is_mandatory { format!("{} [MANDATORY]", e.name) } else { e.name.clone() })
        .collect();
    push_list(&mut out, "❌ Missing Epics (in Actual but not Predicted):", &missing);
    let extra: Vec<String> = epics.extra.iter().map(|e| e.name.clone()).collect();
    push_list(&mut out, "➕ Extra Epics (in Predicted but not Actual):", &extra);

    let tasks = &comparison.tasks;
    let status = CoverageStatus::from_percentage(tasks.overall_task_coverage);
    out.push_str("## 5. Task Coverage & Granularity\n\n");
    let _ = writeln!(
        out,
        "**Status:** {} {:.2}% Overall Coverage\n",
        status.symbol(),
        tasks.overall_task_coverage
    );
    out.push_str("| Metric | Value |\n|--------|-------|\n");
    let _ = writeln!(out, "| Avg Actual Tasks per Epic | {:.2} |", tasks.avg_actual_tasks);
    let _ = writeln!(out, "| Avg Predicted Tasks per Epic | {:.2} |", tasks.avg_predicted_tasks);
    let _ = writeln!(
        out,
        "| Granularity Difference | {:+.2}% |\n",
        tasks.granularity_difference_percentage
    );

    if !tasks.epic_task_details.is_empty() {
        out.push_str("**Epic-by-Epic Task Analysis:**\n\n");
        out.push_str("| Epic Name | Actual Tasks | Predicted Tasks | Coverage | Granularity |\n");
        out.push_str("|-----------|--------------|-----------------|----------|-------------|\n");
        for detail in &tasks.epic_task_details {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {:.2}% | {} {} |",
                detail.epic_name,
                detail.actual_task_count,
                detail.predicted_task_count,
                detail.coverage_percentage,
                detail.granularity.symbol(),
                detail.granularity
            );
        }
        out.push('\n');
    }

    let breakdown = &comparison.by_user_type;
    if !breakdown.by_user_type.is_empty() {
        out.push_str("## Epic Coverage by User Type\n\n");
        let _ = writeln!(out, "**Overall:** {:.2}%\n", breakdown.overall_coverage);
        out.push_str("| User Type | Actual | Predicted | Matched | Coverage |\n");
        out.push_str("|-----------|--------|-----------|---------|----------|\n");
        for (user_type, coverage) in &breakdown.by_user_type {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {:.2}% |",
                user_type,
                coverage.total_actual,
                coverage.total_predicted,
                coverage.matched,
                coverage.coverage_percentage
            );
        }
        out.push('\n');
    }

    out.push_str("---\n\n## Overall Summary\n\n");
    let overall = comparison.overall_score();
    let _ = writeln!(
        out,
        "**Overall Coverage Score:** {} {:.2}%\n",
        CoverageStatus::from_percentage(overall).symbol(),
        overall
    );
    out.push_str("| Dimension | Coverage |\n|-----------|----------|\n");
    let platforms = comparison.platforms.coverage_percentage;
    let user_roles = comparison.user_roles.coverage_percentage;
    let _ = writeln!(out, "| Platform Coverage | {:.2}% |", platforms);
    let _ = writeln!(out, "| User Role Coverage | {:.2}% |", user_roles);
    let _ = writeln!(out, "| Epic Coverage | {:.2}% |", epics.coverage_percentage);
    let _ = writeln!(out, "| Task Coverage | {:.2}% |\n", tasks.overall_task_coverage);

    out.push_str("### Key Findings\n\n");
    let off = hours.difference_percentage.abs();
    let finding = match hours.band() {
        CoverageStatus::Good => "Hours estimation is highly accurate",
        CoverageStatus::Moderate => "Hours estimation is moderately accurate",
        CoverageStatus::Poor => "Hours estimation needs improvement",
    };
    let _ = writeln!(out, "{} **{}** ({:.2}% difference)\n", hours.band().symbol(), finding, off);
    let (best, worst) = comparison.best_and_worst();
    let _ = writeln!(out, "✅ **Best Coverage:** {} ({:.2}%)", best.0, best.1);
    let _ = writeln!(out, "❌ **Needs Improvement:** {} ({:.2}%)", worst.0, worst.1);

    out
}

/// Write `<output>.md` and return its path.
pub fn save_markdown(content: &str, output: &Path) -> Result<PathBuf> {
    let mut path = output.as_os_str().to_owned();
    path.push(".md");
    let path = PathBuf::from(path);
    std::fs::write(&path, content)
        .map_err(|e| EvalError::Report(format!("{}: {}", path.display(), e)))?;
    Ok(path)
}
