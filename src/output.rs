//! Output rendering for audit results.
//!
//! Supports `human` (default) and `json` outputs. The human form prints the
//! view information, directives, nesting and audit-note tables; the JSON
//! form serializes the report as-is, plus a summary for batch runs.

use crate::models::{AnalysisResult, BatchReport, DirectiveKind, ViewReport};
use crate::utils::{display_path, use_colors};
use owo_colors::OwoColorize;
use serde_json::Value as JsonVal;
use std::fmt::Write as _;
use std::path::Path;

/// Print a single view report in the requested format.
pub fn print_report(report: &ViewReport, output: &str, root: &Path) {
    match output {
        "json" => print_json(&compose_report_json(report)),
        _ => print!("{}", render_report(report, root, use_colors(output))),
    }
}

/// Print every report of a batch run followed by a summary line.
pub fn print_batch(batch: &BatchReport, output: &str, root: &Path) {
    match output {
        "json" => print_json(&compose_batch_json(batch)),
        _ => {
            let color = use_colors(output);
            for report in &batch.reports {
                print!("{}", render_report(report, root, color));
                println!();
            }
            for name in &batch.skipped {
                if color {
                    println!("{} {}", "skipped:".yellow().bold(), name);
                } else {
                    println!("skipped: {}", name);
                }
            }
            let summary = format!(
                "Summary: views={} skipped={} warnings={}",
                batch.summary.views, batch.summary.skipped, batch.summary.warnings
            );
            if color {
                println!("{}", summary.bold());
            } else {
                println!("{}", summary);
            }
        }
    }
}

fn print_json(value: &JsonVal) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => tracing::error!("Failed to serialize report: {}", e),
    }
}

/// Render the four tables of one view.
pub fn render_report(report: &ViewReport, root: &Path, color: bool) -> String {
    let mut out = String::new();
    let title = format!("{} ({})", report.view, display_path(&report.path, root));
    let _ = writeln!(out, "{}", heading(&title, color));
    out.push_str(&render_result(&report.result, color));
    out
}

pub fn render_result(res: &AnalysisResult, color: bool) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", heading("View Information", color));
    let width = res.metrics.iter().map(|m| m.label.len()).max().unwrap_or(0);
    for m in &res.metrics {
        let _ = writeln!(out, "  {:<width$}  {}", m.label, m.value);
    }

    out.push('\n');
    let _ = writeln!(out, "{}", heading("Directives Information", color));
    let width = res
        .stats
        .iter()
        .map(|s| s.name.len())
        .chain(["Directive".len()])
        .max()
        .unwrap_or(0);
    let _ = writeln!(out, "  {:<width$}  {:>10}  Type", "Directive", "Repetition");
    for s in &res.stats {
        let kind = match (s.kind, color) {
            (DirectiveKind::BuiltIn, true) => s.kind.as_str().blue().to_string(),
            (DirectiveKind::Custom, true) => s.kind.as_str().yellow().to_string(),
            (_, false) => s.kind.as_str().to_string(),
        };
        let _ = writeln!(out, "  {:<width$}  {:>10}  {}", s.name, s.count, kind);
    }

    out.push('\n');
    let _ = writeln!(out, "{}", heading("Directives Nesting Levels", color));
    for n in &res.nesting {
        let name = if color {
            n.name.blue().to_string()
        } else {
            n.name.clone()
        };
        let _ = writeln!(out, "  {}{}", " |---".repeat(n.level), name);
    }

    if !res.warnings.is_empty() {
        out.push('\n');
        let _ = writeln!(out, "{}", heading("Audit Notes", color));
        for w in &res.warnings {
            let code = format!("{}:", w.code);
            if color {
                let _ = writeln!(out, "  {} {}", code.yellow(), w.message);
            } else {
                let _ = writeln!(out, "  {} {}", code, w.message);
            }
        }
    }
    out
}

fn heading(text: &str, color: bool) -> String {
    if color {
        text.bold().to_string()
    } else {
        format!("== {} ==", text)
    }
}

/// Compose single-report JSON object (pure) for testing/snapshot purposes.
pub fn compose_report_json(report: &ViewReport) -> JsonVal {
    serde_json::to_value(report).unwrap_or(JsonVal::Null)
}

/// Compose batch JSON object (pure) for testing/snapshot purposes.
pub fn compose_batch_json(batch: &BatchReport) -> JsonVal {
    serde_json::to_value(batch).unwrap_or(JsonVal::Null)
}
