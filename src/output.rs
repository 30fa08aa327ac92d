//! CLI output formatting.
//!
//! The run summary is what a user reads after `mdg` finishes; the detailed
//! per-task trail goes to the log. Output paths are shown relative to the
//! working directory when possible:
//!
//! ```text
//! a.md → html/a.html
//! b.md → html/b.html
//! FAILED c.md: Cannot open file docs/c.md: No such file or directory (os error 2)
//!
//! Converted 2 of 3 files (1 failed)
//! ```
//!
//! `format_*` functions are pure and return lines; `print_*` wrappers write
//! them to stdout.

use crate::config::BuildConfig;
use crate::pipeline::{RunReport, TaskStatus};
use std::path::Path;

fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "file" } else { "files" }
}

/// One line per task in manifest order, then a count line.
pub fn format_run_summary(report: &RunReport, config: &BuildConfig) -> Vec<String> {
    let mut lines = Vec::new();

    for outcome in &report.outcomes {
        match &outcome.status {
            TaskStatus::Written { output } => lines.push(format!(
                "{} → {}",
                outcome.source,
                display_path(output, &config.work_dir)
            )),
            TaskStatus::Failed(err) => lines.push(format!("FAILED {}: {}", outcome.source, err)),
            TaskStatus::Cancelled => lines.push(format!("SKIPPED {} (cancelled)", outcome.source)),
        }
    }

    let total = report.outcomes.len();
    let written = report.written_count();
    let mut tally = format!("Converted {} of {} {}", written, total, plural(total));
    let failed = report.failure_count();
    let cancelled = report.cancelled_count();
    match (failed, cancelled) {
        (0, 0) => {}
        (f, 0) => tally.push_str(&format!(" ({f} failed)")),
        (0, c) => tally.push_str(&format!(" ({c} cancelled)")),
        (f, c) => tally.push_str(&format!(" ({f} failed, {c} cancelled)")),
    }

    lines.push(String::new());
    lines.push(tally);
    lines
}

pub fn print_run_summary(report: &RunReport, config: &BuildConfig) {
    for line in format_run_summary(report, config) {
        println!("{}", line);
    }
}

/// Message shown when the source directory holds no markdown.
pub fn format_empty_manifest(source_dir: &Path, extensions: &[String]) -> String {
    format!(
        "No markdown files ({}) found in {}",
        extensions.join(", "),
        source_dir.display()
    )
}
