//! Terminal rendering and GitHub Actions step outputs.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use console::style;

use crate::error::{Error, Result};
use crate::registry::{RegistryEntry, RegistrySummary, NOT_SET};
use crate::validator::{ReportStatus, ValidationReport};

/// Human-readable validation report.
pub fn validation_report(report: &ValidationReport) -> String {
    let mut out = String::new();
    let file = report.file.as_deref().unwrap_or("<input>");
    let _ = writeln!(out, "Validating {}", style(file).bold());

    for error in &report.errors {
        let _ = write!(out, "  {} {}", style("✗").red(), error.message);
        if !error.path.is_empty() {
            let _ = write!(out, " {}", style(format!("(at: {})", error.path)).dim());
        }
        out.push('\n');
    }
    for warning in &report.warnings {
        let _ = write!(out, "  {} {}", style("!").yellow(), warning.message);
        if !warning.path.is_empty() {
            let _ = write!(out, " {}", style(format!("(at: {})", warning.path)).dim());
        }
        out.push('\n');
    }

    let verdict = match report.status {
        ReportStatus::Passed => style("PASSED".to_string()).green().bold(),
        ReportStatus::PassedWithWarnings => style("PASSED with warnings".to_string()).yellow().bold(),
        ReportStatus::Failed => style("FAILED".to_string()).red().bold(),
    };
    let _ = writeln!(
        out,
        "{} ({} errors, {} warnings, {} nodes)",
        verdict, report.summary.errors, report.summary.warnings, report.metadata.node_count
    );
    out
}

fn ellipsize(text: &str, width: usize) -> String {
    if text.chars().count() < width {
        text.to_string()
    } else {
        let kept: String = text.chars().take(width.saturating_sub(4)).collect();
        format!("{}...", kept)
    }
}

pub fn registry_table(entries: &[RegistryEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", style("Workflow ID Registry").bold());
    let _ = writeln!(out, "{}", "=".repeat(80));
    let _ = writeln!(out, "{:<30} | {:<15} | File Path", "Name", "n8n ID");
    let _ = writeln!(out, "{}", "-".repeat(80));

    for entry in entries {
        let _ = writeln!(
            out,
            "{:<30} | {:<15} | {}",
            ellipsize(&entry.name, 30),
            entry.n8n_id.as_deref().unwrap_or(NOT_SET),
            entry.file.display()
        );
    }

    let summary = RegistrySummary::of(entries);
    let _ = writeln!(out, "\nSummary:");
    let _ = writeln!(out, "  Total workflows: {}", summary.total);
    let _ = writeln!(out, "  With n8n ID: {}", summary.with_id);
    let _ = writeln!(out, "  Missing ID: {}", summary.missing_id);
    out
}

pub fn registry_matches(term: &str, matches: &[RegistryEntry]) -> String {
    if matches.is_empty() {
        return format!("{} No workflow found matching: {}\n", style("✗").red(), term);
    }

    let mut out = format!("Found {} matching workflow(s):\n\n", matches.len());
    for entry in matches {
        let _ = writeln!(out, "{}", "─".repeat(60));
        let _ = writeln!(out, "File: {}", entry.file.display());
        let _ = writeln!(out, "Name: {}", entry.name);
        let _ = writeln!(out, "n8n ID: {}", entry.n8n_id.as_deref().unwrap_or(NOT_SET));
        let _ = writeln!(out, "GitHub PR: {}", entry.github_pr.as_deref().unwrap_or("N/A"));
        let _ = writeln!(
            out,
            "Last Updated: {}",
            entry.last_updated.as_deref().unwrap_or("Unknown")
        );
        if let Some(url) = &entry.deployed_url {
            let _ = writeln!(out, "Deployed URL: {}", url);
        }
        if let Some(description) = &entry.description {
            let _ = writeln!(out, "Description: {}", description);
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════
// GitHub Actions outputs
// ═══════════════════════════════════════════════════════════════════════════

/// Append a step output to the `GITHUB_OUTPUT` file, or print the legacy
/// `::set-output` command when no file is configured.
pub fn set_github_output(output_file: Option<&Path>, name: &str, value: &str) -> Result<()> {
    let Some(path) = output_file else {
        println!("::set-output name={}::{}", name, escape_command_value(value));
        return Ok(());
    };

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    file.write_all(format_output_entry(name, value).as_bytes())
        .map_err(|e| Error::io(path, e))
}

/// One entry in `GITHUB_OUTPUT` syntax; multi-line values use a heredoc
/// delimiter.
pub fn format_output_entry(name: &str, value: &str) -> String {
    if value.contains('\n') {
        let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4().simple());
        format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
    } else {
        format!("{name}={value}\n")
    }
}

fn escape_command_value(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
