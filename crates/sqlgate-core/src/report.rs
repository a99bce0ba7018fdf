use std::fmt::Write;

use crate::matcher::MatchReport;

/// Format styles supported in default reporter implementations.
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Produce a report string from a `MatchReport` using the desired format.
pub fn render_report(report: &MatchReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_human(report),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

fn render_human(report: &MatchReport) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "Risk Score: {} ({})", report.score, report.label)?;
    writeln!(out, "Scanned Length: {} bytes", report.scanned_len)?;
    writeln!(out)?;

    if report.matches.is_empty() {
        writeln!(out, "No signatures matched.")?;
    } else {
        writeln!(out, "Matches:")?;
        for hit in &report.matches {
            writeln!(
                out,
                "  - {pattern:?} [{weight}] @ {start}..{end}",
                pattern = hit.pattern,
                weight = hit.weight,
                start = hit.span.0,
                end = hit.span.1,
            )?;
        }
    }

    Ok(out)
}
