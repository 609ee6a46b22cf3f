use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::paper::PaperReport;

pub const DEFAULT_REPORT_FILE: &str = "selected_papers.json";

/// Removes a surrounding markdown code fence (and its language tag) from model output.
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = match rest.find('\n') {
            Some(end) if rest[..end].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
                &rest[end + 1..]
            }
            _ => rest.strip_prefix("json").unwrap_or(rest),
        };
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

pub fn parse_report(text: &str) -> Result<PaperReport> {
    Ok(serde_json::from_str(strip_code_fences(text))?)
}

/// Overwrites `path` with the pretty-printed report.
pub fn write_report(path: &Path, report: &PaperReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    debug!(path = %path.display(), papers = report.papers.len(), "report written");
    Ok(())
}

pub fn read_report(path: &Path) -> Result<PaperReport> {
    let content = fs::read_to_string(path)?;
    parse_report(&content)
}
