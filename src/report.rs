//! CSV export of analysis results.
//!
//! One row per check, in service order, with the job-level fields repeated
//! on every row so the file opens directly in a spreadsheet without a join.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tracing::info;

use crate::api::{AnalysisResult, CheckStatus};

pub const CSV_HEADERS: [&str; 9] = [
    "Check Type",
    "Status",
    "Expected Value",
    "Actual Value",
    "Sources Compared",
    "Notes",
    "Job ID",
    "Overall Status",
    "Created At",
];

const SOURCES_SEPARATOR: &str = " vs ";

/// Render `result` as CSV text. Every field is double-quoted and rows are
/// joined with `\n`.
pub fn to_csv(result: &AnalysisResult) -> String {
    let created_at = format_timestamp(&result.created_at);

    let mut lines = Vec::with_capacity(result.checks.len() + 1);
    lines.push(quote_row(CSV_HEADERS.iter().copied()));
    for check in &result.checks {
        let status = check.status.as_str().to_uppercase();
        let sources = check.sources_compared.join(SOURCES_SEPARATOR);
        lines.push(quote_row([
            check.check_type.as_str(),
            status.as_str(),
            check.expected.as_str(),
            check.actual.as_str(),
            sources.as_str(),
            check.notes.as_deref().unwrap_or(""),
            result.job_id.as_str(),
            result.overall_status.as_str(),
            created_at.as_str(),
        ]));
    }
    lines.join("\n")
}

fn quote_row<'a>(cells: impl IntoIterator<Item = &'a str>) -> String {
    cells
        .into_iter()
        .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Reformat a service timestamp as `YYYY-MM-DD HH:MM:SS` in UTC.
///
/// Offsets are honoured; timestamps without one are taken as UTC and a bare
/// date as UTC midnight. Anything unparseable is returned unchanged.
pub fn format_timestamp(raw: &str) -> String {
    const OUT: &str = "%Y-%m-%d %H:%M:%S";

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc).format(OUT).to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return naive.and_utc().format(OUT).to_string();
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_time(NaiveTime::MIN).and_utc().format(OUT).to_string();
    }
    raw.to_string()
}

/// `analysis_results_{job_id}_{YYYY-MM-DD}.csv`
pub fn report_filename(job_id: &str, date: NaiveDate) -> String {
    format!("analysis_results_{job_id}_{}.csv", date.format("%Y-%m-%d"))
}

/// Write the CSV for `result` into `dir`, named for today's UTC date.
pub fn export_csv(result: &AnalysisResult, dir: &Path) -> std::io::Result<PathBuf> {
    export_csv_on(result, dir, Utc::now().date_naive())
}

pub fn export_csv_on(
    result: &AnalysisResult,
    dir: &Path,
    date: NaiveDate,
) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report_filename(&result.job_id, date));
    std::fs::write(&path, to_csv(result))?;
    info!(job_id = %result.job_id, path = %path.display(), rows = result.checks.len(), "report exported");
    Ok(path)
}

/// Per-status check counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub pass: usize,
    pub warning: usize,
    pub fail: usize,
}

impl CheckSummary {
    pub fn of(result: &AnalysisResult) -> Self {
        result
            .checks
            .iter()
            .fold(Self::default(), |mut summary, check| {
                match check.status {
                    CheckStatus::Pass => summary.pass += 1,
                    CheckStatus::Warning => summary.warning += 1,
                    CheckStatus::Fail => summary.fail += 1,
                }
                summary
            })
    }

    pub fn total(&self) -> usize {
        self.pass + self.warning + self.fail
    }
}
