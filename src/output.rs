//! Writing report artifacts to disk

use crate::report::{render_text_summary, AnalysisReport};
use crate::triage::TriageReport;
use crate::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const REPORT_FILE: &str = "contrast-analysis.json";
pub const SUMMARY_FILE: &str = "analysis-summary.json";
pub const PAGE_HTML_FILE: &str = "website-content.html";
pub const TRIAGE_FILE: &str = "analysis-results.json";
pub const RECOMMENDATIONS_FILE: &str = "recommendations.txt";

/// Number of issues carried into the summary artifact and console output
pub const TOP_ISSUES: usize = 5;

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    log::debug!("wrote {}", path.display());
    Ok(())
}

/// Write `contrast-analysis.json` and `analysis-summary.json` into `dir`.
///
/// Returns the paths written, report first.
pub fn write_report(
    dir: &Path,
    report: &AnalysisReport,
    url: &str,
    top: usize,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let report_path = dir.join(REPORT_FILE);
    let summary_path = dir.join(SUMMARY_FILE);
    write_json(&report_path, report)?;
    write_json(&summary_path, &report.summary(url, top))?;
    Ok(vec![report_path, summary_path])
}

/// Write the page markup, triage results and recommendations into `dir`.
pub fn write_triage(dir: &Path, html: &str, triage: &TriageReport) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let html_path = dir.join(PAGE_HTML_FILE);
    let results_path = dir.join(TRIAGE_FILE);
    let recs_path = dir.join(RECOMMENDATIONS_FILE);

    fs::write(&html_path, html)?;
    write_json(&results_path, triage)?;
    let mut recs = triage.recommendations.join("\n");
    recs.push('\n');
    fs::write(&recs_path, recs)?;

    Ok(vec![html_path, results_path, recs_path])
}

/// Console text for a finished analysis
pub fn console_summary(report: &AnalysisReport, top: usize) -> String {
    let mut out = render_text_summary(report, top);
    out.push_str(&format!("\nFingerprint: {}\n", report.fingerprint()));
    out
}
