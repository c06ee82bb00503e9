//! Analysis report types and their serialized forms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// A computed contrast ratio, or `unknown` when either colour could not be
/// resolved. Serialized as the ratio with two decimals, or `"unknown"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contrast {
    Ratio(f64),
    Unknown,
}

impl Contrast {
    pub fn ratio(&self) -> Option<f64> {
        match self {
            Contrast::Ratio(r) => Some(*r),
            Contrast::Unknown => None,
        }
    }

    /// Strictly below `required`. An unknown ratio never fails.
    pub fn fails(&self, required: f64) -> bool {
        matches!(self, Contrast::Ratio(r) if *r < required)
    }
}

impl From<Option<f64>> for Contrast {
    fn from(v: Option<f64>) -> Self {
        v.map(Contrast::Ratio).unwrap_or(Contrast::Unknown)
    }
}

impl std::fmt::Display for Contrast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Contrast::Ratio(r) => write!(f, "{:.2}", r),
            Contrast::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for Contrast {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Contrast {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse::<f64>().map(Contrast::Ratio).unwrap_or(Contrast::Unknown))
    }
}

/// Rounded layout rectangle reported for an element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl From<crate::dom::Rect> for BoundingBox {
    fn from(r: crate::dom::Rect) -> Self {
        Self {
            x: r.x.round() as i64,
            y: r.y.round() as i64,
            width: r.width.round() as i64,
            height: r.height.round() as i64,
        }
    }
}

/// One inspected leaf text element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSample {
    #[serde(rename = "element")]
    pub tag: String,
    /// Trimmed text, truncated with a `...` marker
    pub text: String,
    pub text_color: String,
    /// Effective background after walking transparent ancestors
    pub background_color: String,
    pub font_size: f64,
    pub font_weight: u32,
    #[serde(rename = "rect")]
    pub bounding_box: BoundingBox,
    pub classes: String,
}

/// A sample together with its contrast classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedElement {
    #[serde(flatten)]
    pub sample: ElementSample,
    pub contrast: Contrast,
    pub required: f64,
    pub is_large_text: bool,
}

impl AnalyzedElement {
    pub fn is_issue(&self) -> bool {
        self.contrast.fails(self.required)
    }
}

/// Elements recorded in `issues` have the same shape as analyzed elements
pub type ContrastIssue = AnalyzedElement;

/// Result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Every qualifying sample, regardless of the preview and issue caps
    pub total_elements: usize,
    pub analyzed_elements: Vec<AnalyzedElement>,
    pub issues: Vec<ContrastIssue>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Canonical<'a> {
    total_elements: usize,
    analyzed_elements: &'a [AnalyzedElement],
    issues: &'a [ContrastIssue],
}

impl AnalysisReport {
    /// SHA-256 over the report with the timestamp left out.
    pub fn fingerprint(&self) -> String {
        let canonical = Canonical {
            total_elements: self.total_elements,
            analyzed_elements: &self.analyzed_elements,
            issues: &self.issues,
        };
        // Serializing plain structs of strings and numbers cannot fail.
        let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }

    /// Condensed summary with the first `top` issues
    pub fn summary(&self, url: &str, top: usize) -> AnalysisSummary {
        AnalysisSummary {
            url: url.to_string(),
            timestamp: self.timestamp,
            accessibility: AccessibilitySummary {
                total_elements: self.total_elements,
                issues_found: self.issues.len(),
                top_issues: self.issues.iter().take(top).map(TopIssue::from).collect(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopIssue {
    pub text: String,
    pub contrast: Contrast,
    pub required: f64,
    pub element: String,
    pub classes: String,
}

impl From<&ContrastIssue> for TopIssue {
    fn from(issue: &ContrastIssue) -> Self {
        Self {
            text: issue.sample.text.clone(),
            contrast: issue.contrast,
            required: issue.required,
            element: issue.sample.tag.clone(),
            classes: issue.sample.classes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilitySummary {
    pub total_elements: usize,
    pub issues_found: usize,
    pub top_issues: Vec<TopIssue>,
}

/// Contents of `analysis-summary.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub accessibility: AccessibilitySummary,
}

/// Format a ratio requirement the short way (`3`, `4.5`)
fn fmt_required(r: f64) -> String {
    if r.fract() == 0.0 {
        format!("{:.0}", r)
    } else {
        format!("{}", r)
    }
}

/// Human-readable console summary listing the first `top` issues.
pub fn render_text_summary(report: &AnalysisReport, top: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Accessibility analysis complete:");
    let _ = writeln!(out, "   - Total elements analyzed: {}", report.total_elements);
    let _ = writeln!(out, "   - Contrast issues found: {}", report.issues.len());

    if !report.issues.is_empty() && top > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "Top contrast issues:");
        for (i, issue) in report.issues.iter().take(top).enumerate() {
            let s = &issue.sample;
            let _ = writeln!(
                out,
                "   {}. \"{}\" - Contrast: {}:1 (needs {}:1)",
                i + 1,
                s.text,
                issue.contrast,
                fmt_required(issue.required)
            );
            let _ = writeln!(out, "      Colors: {} on {}", s.text_color, s.background_color);
            let classes = if s.classes.is_empty() { "none" } else { s.classes.as_str() };
            let _ = writeln!(out, "      Classes: {}", classes);
        }
    }
    out
}
