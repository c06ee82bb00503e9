//! WCAG 2.1 AA contrast analysis over a rendered-document snapshot.
//!
//! The analyzer is a single pass over the snapshot in document order. Leaf
//! elements with visible text are sampled, their effective background is
//! resolved through transparent ancestors, and the contrast ratio is compared
//! against the AA minimum for the element's text size. Malformed values never
//! abort the run; they surface as an `unknown` contrast on that element.

use crate::color;
use crate::dom::{DomNode, DomSnapshot};
use crate::report::{AnalysisReport, AnalyzedElement, Contrast, ElementSample};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Tunables for one analysis run
///
/// The defaults reproduce WCAG 2.1 Level AA: 4.5:1 for normal text, 3:1 for
/// large text (18px, or 14px at weight 700 and above).
///
/// ```
/// let cfg = pagecontrast::AnalyzerConfig::default();
/// assert_eq!(cfg.preview_limit, 50);
/// assert_eq!(cfg.default_background, "rgb(255, 255, 255)");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Number of analyzed elements kept in the report preview
    pub preview_limit: usize,
    /// Number of failing elements kept in the report
    pub issue_limit: usize,
    /// Characters of element text kept before the `...` marker
    pub text_limit: usize,
    /// Background assumed when no ancestor has an opaque background
    pub default_background: String,
    pub normal_text_ratio: f64,
    pub large_text_ratio: f64,
    /// Font size (px) at which text is large regardless of weight
    pub large_text_px: f64,
    /// Font size (px) at which bold text is large
    pub bold_large_text_px: f64,
    /// Minimum numeric weight counted as bold
    pub bold_weight: u32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            preview_limit: 50,
            issue_limit: 20,
            text_limit: 50,
            default_background: "rgb(255, 255, 255)".to_string(),
            normal_text_ratio: 4.5,
            large_text_ratio: 3.0,
            large_text_px: 18.0,
            bold_large_text_px: 14.0,
            bold_weight: 700,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("normal_text_ratio", self.normal_text_ratio),
            ("large_text_ratio", self.large_text_ratio),
            ("large_text_px", self.large_text_px),
            ("bold_large_text_px", self.bold_large_text_px),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(Error::ConfigError(format!(
                    "{} must be a positive number, got {}",
                    name, v
                )));
            }
        }
        if color::relative_luminance(&self.default_background).is_none() {
            return Err(Error::ConfigError(format!(
                "default_background must be an rgb()/rgba() colour, got {:?}",
                self.default_background
            )));
        }
        if color::is_transparent(&self.default_background) {
            return Err(Error::ConfigError("default_background must not be transparent".into()));
        }
        Ok(())
    }
}

/// Leading numeric prefix of a computed value (`"16px"` -> 16). Anything
/// unparseable reads as 0.
pub fn parse_font_size(value: &str) -> f64 {
    let v = value.trim();
    let end = v
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(v.len());
    match v[..end].parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

/// Numeric font weight. `bold`/`bolder` normalize to 700 and `normal` to 400;
/// anything else unparseable reads as 0.
pub fn parse_font_weight(value: &str) -> u32 {
    let v = value.trim().to_ascii_lowercase();
    match v.as_str() {
        "bold" | "bolder" => 700,
        "normal" => 400,
        "lighter" => 100,
        _ => {
            let digits: String = v.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().unwrap_or(0)
        }
    }
}

/// Trim and cap text at `limit` characters, appending `...` when cut
pub fn truncate_text(text: &str, limit: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > limit {
        let mut out: String = trimmed.chars().take(limit).collect();
        out.push_str("...");
        out
    } else {
        trimmed.to_string()
    }
}

/// Classifies rendered text leaves against the contrast minimums
#[derive(Debug, Clone, Default)]
pub struct ContrastAnalyzer {
    config: AnalyzerConfig,
}

impl ContrastAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Whether text of this size and weight counts as large
    pub fn is_large_text(&self, font_size_px: f64, font_weight: u32) -> bool {
        font_size_px >= self.config.large_text_px
            || (font_size_px >= self.config.bold_large_text_px
                && font_weight >= self.config.bold_weight)
    }

    pub fn required_ratio(&self, large: bool) -> f64 {
        if large {
            self.config.large_text_ratio
        } else {
            self.config.normal_text_ratio
        }
    }

    /// Leaf element with non-blank text and a non-empty layout box
    fn qualifies(node: &DomNode) -> bool {
        node.child_element_count == 0 && !node.text.trim().is_empty() && node.rect.is_visible()
    }

    /// Background the element renders against: its own unless transparent,
    /// else the nearest non-transparent ancestor, else the configured default.
    pub fn effective_background(&self, snapshot: &DomSnapshot, idx: usize) -> String {
        let own = match snapshot.get(idx) {
            Some(node) => &node.style.background_color,
            None => return self.config.default_background.clone(),
        };
        if !color::is_transparent(own) {
            return own.clone();
        }
        snapshot
            .ancestors(idx)
            .map(|(_, n)| &n.style.background_color)
            .find(|bg| !color::is_transparent(bg))
            .cloned()
            .unwrap_or_else(|| self.config.default_background.clone())
    }

    fn inspect(&self, snapshot: &DomSnapshot, idx: usize, node: &DomNode) -> AnalyzedElement {
        let background = self.effective_background(snapshot, idx);
        let font_size = parse_font_size(&node.style.font_size);
        let font_weight = parse_font_weight(&node.style.font_weight);
        let large = self.is_large_text(font_size, font_weight);
        let contrast = Contrast::from(color::contrast_ratio(&node.style.color, &background));
        if contrast == Contrast::Unknown {
            debug!(
                "contrast unknown for <{}> (color {:?} on {:?})",
                node.tag, node.style.color, background
            );
        }

        AnalyzedElement {
            sample: ElementSample {
                tag: node.tag.clone(),
                text: truncate_text(&node.text, self.config.text_limit),
                text_color: node.style.color.clone(),
                background_color: background,
                font_size,
                font_weight,
                bounding_box: node.rect.into(),
                classes: node.classes.clone(),
            },
            contrast,
            required: self.required_ratio(large),
            is_large_text: large,
        }
    }

    /// Analyze a snapshot, stamping the report with the current time
    pub fn analyze(&self, snapshot: &DomSnapshot) -> AnalysisReport {
        self.analyze_at(snapshot, Utc::now())
    }

    /// Analyze a snapshot with an explicit timestamp.
    ///
    /// `analyzed_elements` and `issues` keep document order and are truncated
    /// to the configured caps; `total_elements` counts every sample.
    pub fn analyze_at(&self, snapshot: &DomSnapshot, timestamp: DateTime<Utc>) -> AnalysisReport {
        let mut total = 0usize;
        let mut failing = 0usize;
        let mut analyzed = Vec::new();
        let mut issues = Vec::new();

        for (idx, node) in snapshot.nodes().iter().enumerate() {
            if !Self::qualifies(node) {
                continue;
            }
            total += 1;
            let element = self.inspect(snapshot, idx, node);
            if element.is_issue() {
                failing += 1;
                if issues.len() < self.config.issue_limit {
                    issues.push(element.clone());
                }
            }
            if analyzed.len() < self.config.preview_limit {
                analyzed.push(element);
            }
        }

        info!(
            "analyzed {} text elements of {} nodes, {} below the contrast minimum",
            total,
            snapshot.len(),
            failing
        );

        AnalysisReport {
            total_elements: total,
            analyzed_elements: analyzed,
            issues,
            timestamp,
        }
    }

    /// Analyze a raw collector payload.
    ///
    /// Fails with [`Error::InvalidInput`] when the payload is absent or not an
    /// element collection, so callers can tell garbage apart from a page with
    /// no visible text.
    pub fn analyze_json(&self, payload: &serde_json::Value) -> Result<AnalysisReport> {
        let snapshot = DomSnapshot::from_value(payload)?;
        Ok(self.analyze(&snapshot))
    }
}
