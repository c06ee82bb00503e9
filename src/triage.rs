//! Heuristic triage for pages that cannot be rendered.
//!
//! Without computed styles there is no contrast ratio to compute. This module
//! parses the raw HTML and flags text elements whose class names or inline
//! styles look like common sources of low contrast (overlays, gradients,
//! transparency, light-on-light naming). The result is a reading list for a
//! human, not a WCAG conformance result, and is typed separately from
//! [`crate::AnalysisReport`] so the two are never mixed up.

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const TRIAGE_KIND: &str = "heuristic-triage";
pub const TRIAGE_CONFORMANCE: &str = "best effort, not WCAG-conformant";

/// Subtrees never inspected
const SKIPPED_TAGS: &[&str] = &["script", "style", "svg", "path", "noscript", "template"];

/// Class fragments that identify page sections worth calling out
const COMPONENT_HINTS: &[&str] = &[
    "hero",
    "demo",
    "architecture",
    "form",
    "terminal",
    "metrics",
    "timeline",
    "carousel",
];

const SUSPICIOUS_PATTERNS: &[&str] = &[
    r"transparent",
    r"overlay",
    r"gradient",
    r"dark.*text",
    r"light.*text",
    r"opacity",
    r"rgba.*0\.",
    r"background.*dark",
    r"text.*white",
    r"color.*white",
];

fn suspicious_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        SUSPICIOUS_PATTERNS
            .iter()
            .map(|p| Regex::new(&format!("(?i){}", p)).expect("static triage pattern"))
            .collect()
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    pub element: String,
    pub text: String,
    pub classes: String,
    pub inline_style: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PotentialIssue {
    pub element: String,
    pub text: String,
    pub classes: String,
    pub inline_style: String,
    pub reason: String,
}

/// Output of [`triage_html`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageReport {
    /// Always [`TRIAGE_KIND`]
    pub kind: String,
    /// Always [`TRIAGE_CONFORMANCE`]
    pub conformance: String,
    pub text_elements: Vec<TextElement>,
    pub potential_issues: Vec<PotentialIssue>,
    pub components: Vec<String>,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

fn cap(text: &str, limit: usize) -> String {
    crate::analyzer::truncate_text(text, limit)
}

fn or_none(value: &str) -> String {
    if value.is_empty() {
        "none".into()
    } else {
        value.to_string()
    }
}

/// Text under `el`, ignoring skipped subtrees, with whitespace collapsed
fn visible_text(el: ElementRef<'_>) -> String {
    fn walk(el: ElementRef<'_>, out: &mut Vec<String>) {
        for child in el.children() {
            if let Some(t) = child.value().as_text() {
                out.extend(t.split_whitespace().map(str::to_string));
            } else if let Some(c) = ElementRef::wrap(child) {
                if !SKIPPED_TAGS.contains(&c.value().name()) {
                    walk(c, out);
                }
            }
        }
    }
    let mut words = Vec::new();
    walk(el, &mut words);
    words.join(" ")
}

fn owns_text(el: ElementRef<'_>) -> bool {
    el.children()
        .filter_map(|c| c.value().as_text())
        .any(|t| !t.trim().is_empty())
}

fn suspicion(classes: &str, inline_style: &str) -> Option<String> {
    let haystack = format!("{} {}", classes, inline_style);
    if let Some(re) = suspicious_patterns().iter().find(|re| re.is_match(&haystack)) {
        let pattern = re.as_str().trim_start_matches("(?i)");
        return Some(format!("Suspicious styling pattern detected: /{}/", pattern));
    }
    if inline_style.contains("color") || inline_style.contains("background") {
        return Some("Inline style sets color or background".to_string());
    }
    None
}

/// Scan raw HTML for text elements with suspicious styling.
pub fn triage_html(html: &str) -> TriageReport {
    let document = Html::parse_document(html);
    let mut text_elements = Vec::new();
    let mut potential_issues = Vec::new();
    let mut components: Vec<String> = Vec::new();

    // Depth-first, children pushed in reverse so pops follow document order.
    let mut stack = vec![document.root_element()];
    while let Some(el) = stack.pop() {
        let tag = el.value().name().to_ascii_lowercase();
        if SKIPPED_TAGS.contains(&tag.as_str()) {
            continue;
        }
        let children: Vec<_> = el.children().filter_map(ElementRef::wrap).collect();
        stack.extend(children.into_iter().rev());

        let text = visible_text(el);
        if text.is_empty() {
            continue;
        }
        let classes = el.value().attr("class").unwrap_or("").to_string();
        let inline_style = el.value().attr("style").unwrap_or("").to_string();

        for class in classes.split_whitespace() {
            if COMPONENT_HINTS.iter().any(|h| class.contains(h))
                && !components.iter().any(|c| c == class)
            {
                components.push(class.to_string());
            }
        }

        if !owns_text(el) {
            continue;
        }

        if let Some(reason) = suspicion(&classes, &inline_style) {
            potential_issues.push(PotentialIssue {
                element: tag.clone(),
                text: cap(&text, 50),
                classes: or_none(&classes),
                inline_style: or_none(&inline_style),
                reason,
            });
        }

        text_elements.push(TextElement {
            element: tag,
            text: cap(&text, 100),
            classes,
            inline_style,
        });
    }

    log::info!(
        "triage found {} text elements, {} flagged",
        text_elements.len(),
        potential_issues.len()
    );

    let mut report = TriageReport {
        kind: TRIAGE_KIND.to_string(),
        conformance: TRIAGE_CONFORMANCE.to_string(),
        text_elements,
        potential_issues,
        components,
        recommendations: Vec::new(),
        timestamp: Utc::now(),
    };
    report.recommendations = recommendations(&report);
    report
}

/// Follow-up advice derived from a triage report
pub fn recommendations(report: &TriageReport) -> Vec<String> {
    let mut out = vec![
        "Run automated accessibility testing with tools like axe-core or Lighthouse".to_string(),
        "Test with actual users using screen readers".to_string(),
        "Verify color contrast ratios meet WCAG 2.1 AA standards \
         (4.5:1 for normal text, 3:1 for large text)"
            .to_string(),
    ];

    if !report.potential_issues.is_empty() {
        out.push(format!(
            "Review {} elements with potentially problematic styling",
            report.potential_issues.len()
        ));
        out.push(
            "Pay special attention to text over gradients, transparent backgrounds, \
             and overlay elements"
                .to_string(),
        );
    }

    if report.components.iter().any(|c| c == "hero") {
        out.push(
            "Hero section: Ensure text over background images/videos has sufficient contrast"
                .to_string(),
        );
    }
    if report.components.iter().any(|c| c.contains("terminal")) {
        out.push(
            "Terminal component: Verify terminal text colors meet accessibility standards"
                .to_string(),
        );
    }
    if report.components.iter().any(|c| c.contains("gradient")) {
        out.push(
            "Gradient backgrounds: Test text readability across the entire gradient".to_string(),
        );
    }

    out.push(
        "Consider adding a high contrast mode toggle for users with visual impairments"
            .to_string(),
    );
    out.push("Test the website with Windows High Contrast mode and forced colors".to_string());
    out.push("Use CSS custom properties for colors to enable easy theme switching".to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>T</title><style>.x{color:red}</style>
        <script>var hero = "text white";</script></head>
        <body>
          <section class="hero hero-overlay"><h1>Build faster</h1></section>
          <div class="terminal-window"><p class="muted">plain</p></div>
          <p style="color: #eee">Faint inline</p>
          <svg><text>ignored</text></svg>
          <footer>Copyright</footer>
        </body></html>"#;

    #[test]
    fn report_is_labelled_as_heuristic() {
        let r = triage_html(PAGE);
        assert_eq!(r.kind, TRIAGE_KIND);
        assert_eq!(r.conformance, TRIAGE_CONFORMANCE);
    }

    #[test]
    fn collects_text_owners_in_document_order() {
        let r = triage_html(PAGE);
        let tags: Vec<_> = r.text_elements.iter().map(|e| e.element.as_str()).collect();
        assert_eq!(tags, vec!["title", "h1", "p", "p", "footer"]);
        assert!(r.text_elements.iter().all(|e| !e.text.contains("ignored")));
    }

    #[test]
    fn flags_suspicious_classes_and_inline_colours() {
        let r = triage_html(PAGE);
        let flagged: Vec<_> = r.potential_issues.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(flagged, vec!["Faint inline"]);
        assert_eq!(r.potential_issues[0].classes, "none");
        assert!(suspicion("hero-overlay", "").is_some());
        assert!(suspicion("Light-Text", "").is_some());
        assert!(suspicion("card", "").is_none());
    }

    #[test]
    fn components_are_deduplicated_in_first_seen_order() {
        let r = triage_html(
            r#"<div class="demo a"><span class="demo">x</span><b class="timeline demo">y</b></div>"#,
        );
        assert_eq!(r.components, vec!["demo".to_string(), "timeline".to_string()]);
    }

    #[test]
    fn sections_count_as_components_without_owning_text() {
        let r = triage_html(PAGE);
        assert_eq!(r.components, vec!["hero", "hero-overlay", "terminal-window"]);
        assert!(r.recommendations.iter().any(|s| s.starts_with("Hero section")));
    }

    #[test]
    fn recommendations_mention_terminal_when_present() {
        let r = triage_html(r#"<div class="terminal-window">$ ls</div>"#);
        assert!(r.recommendations.iter().any(|s| s.starts_with("Terminal component")));
        assert!(!r.recommendations.iter().any(|s| s.starts_with("Hero section")));
    }
}
