//! pagecontrast
//!
//! WCAG 2.1 contrast analysis for rendered web pages. An [`Engine`] loads a
//! page and captures a [`DomSnapshot`] (every element with its computed
//! colours, font metrics and layout rectangle); the [`ContrastAnalyzer`]
//! turns that snapshot into an [`AnalysisReport`] of leaf text elements and
//! the ones falling short of the AA contrast thresholds.
//!
//! # Backends
//!
//! - **Markup** (default): pure Rust. Fetches HTML, applies inline and linked
//!   stylesheets through a small cascade and lays out blocks. No JavaScript.
//! - **CDP** (`cdp` feature): drives headless Chrome and reads real computed
//!   styles and bounding boxes.
//!
//! Pages that cannot be rendered at all can still be looked at with
//! [`triage::triage_html`], a heuristic scan of the raw markup.
//!
//! # Example
//!
//! ```no_run
//! use pagecontrast::{ContrastAnalyzer, Engine, EngineConfig, Viewport};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig {
//!     viewport: Viewport { width: 1280, height: 720 },
//!     timeout_ms: 30000,
//!     ..Default::default()
//! };
//!
//! let mut engine = pagecontrast::new_engine(config)?;
//! engine.load_url("http://localhost:3000")?;
//! let report = ContrastAnalyzer::default().analyze(&engine.snapshot()?);
//! println!("{} issues in {} elements", report.issues.len(), report.total_elements);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::Path;

pub mod error;
pub use error::{Error, Result};

pub mod analyzer;
pub mod color;
pub mod dom;
pub mod output;
pub mod report;
pub mod triage;

#[cfg(feature = "markup")]
pub mod markup;

#[cfg(feature = "cdp")]
pub mod cdp;

pub use analyzer::{AnalyzerConfig, ContrastAnalyzer};
pub use dom::{ComputedStyle, DomNode, DomSnapshot, Rect};
pub use report::{
    AnalysisReport, AnalysisSummary, AnalyzedElement, Contrast, ContrastIssue, ElementSample,
};
pub use triage::TriageReport;

/// Configuration for page loading
///
/// Defaults match a desktop capture: a 1920x1080 viewport and a 30 second
/// load timeout.
///
/// # Examples
///
/// ```
/// let cfg = pagecontrast::EngineConfig::default();
/// assert_eq!(cfg.viewport.width, 1920);
/// assert!(cfg.fetch_stylesheets);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// User agent string to send with requests
    pub user_agent: String,
    /// Viewport dimensions
    pub viewport: Viewport,
    /// Timeout for page loads in milliseconds
    pub timeout_ms: u64,
    /// Extra wait after load before capturing, in milliseconds
    pub settle_ms: u64,
    /// Custom HTTP headers
    pub headers: HashMap<String, String>,
    /// Whether linked stylesheets are fetched (markup backend)
    pub fetch_stylesheets: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_agent: format!(
                "Mozilla/5.0 (X11; Linux x86_64) pagecontrast/{}",
                env!("CARGO_PKG_VERSION")
            ),
            viewport: Viewport::default(),
            timeout_ms: 30000,
            settle_ms: 500,
            headers: HashMap::new(),
            fetch_stylesheets: true,
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// A backend able to load a page and report its rendered elements
pub trait Engine {
    /// Create a new engine instance with the given configuration
    fn new(config: EngineConfig) -> Result<Self>
    where
        Self: Sized;

    /// Load a URL and wait for the page to be ready
    fn load_url(&mut self, url: &str) -> Result<()>;

    /// Load markup directly; relative links resolve against `base_url`
    fn load_html(&mut self, html: &str, base_url: Option<&str>) -> Result<()>;

    /// Load a local HTML file, resolving its relative links against the
    /// file's own `file://` URL
    fn load_file(&mut self, path: &Path) -> Result<()> {
        let html = std::fs::read_to_string(path)?;
        let canonical = path.canonicalize()?;
        let base = url::Url::from_file_path(&canonical).map_err(|_| {
            Error::LoadError(format!("{} has no file URL", canonical.display()))
        })?;
        self.load_html(&html, Some(base.as_str()))
    }

    /// Capture every element of the current page in document order
    fn snapshot(&self) -> Result<DomSnapshot>;

    /// Serialized markup of the current page
    fn page_html(&self) -> Result<String>;

    /// Close the engine and clean up resources
    fn close(self) -> Result<()>;
}

/// Create a new engine instance with the default backend
///
/// Prefers the markup backend (no browser needed); falls back to CDP when
/// only the `cdp` feature is enabled.
#[cfg(feature = "markup")]
pub fn new_engine(config: EngineConfig) -> Result<impl Engine> {
    markup::MarkupEngine::new(config)
}

#[cfg(all(not(feature = "markup"), feature = "cdp"))]
pub fn new_engine(config: EngineConfig) -> Result<impl Engine> {
    cdp::CdpEngine::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.viewport, Viewport { width: 1920, height: 1080 });
        assert_eq!(config.timeout_ms, 30000);
        assert!(config.user_agent.contains("pagecontrast"));
    }

    #[cfg(feature = "markup")]
    #[test]
    fn test_default_engine_analyzes_loaded_html() {
        let mut engine = new_engine(EngineConfig::default()).unwrap();
        let html = r#"<body style="background:#e6e6e6"><p style="color:#fff">Faint</p></body>"#;
        engine.load_html(html, None).unwrap();
        let report = ContrastAnalyzer::default().analyze(&engine.snapshot().unwrap());
        assert_eq!(report.total_elements, 1);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].contrast.to_string(), "1.25");
    }

    #[cfg(feature = "markup")]
    #[test]
    fn test_load_file_reads_sibling_stylesheets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css/site.css"), "p { color: #eeeeee }").unwrap();
        let page = dir.path().join("index.html");
        std::fs::write(
            &page,
            r#"<html><head><link rel="stylesheet" href="css/site.css"></head><body><p>Pale</p></body></html>"#,
        )
        .unwrap();

        let mut engine = new_engine(EngineConfig::default()).unwrap();
        engine.load_file(&page).unwrap();
        let snapshot = engine.snapshot().unwrap();
        assert!(snapshot.url.starts_with("file://"));
        let report = ContrastAnalyzer::default().analyze(&snapshot);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].sample.text_color, "rgb(238, 238, 238)");
    }

    #[test]
    fn test_load_file_missing_is_io_error() {
        struct Recorder(Option<String>);
        impl Engine for Recorder {
            fn new(_: EngineConfig) -> Result<Self> {
                Ok(Recorder(None))
            }
            fn load_url(&mut self, _: &str) -> Result<()> {
                Ok(())
            }
            fn load_html(&mut self, _: &str, base_url: Option<&str>) -> Result<()> {
                self.0 = base_url.map(str::to_string);
                Ok(())
            }
            fn snapshot(&self) -> Result<DomSnapshot> {
                DomSnapshot::new("", "", Vec::new())
            }
            fn page_html(&self) -> Result<String> {
                Ok(String::new())
            }
            fn close(self) -> Result<()> {
                Ok(())
            }
        }

        let mut engine = Recorder::new(EngineConfig::default()).unwrap();
        let err = engine.load_file(Path::new("does/not/exist.html")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));

        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("page.html");
        std::fs::write(&page, "<p>x</p>").unwrap();
        engine.load_file(&page).unwrap();
        let base = engine.0.unwrap();
        assert!(base.starts_with("file://") && base.ends_with("/page.html"), "{}", base);
    }
}
