//! Markup backend: a pure-Rust stand-in for a browser.
//!
//! Fetches HTML over HTTP (or takes it directly), collects inline and linked
//! stylesheets, runs a small cascade and block layout, and reports every
//! element with its computed style and rectangle. No JavaScript runs, so
//! pages that build their content client-side will come back mostly empty;
//! use the `cdp` backend for those.

pub mod layout;
pub mod style;

use crate::dom::{ComputedStyle, DomNode, DomSnapshot};
use crate::{Engine, EngineConfig, Error, Result, Viewport};
use layout::{BlockInput, BODY_MARGIN};
use reqwest::blocking::Client;
use scraper::{ElementRef, Html};
use std::sync::OnceLock;
use std::time::Duration;
use style::{Computed, Rule};

fn user_agent_rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| style::parse_stylesheet(style::USER_AGENT_CSS))
}

pub struct MarkupEngine {
    client: Client,
    config: EngineConfig,
    last_html: Option<String>,
    last_url: Option<String>,
    styles: Vec<String>,
}

impl MarkupEngine {
    fn fetch_text(&self, url: &str) -> Result<String> {
        let mut req = self.client.get(url);
        for (k, v) in &self.config.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        let resp = req
            .send()
            .map_err(|e| Error::NetworkError(format!("Failed to fetch {}: {}", url, e)))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::LoadError(format!("{} returned HTTP {}", url, status)));
        }
        resp.text()
            .map_err(|e| Error::NetworkError(format!("Failed to read response body: {}", e)))
    }

    /// Linked stylesheets come over HTTP, or from disk for `file://` pages
    fn fetch_stylesheet(&self, css_url: &url::Url) -> Result<String> {
        if css_url.scheme() != "file" {
            return self.fetch_text(css_url.as_str());
        }
        let path = css_url
            .to_file_path()
            .map_err(|_| Error::LoadError(format!("{} is not a local path", css_url)))?;
        Ok(std::fs::read_to_string(path)?)
    }

    /// Inline `<style>` blocks plus linked stylesheets resolved against `base_url`
    fn extract_styles(&self, html: &str, base_url: Option<&str>) -> Vec<String> {
        let document = Html::parse_document(html);
        let base = base_url.and_then(|b| url::Url::parse(b).ok());
        let mut styles = Vec::new();

        for el in document.root_element().descendants().filter_map(ElementRef::wrap) {
            match el.value().name() {
                "style" => {
                    let txt = el.text().collect::<String>();
                    if !txt.trim().is_empty() {
                        styles.push(txt);
                    }
                }
                "link" if self.config.fetch_stylesheets => {
                    let is_stylesheet = el
                        .value()
                        .attr("rel")
                        .map_or(false, |r| {
                            r.split_whitespace().any(|t| t.eq_ignore_ascii_case("stylesheet"))
                        });
                    let Some(href) = el.value().attr("href").filter(|_| is_stylesheet) else {
                        continue;
                    };
                    let Some(css_url) = base.as_ref().and_then(|b| b.join(href).ok()) else {
                        log::warn!("skipping stylesheet {}: no base URL to resolve against", href);
                        continue;
                    };
                    match self.fetch_stylesheet(&css_url) {
                        Ok(text) if !text.trim().is_empty() => styles.push(text),
                        Ok(_) => {}
                        Err(e) => log::warn!("skipping stylesheet {}: {}", css_url, e),
                    }
                }
                _ => {}
            }
        }
        styles
    }
}

impl Engine for MarkupEngine {
    fn new(config: EngineConfig) -> Result<Self>
    where
        Self: Sized,
    {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                Error::InitializationError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            config,
            last_html: None,
            last_url: None,
            styles: Vec::new(),
        })
    }

    fn load_url(&mut self, url: &str) -> Result<()> {
        let body = self.fetch_text(url)?;
        self.styles = self.extract_styles(&body, Some(url));
        log::debug!("loaded {} ({} bytes, {} stylesheets)", url, body.len(), self.styles.len());
        self.last_html = Some(body);
        self.last_url = Some(url.to_string());
        Ok(())
    }

    fn load_html(&mut self, html: &str, base_url: Option<&str>) -> Result<()> {
        self.styles = self.extract_styles(html, base_url);
        self.last_html = Some(html.to_string());
        self.last_url = Some(base_url.unwrap_or("about:blank").to_string());
        Ok(())
    }

    fn snapshot(&self) -> Result<DomSnapshot> {
        let html = self
            .last_html
            .as_ref()
            .ok_or_else(|| Error::RenderError("No document loaded".into()))?;
        render_snapshot(
            html,
            &self.styles,
            self.config.viewport,
            self.last_url.as_deref().unwrap_or_default(),
        )
    }

    fn page_html(&self) -> Result<String> {
        self.last_html
            .clone()
            .ok_or_else(|| Error::RenderError("No document loaded".into()))
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}

/// Style and lay out `html`, producing a snapshot in document order.
pub fn render_snapshot(
    html: &str,
    stylesheets: &[String],
    viewport: Viewport,
    url: &str,
) -> Result<DomSnapshot> {
    let document = Html::parse_document(html);

    // Document-order arena with parent indices
    let mut elements: Vec<(ElementRef, Option<usize>)> = Vec::new();
    let mut stack = vec![(document.root_element(), None)];
    while let Some((node, parent_idx)) = stack.pop() {
        let idx = elements.len();
        elements.push((node, parent_idx));
        let children: Vec<_> = node.children().filter_map(ElementRef::wrap).collect();
        for child in children.into_iter().rev() {
            stack.push((child, Some(idx)));
        }
    }

    let author_rules: Vec<Rule> = stylesheets
        .iter()
        .flat_map(|css| style::parse_stylesheet(css))
        .collect();
    log::debug!(
        "cascading {} author rules over {} elements",
        author_rules.len(),
        elements.len()
    );

    let mut computed: Vec<Computed> = Vec::with_capacity(elements.len());
    let mut root_font_size = style::DEFAULT_FONT_SIZE;
    for (idx, (el, parent)) in elements.iter().enumerate() {
        let decls = style::cascade(user_agent_rules(), &author_rules, el, el.value().attr("style"));
        let c = style::compute(&decls, parent.map(|p| &computed[p]), root_font_size);
        if idx == 0 {
            root_font_size = c.font_size;
        }
        computed.push(c);
    }

    let blocks: Vec<BlockInput> = elements
        .iter()
        .zip(&computed)
        .map(|((el, parent), c)| BlockInput {
            parent: *parent,
            hidden: c.display_none || el.value().attr("hidden").is_some(),
            margin: if el.value().name() == "body" { BODY_MARGIN } else { 0.0 },
            font_size: c.font_size,
            text: el
                .children()
                .filter_map(|n| n.value().as_text().map(|t| t.to_string()))
                .collect::<Vec<_>>()
                .join(" "),
        })
        .collect();
    let rects = layout::layout_blocks(&blocks, viewport);

    let mut title = String::new();
    let nodes: Vec<DomNode> = elements
        .iter()
        .zip(computed.iter().zip(rects))
        .map(|((el, parent), (c, rect))| {
            let tag = el.value().name().to_ascii_lowercase();
            let text = el.text().collect::<String>();
            if tag == "title" && title.is_empty() {
                title = text.trim().to_string();
            }
            DomNode {
                tag,
                text,
                classes: el.value().attr("class").unwrap_or_default().to_string(),
                parent: *parent,
                child_element_count: el.children().filter(|n| n.value().is_element()).count(),
                style: ComputedStyle {
                    color: c.color.to_css(),
                    background_color: c.background.to_css(),
                    font_size: c.font_size_css(),
                    font_weight: c.font_weight.to_string(),
                },
                rect,
            }
        })
        .collect();

    DomSnapshot::new(url, title, nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>Demo</title>
        <style>
          .hero { background: #1a1a1a url(bg.png) }
          .hero p { color: rgba(255, 255, 255, 0.9) }
          .muted { color: #999 }
          #cta { font-size: 24px; font-weight: bold }
        </style></head>
        <body>
          <section class="hero"><p>Ship faster</p></section>
          <p class="muted">Quiet copy</p>
          <p id="cta" style="color: #212121">Get started</p>
          <div hidden><p>Invisible</p></div>
        </body></html>"#;

    /// Deepest element whose text is exactly `text`
    fn find<'a>(snap: &'a DomSnapshot, text: &str) -> &'a DomNode {
        snap.nodes().iter().rev().find(|n| n.text.trim() == text).unwrap()
    }

    #[test]
    fn computes_cascaded_styles() {
        let snap = render_snapshot(PAGE, &[], Viewport::default(), "about:blank").unwrap();
        // No stylesheets passed: only UA defaults apply
        assert_eq!(find(&snap, "Quiet copy").style.color, "rgb(0, 0, 0)");

        let styles = vec![Html::parse_document(PAGE)
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "style")
            .unwrap()
            .text()
            .collect::<String>()];
        let snap = render_snapshot(PAGE, &styles, Viewport::default(), "about:blank").unwrap();
        assert_eq!(snap.title, "Demo");

        let hero_p = find(&snap, "Ship faster");
        assert_eq!(hero_p.style.color, "rgba(255, 255, 255, 0.9)");
        assert_eq!(hero_p.style.background_color, "rgba(0, 0, 0, 0)");
        let section = snap.get(hero_p.parent.unwrap()).unwrap();
        assert_eq!(section.style.background_color, "rgb(26, 26, 26)");

        assert_eq!(find(&snap, "Quiet copy").style.color, "rgb(153, 153, 153)");
        let cta = find(&snap, "Get started");
        assert_eq!(cta.style.color, "rgb(33, 33, 33)");
        assert_eq!(cta.style.font_size, "24px");
        assert_eq!(cta.style.font_weight, "700");
        assert!(cta.rect.is_visible());
        assert!(!find(&snap, "Invisible").rect.is_visible());
        assert!(!find(&snap, "Demo").rect.is_visible());
    }

    #[test]
    fn parents_precede_children() {
        let snap = render_snapshot(PAGE, &[], Viewport::default(), "").unwrap();
        assert_eq!(snap.get(0).unwrap().tag, "html");
        for (i, n) in snap.nodes().iter().enumerate() {
            assert!(n.parent.map_or(i == 0, |p| p < i));
        }
    }

    #[test]
    fn structural_selectors_and_data_uris_reach_the_analyzer() {
        let analyzer = crate::ContrastAnalyzer::default();

        let html = r#"<div class="list"><p>First</p><p>Second</p></div>"#;
        let styles = vec![".list p:first-child { color: #eeeeee }".to_string()];
        let snap = render_snapshot(html, &styles, Viewport::default(), "about:blank").unwrap();
        assert_eq!(find(&snap, "First").style.color, "rgb(238, 238, 238)");
        assert_eq!(find(&snap, "Second").style.color, "rgb(0, 0, 0)");
        let report = analyzer.analyze(&snap);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].sample.text, "First");

        let html = r#"<section class="hero"><p>Light on dark</p></section>"#;
        let styles = vec![
            r#".hero { background: url("data:image/svg+xml;charset=utf8,%3Csvg%3E") #111111 } .hero p { color: #fff }"#
                .to_string(),
        ];
        let snap = render_snapshot(html, &styles, Viewport::default(), "about:blank").unwrap();
        let p = find(&snap, "Light on dark");
        assert_eq!(snap.get(p.parent.unwrap()).unwrap().style.background_color, "rgb(17, 17, 17)");
        assert!(analyzer.analyze(&snap).issues.is_empty());
    }

    #[test]
    fn snapshot_requires_a_document() {
        let engine = MarkupEngine::new(EngineConfig::default()).unwrap();
        assert!(matches!(engine.snapshot(), Err(Error::RenderError(_))));
    }

    #[test]
    fn load_url_fetches_linked_stylesheets() {
        // Skip on CI where network may not be available
        if std::env::var("CI").is_ok() {
            return;
        }

        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr();
        std::thread::spawn(move || {
            for request in server.incoming_requests().take(2) {
                let body = if request.url().ends_with(".css") {
                    "p { color: #777777; }"
                } else {
                    "<html><head><link rel=\"stylesheet\" href=\"/site.css\"></head><body><p>Linked</p></body></html>"
                };
                let _ = request.respond(tiny_http::Response::from_string(body));
            }
        });

        let mut engine = MarkupEngine::new(EngineConfig::default()).unwrap();
        engine.load_url(&format!("http://{}/", addr)).unwrap();
        let snap = engine.snapshot().unwrap();
        assert_eq!(find(&snap, "Linked").style.color, "rgb(119, 119, 119)");
        engine.close().unwrap();
    }

    #[test]
    fn load_url_rejects_error_status() {
        if std::env::var("CI").is_ok() {
            return;
        }

        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr();
        std::thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let response = tiny_http::Response::from_string("gone").with_status_code(404);
                let _ = request.respond(response);
            }
        });

        let mut engine = MarkupEngine::new(EngineConfig::default()).unwrap();
        let err = engine.load_url(&format!("http://{}/", addr)).unwrap_err();
        assert!(matches!(err, Error::LoadError(_)));
    }

    #[test]
    fn load_url_reports_transport_failures() {
        if std::env::var("CI").is_ok() {
            return;
        }

        // Bind then release a port so nothing is listening on it
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();

        let mut engine = MarkupEngine::new(EngineConfig::default()).unwrap();
        let err = engine.load_url(&format!("http://{}/", addr)).unwrap_err();
        assert!(matches!(err, Error::NetworkError(_)), "{:?}", err);
        assert!(matches!(engine.snapshot(), Err(Error::RenderError(_))));
    }
}
