//! Chrome DevTools Protocol backend

use crate::dom::DomSnapshot;
use crate::{Engine, EngineConfig, Error, Result};
use headless_chrome::browser::tab::Tab;
use headless_chrome::{Browser, LaunchOptions};
use std::sync::Arc;
use std::time::Duration;

/// In-page script serialising every element with its computed style
const COLLECTOR_JS: &str = include_str!("cdp_collector.js");

/// CDP-based engine (uses the `headless_chrome` crate)
///
/// Launches a headless Chrome sized to the configured viewport and drives a
/// single tab. Snapshots come from real computed styles and bounding boxes.
pub struct CdpEngine {
    browser: Browser,
    tab: Arc<Tab>,
    config: EngineConfig,
    loaded: bool,
}

impl CdpEngine {
    fn settle(&self) {
        if self.config.settle_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.config.settle_ms));
        }
    }

    /// Evaluate `script` and return its result as a string
    fn eval_string(&self, script: &str) -> Result<String> {
        let eval = self
            .tab
            .evaluate(script, false)
            .map_err(|e| Error::RenderError(format!("Evaluation failed: {}", e)))?;
        match eval.value {
            Some(serde_json::Value::String(s)) => Ok(s),
            Some(other) => Err(Error::RenderError(format!(
                "expected a string result, got {}",
                other
            ))),
            None => Err(Error::RenderError("evaluation returned no value".into())),
        }
    }
}

impl Engine for CdpEngine {
    fn new(config: EngineConfig) -> Result<Self>
    where
        Self: Sized,
    {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .build()
            .map_err(|e| {
                Error::InitializationError(format!("Failed to build launch options: {}", e))
            })?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(Duration::from_millis(config.timeout_ms));

        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| Error::InitializationError(format!("Failed to set user agent: {}", e)))?;

        if !config.headers.is_empty() {
            let headers: std::collections::HashMap<&str, &str> = config
                .headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            tab.set_extra_http_headers(headers)
                .map_err(|e| Error::InitializationError(format!("Failed to set headers: {}", e)))?;
        }

        Ok(Self {
            browser,
            tab,
            config,
            loaded: false,
        })
    }

    fn load_url(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::LoadError(format!("Wait for navigation failed: {}", e)))?;

        self.settle();
        self.loaded = true;
        log::debug!("navigated to {}", url);
        Ok(())
    }

    fn load_html(&mut self, html: &str, base_url: Option<&str>) -> Result<()> {
        self.tab
            .navigate_to("about:blank")
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;

        let markup = match base_url {
            Some(base) => format!("<base href=\"{}\">{}", base.replace('"', "&quot;"), html),
            None => html.to_string(),
        };
        let literal = serde_json::to_string(&markup)?;
        let script = format!(
            "document.open(); document.write({}); document.close();",
            literal
        );
        self.tab
            .evaluate(&script, false)
            .map_err(|e| Error::LoadError(format!("Failed to write document: {}", e)))?;

        self.settle();
        self.loaded = true;
        Ok(())
    }

    fn snapshot(&self) -> Result<DomSnapshot> {
        if !self.loaded {
            return Err(Error::RenderError("No document loaded".into()));
        }
        let payload = self.eval_string(COLLECTOR_JS)?;
        let snapshot = DomSnapshot::from_json_str(&payload)?;
        log::debug!("collected {} elements from {}", snapshot.len(), snapshot.url);
        Ok(snapshot)
    }

    fn page_html(&self) -> Result<String> {
        if !self.loaded {
            return Err(Error::RenderError("No document loaded".into()));
        }
        self.eval_string("document.documentElement.outerHTML")
    }

    fn close(self) -> Result<()> {
        // Dropping the browser terminates the Chrome child process.
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }
}
