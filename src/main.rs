//! pagecontrast CLI - WCAG contrast analysis for rendered pages

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pagecontrast::output::{self, TOP_ISSUES};
use pagecontrast::{
    AnalyzerConfig, ContrastAnalyzer, DomSnapshot, Engine, EngineConfig, Viewport,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Check a web page's text against WCAG 2.1 AA contrast minimums
#[derive(Parser)]
#[command(name = "pagecontrast")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a page and analyze the contrast of its text
    Analyze {
        /// URL or local HTML file
        target: String,

        /// Rendering backend
        #[arg(long, value_enum, default_value = "markup")]
        backend: Backend,

        /// Directory for report files
        #[arg(long, default_value = "analysis")]
        out: PathBuf,

        /// JSON file with analyzer settings
        #[arg(long)]
        config: Option<PathBuf>,

        /// Analyzed elements kept in the report preview
        #[arg(long)]
        preview_limit: Option<usize>,

        /// Failing elements kept in the report
        #[arg(long)]
        issue_limit: Option<usize>,

        /// Background assumed when no ancestor paints one
        #[arg(long)]
        default_background: Option<String>,

        /// Viewport width
        #[arg(long, default_value_t = 1920)]
        width: u32,

        /// Viewport height
        #[arg(long, default_value_t = 1080)]
        height: u32,

        /// Page load timeout in milliseconds
        #[arg(long, default_value_t = 30000)]
        timeout_ms: u64,

        /// Wait after load before capturing, in milliseconds
        #[arg(long, default_value_t = 500)]
        settle_ms: u64,

        /// Issues listed in the console summary
        #[arg(long, default_value_t = TOP_ISSUES)]
        top: usize,

        /// Print the full report as JSON instead of the summary
        #[arg(long)]
        json: bool,

        /// Enable verbose logging
        #[arg(long, short)]
        verbose: bool,
    },

    /// Heuristic scan of raw HTML for likely contrast problems
    Triage {
        /// URL or local HTML file
        target: String,

        /// Directory for triage files
        #[arg(long, default_value = "analysis")]
        out: PathBuf,

        /// Enable verbose logging
        #[arg(long, short)]
        verbose: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// Pure-Rust HTML and CSS rendering
    Markup,
    /// Headless Chrome over the DevTools protocol
    Cdp,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("pagecontrast={}", level))),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn is_url(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

/// Load `target` into `engine`: URLs are navigated, anything else is read as a file
fn load_target<E: Engine>(engine: &mut E, target: &str) -> Result<()> {
    if is_url(target) {
        engine.load_url(target).with_context(|| format!("failed to load {}", target))?;
    } else {
        engine
            .load_file(Path::new(target))
            .with_context(|| format!("failed to load {}", target))?;
    }
    Ok(())
}

fn capture<E: Engine>(config: EngineConfig, target: &str) -> Result<DomSnapshot> {
    let mut engine = E::new(config).context("failed to start rendering backend")?;
    load_target(&mut engine, target)?;
    let snapshot = engine.snapshot().context("failed to capture rendered document")?;
    engine.close()?;
    Ok(snapshot)
}

fn render(backend: Backend, config: EngineConfig, target: &str) -> Result<DomSnapshot> {
    match backend {
        #[cfg(feature = "markup")]
        Backend::Markup => capture::<pagecontrast::markup::MarkupEngine>(config, target),
        #[cfg(feature = "cdp")]
        Backend::Cdp => capture::<pagecontrast::cdp::CdpEngine>(config, target),
        #[allow(unreachable_patterns)]
        _ => bail!("this build does not include the requested backend"),
    }
}

fn load_analyzer_config(path: Option<&Path>) -> Result<AnalyzerConfig> {
    match path {
        Some(p) => {
            let raw = std::fs::read_to_string(p)
                .with_context(|| format!("failed to read {}", p.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid analyzer config in {}", p.display()))
        }
        None => Ok(AnalyzerConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            target,
            backend,
            out,
            config,
            preview_limit,
            issue_limit,
            default_background,
            width,
            height,
            timeout_ms,
            settle_ms,
            top,
            json,
            verbose,
        } => {
            init_logging(verbose);

            let mut analyzer_config = load_analyzer_config(config.as_deref())?;
            if let Some(n) = preview_limit {
                analyzer_config.preview_limit = n;
            }
            if let Some(n) = issue_limit {
                analyzer_config.issue_limit = n;
            }
            if let Some(bg) = default_background {
                analyzer_config.default_background = bg;
            }
            let analyzer = ContrastAnalyzer::new(analyzer_config)?;

            let engine_config = EngineConfig {
                viewport: Viewport { width, height },
                timeout_ms,
                settle_ms,
                ..Default::default()
            };
            log::info!("analyzing {}", target);
            let snapshot = render(backend, engine_config, &target)?;
            let report = analyzer.analyze(&snapshot);

            let url = if snapshot.url.is_empty() || snapshot.url == "about:blank" {
                target.as_str()
            } else {
                snapshot.url.as_str()
            };
            let written = output::write_report(&out, &report, url, TOP_ISSUES)
                .with_context(|| format!("failed to write reports to {}", out.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", output::console_summary(&report, top));
                for path in written {
                    println!("Saved {}", path.display());
                }
            }
        }

        Commands::Triage { target, out, verbose } => {
            init_logging(verbose);

            let html = if is_url(&target) {
                let mut engine = pagecontrast::new_engine(EngineConfig::default())?;
                engine.load_url(&target).with_context(|| format!("failed to load {}", target))?;
                let html = engine.page_html()?;
                engine.close()?;
                html
            } else {
                std::fs::read_to_string(&target)
                    .with_context(|| format!("failed to read {}", target))?
            };

            let triage = pagecontrast::triage::triage_html(&html);
            let written = output::write_triage(&out, &html, &triage)
                .with_context(|| format!("failed to write triage files to {}", out.display()))?;

            println!("Triage ({}): {}", triage.kind, triage.conformance);
            println!("   - Text elements found: {}", triage.text_elements.len());
            println!("   - Potential issues: {}", triage.potential_issues.len());
            if !triage.components.is_empty() {
                println!("   - Components: {}", triage.components.join(", "));
            }
            for path in written {
                println!("Saved {}", path.display());
            }
        }
    }

    Ok(())
}
