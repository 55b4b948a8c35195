// SPDX-License-Identifier: PMPL-1.0-or-later
//! Pageauditbot CLI - rendered-page accessibility audits with scoring
//!
//! Part of the gitbot-fleet ecosystem.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use pageauditbot::config::Config;
use pageauditbot::engine::AuditEngine;
use pageauditbot::model::{AuditMode, BrowserTarget, WcagLevel};
use pageauditbot::page::StaticAutomation;
use pageauditbot::report::{generate_report, OutputFormat};
use pageauditbot::tools::{list_tools, Toolbox};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Accessibility audit and scoring bot for gitbot-fleet
#[derive(Parser)]
#[command(name = "pageauditbot")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "pageauditbot.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format for audit reports
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Output file (stdout if not specified)
    #[arg(long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit a page, score it and print a report
    Audit {
        /// URL, file:// URL or path of the page
        url: String,

        /// summary or full (defaults to config)
        #[arg(long)]
        mode: Option<AuditMode>,

        /// chromium, firefox or webkit (defaults to config)
        #[arg(long)]
        browser: Option<BrowserTarget>,

        /// WCAG conformance level (defaults to config)
        #[arg(long)]
        level: Option<WcagLevel>,
    },

    /// Run a single analyzer against a page
    Check {
        /// Analyzer to run
        analyzer: CheckKind,

        /// URL, file:// URL or path of the page
        url: String,

        #[arg(long)]
        browser: Option<BrowserTarget>,

        /// WCAG level for contrast thresholds
        #[arg(long)]
        level: Option<WcagLevel>,

        /// Contrast scope, keyboard start element or form selector
        #[arg(long)]
        selector: Option<String>,
    },

    /// Summary audit in every enabled browser
    Compare {
        url: String,

        #[arg(long)]
        level: Option<WcagLevel>,
    },

    /// Invoke a named tool with JSON arguments
    Call {
        /// Tool name (see `tools`)
        tool: String,

        /// JSON argument object
        #[arg(default_value = "{}")]
        args: String,
    },

    /// List available tools
    Tools,
}

/// Single-analyzer checks
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CheckKind {
    Contrast,
    Keyboard,
    Readability,
    Domain,
    Aria,
    Forms,
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "pageauditbot=debug" } else { "pageauditbot=warn" };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_engine(config_path: &str) -> anyhow::Result<AuditEngine> {
    let config = Config::load(config_path).context("loading configuration")?;
    let automation = StaticAutomation::new(&config).context("building page loader")?;
    Ok(AuditEngine::new(Arc::new(automation), config))
}

fn to_json<T: serde::Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let engine = build_engine(&cli.config)?;
    let output = cli.output.as_deref();

    match cli.command {
        Commands::Audit { url, mode, browser, level } => {
            let mut request = engine.request(&url);
            if let Some(mode) = mode {
                request = request.mode(mode);
            }
            if let Some(browser) = browser {
                request = request.browser(browser);
            }
            if let Some(level) = level {
                request = request.wcag_level(level);
            }

            let audit = engine.run_audit(request).await?;
            let score = engine.score(&audit.id).await?;
            write_output(&generate_report(&audit, &score, cli.format), output)?;

            if audit.has_critical() {
                std::process::exit(1);
            }
        }

        Commands::Check { analyzer, url, browser, level, selector } => {
            let browser = browser.unwrap_or(engine.config().browsers.default);
            let level = level.unwrap_or(engine.config().audit.default_wcag_level);
            let selector = selector.as_deref();

            let report = match analyzer {
                CheckKind::Contrast => to_json(&engine.check_contrast(&url, browser, level, selector).await?)?,
                CheckKind::Keyboard => to_json(&engine.test_keyboard(&url, browser, selector).await?)?,
                CheckKind::Readability => to_json(&engine.check_readability(&url, browser).await?)?,
                CheckKind::Domain => to_json(&engine.check_domain_standards(&url, browser).await?)?,
                CheckKind::Aria => to_json(&engine.validate_aria_labels(&url, browser, true).await?)?,
                CheckKind::Forms => to_json(&engine.audit_form_accessibility(&url, browser, selector).await?)?,
            };
            write_output(&report, output)?;
        }

        Commands::Compare { url, level } => {
            let level = level.unwrap_or(engine.config().audit.default_wcag_level);
            let outcomes = engine.compare_browsers(&url, level).await;
            write_output(&to_json(&outcomes)?, output)?;
        }

        Commands::Call { tool, args } => {
            let args: serde_json::Value =
                serde_json::from_str(&args).context("tool arguments must be a JSON object")?;
            let response = Toolbox::new(engine).call(&tool, args).await;
            write_output(&response.text, output)?;

            if response.is_error {
                std::process::exit(1);
            }
        }

        Commands::Tools => {
            for tool in list_tools() {
                println!("{:<32} {}", tool.name, tool.description);
            }
        }
    }

    Ok(())
}

/// Write output to file or stdout
fn write_output(content: &str, path: Option<&std::path::Path>) -> anyhow::Result<()> {
    match path {
        Some(p) => {
            std::fs::write(p, content)?;
            eprintln!("Report written to {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
