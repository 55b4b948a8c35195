// SPDX-License-Identifier: PMPL-1.0-or-later
//! Named-tool dispatch over the audit engine.
//!
//! Every tool takes a JSON argument object and answers with a text payload.
//! Failures come back as `Error: <message>` with `is_error` set, never as an
//! empty success.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::engine::AuditEngine;
use crate::error::{Error, Result};
use crate::model::{AuditMode, BrowserTarget, WcagLevel};
use crate::report::{generate_report, OutputFormat};
use crate::scoring::ScoreRecord;

/// Tool names and one-line descriptions, in listing order
const TOOLS: &[(&str, &str)] = &[
    (
        "audit_accessibility",
        "Run a WCAG audit of a page and score it (summary or full mode)",
    ),
    (
        "check_color_contrast",
        "Contrast ratios of visible text against WCAG AA/AAA thresholds",
    ),
    (
        "test_keyboard_navigation",
        "Walk the tab order looking for traps, missing skip links and focus indicators",
    ),
    (
        "validate_aria_labels",
        "Accessible names and ARIA roles of interactive elements",
    ),
    (
        "audit_form_accessibility",
        "Form field labels and autocomplete tokens",
    ),
    (
        "check_cognitive_accessibility",
        "Reading level, sentence length, jargon and time limits",
    ),
    (
        "check_care_sector_standards",
        "Emergency controls, elderly-friendly text, health information and care records",
    ),
    (
        "compare_browsers",
        "Summary audit of a page in every enabled browser",
    ),
    ("get_score", "Accessibility score for a completed audit"),
    ("get_audit", "Stored record of a completed audit"),
    (
        "generate_report",
        "Text, JSON or SARIF report for a completed audit",
    ),
];

/// Text answer of a tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub text: String,
    pub is_error: bool,
}

impl ToolResponse {
    fn ok(text: String) -> Self {
        Self { text, is_error: false }
    }

    fn error(err: &Error) -> Self {
        Self {
            text: format!("Error: {}", err),
            is_error: true,
        }
    }
}

/// A listed tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub description: &'static str,
}

pub fn list_tools() -> Vec<ToolInfo> {
    TOOLS
        .iter()
        .map(|&(name, description)| ToolInfo { name, description })
        .collect()
}

#[derive(Debug, Deserialize)]
struct AuditArgs {
    url: String,
    mode: Option<AuditMode>,
    browser: Option<BrowserTarget>,
    wcag_level: Option<WcagLevel>,
}

#[derive(Debug, Deserialize)]
struct ContrastArgs {
    url: String,
    browser: Option<BrowserTarget>,
    level: Option<WcagLevel>,
    selector: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyboardArgs {
    url: String,
    browser: Option<BrowserTarget>,
    start_selector: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AriaArgs {
    url: String,
    browser: Option<BrowserTarget>,
    #[serde(default = "default_true")]
    check_interactive_only: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct FormArgs {
    url: String,
    browser: Option<BrowserTarget>,
    form_selector: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageArgs {
    url: String,
    browser: Option<BrowserTarget>,
}

#[derive(Debug, Deserialize)]
struct CompareArgs {
    url: String,
    wcag_level: Option<WcagLevel>,
}

#[derive(Debug, Deserialize)]
struct AuditIdArgs {
    audit_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ReportArgs {
    audit_id: Uuid,
    format: Option<String>,
}

fn parse<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T> {
    serde_json::from_value(args).map_err(|e| Error::InvalidInput(format!("{}: {}", tool, e)))
}

fn pretty<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Tool dispatcher bound to one engine
pub struct Toolbox {
    engine: AuditEngine,
}

impl Toolbox {
    pub fn new(engine: AuditEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &AuditEngine {
        &self.engine
    }

    /// Run tool `name`. Unknown names are rejected before any work is done.
    pub async fn call(&self, name: &str, args: Value) -> ToolResponse {
        let args = if args.is_null() { Value::Object(Default::default()) } else { args };
        tracing::debug!(tool = name, "Tool call");

        match self.dispatch(name, args).await {
            Ok(text) => ToolResponse::ok(text),
            Err(e) => {
                tracing::warn!(tool = name, "Tool call failed: {}", e);
                ToolResponse::error(&e)
            }
        }
    }

    fn browser(&self, requested: Option<BrowserTarget>) -> BrowserTarget {
        requested.unwrap_or(self.engine.config().browsers.default)
    }

    /// Stored score for an audit, scoring it first if needed
    async fn score_for(&self, audit_id: &Uuid) -> Result<Arc<ScoreRecord>> {
        match self.engine.get_score(audit_id).await {
            Ok(score) => Ok(score),
            Err(Error::AuditNotFound(_)) => self.engine.score(audit_id).await,
            Err(e) => Err(e),
        }
    }

    async fn dispatch(&self, name: &str, args: Value) -> Result<String> {
        let engine = &self.engine;
        match name {
            "audit_accessibility" => {
                let args: AuditArgs = parse(name, args)?;
                let mut request = engine.request(&args.url);
                if let Some(mode) = args.mode {
                    request = request.mode(mode);
                }
                if let Some(level) = args.wcag_level {
                    request = request.wcag_level(level);
                }
                let request = request.browser(self.browser(args.browser));

                let audit = engine.run_audit(request).await?;
                let score = engine.score(&audit.id).await?;

                let mut document = serde_json::to_value(audit.as_ref())?;
                if let Value::Object(ref mut map) = document {
                    map.insert("score".to_string(), serde_json::to_value(score.as_ref())?);
                }
                pretty(&document)
            }
            "check_color_contrast" => {
                let args: ContrastArgs = parse(name, args)?;
                let level = args.level.unwrap_or(engine.config().audit.default_wcag_level);
                let report = engine
                    .check_contrast(&args.url, self.browser(args.browser), level, args.selector.as_deref())
                    .await?;
                pretty(&report)
            }
            "test_keyboard_navigation" => {
                let args: KeyboardArgs = parse(name, args)?;
                let report = engine
                    .test_keyboard(&args.url, self.browser(args.browser), args.start_selector.as_deref())
                    .await?;
                pretty(&report)
            }
            "validate_aria_labels" => {
                let args: AriaArgs = parse(name, args)?;
                let report = engine
                    .validate_aria_labels(&args.url, self.browser(args.browser), args.check_interactive_only)
                    .await?;
                pretty(&report)
            }
            "audit_form_accessibility" => {
                let args: FormArgs = parse(name, args)?;
                let report = engine
                    .audit_form_accessibility(&args.url, self.browser(args.browser), args.form_selector.as_deref())
                    .await?;
                pretty(&report)
            }
            "check_cognitive_accessibility" => {
                let args: PageArgs = parse(name, args)?;
                pretty(&engine.check_readability(&args.url, self.browser(args.browser)).await?)
            }
            "check_care_sector_standards" => {
                let args: PageArgs = parse(name, args)?;
                pretty(&engine.check_domain_standards(&args.url, self.browser(args.browser)).await?)
            }
            "compare_browsers" => {
                let args: CompareArgs = parse(name, args)?;
                let level = args.wcag_level.unwrap_or(engine.config().audit.default_wcag_level);
                pretty(&engine.compare_browsers(&args.url, level).await)
            }
            "get_score" => {
                let args: AuditIdArgs = parse(name, args)?;
                pretty(self.score_for(&args.audit_id).await?.as_ref())
            }
            "get_audit" => {
                let args: AuditIdArgs = parse(name, args)?;
                pretty(engine.get_audit(&args.audit_id).await?.as_ref())
            }
            "generate_report" => {
                let args: ReportArgs = parse(name, args)?;
                let format: OutputFormat = args
                    .format
                    .as_deref()
                    .unwrap_or("text")
                    .parse()
                    .map_err(Error::InvalidInput)?;
                let audit = engine.get_audit(&args.audit_id).await?;
                let score = self.score_for(&args.audit_id).await?;
                Ok(generate_report(&audit, &score, format))
            }
            other => Err(Error::UnknownOperation(other.to_string())),
        }
    }
}
