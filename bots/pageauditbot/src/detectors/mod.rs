// SPDX-License-Identifier: PMPL-1.0-or-later
//! Generic rule-based detectors.
//!
//! A [`RuleEngine`] runs a fixed rule set against the page and reports raw
//! [`Violation`]s in its own severity vocabulary. [`normalize`] is the single
//! ingestion point that folds those labels into canonical [`Issue`]s.

pub mod markup;
pub mod structure;

pub use markup::MarkupRules;
pub use structure::StructureRules;

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use crate::dom::{css_path, opening_tag, truncate};
use crate::error::Result;
use crate::model::{Issue, WcagLevel};
use crate::page::{evaluate_as, probes, PageHandle};
use crate::severity::SeverityScale;

/// An element a rule failed on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationNode {
    pub selector: String,
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_summary: Option<String>,
}

impl ViolationNode {
    pub fn from_element(el: ElementRef<'_>) -> Self {
        Self {
            selector: css_path(el),
            html: truncate(&opening_tag(el), 200),
            failure_summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.failure_summary = Some(summary.into());
        self
    }
}

/// One failed rule as the engine reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Rule id
    pub id: String,
    /// Severity label in the engine's vocabulary
    pub label: String,
    /// Standard references in the order the rule declares them
    pub tags: Vec<String>,
    pub description: String,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub nodes: Vec<ViolationNode>,
}

/// A generic detector
#[async_trait]
pub trait RuleEngine: Send + Sync {
    /// Tool name recorded on every issue
    fn name(&self) -> &str;

    /// Vocabulary of [`Violation::label`]
    fn scale(&self) -> SeverityScale;

    /// Run every rule covered by `level`
    async fn run(&self, page: &dyn PageHandle, level: WcagLevel) -> Result<Vec<Violation>>;
}

/// Convert raw violations into issues: one per affected node, or one
/// node-less issue when the rule reports no nodes
pub fn normalize(tool: &str, scale: SeverityScale, violations: Vec<Violation>) -> Vec<Issue> {
    let mut issues = Vec::new();
    for violation in violations {
        let severity = scale.normalize(&violation.label);
        let base = || {
            let issue = Issue::new(tool, &violation.id, severity, &violation.description)
                .with_wcag(violation.tags.as_slice())
                .with_evidence("sourceLabel", &violation.label);
            match &violation.help {
                Some(help) => issue.with_suggestion(help),
                None => issue,
            }
        };

        if violation.nodes.is_empty() {
            issues.push(base());
            continue;
        }
        for node in &violation.nodes {
            let mut issue = base().with_selector(&node.selector).with_element(&node.html);
            if let Some(summary) = &node.failure_summary {
                issue = issue.with_evidence("failureSummary", summary);
            }
            issues.push(issue);
        }
    }
    issues
}

/// A rule evaluated over parsed markup
pub(crate) struct MarkupRule {
    pub id: &'static str,
    pub label: &'static str,
    /// Lowest conformance level that requires this rule
    pub level: WcagLevel,
    pub tags: &'static [&'static str],
    pub description: &'static str,
    pub help: &'static str,
    pub check: fn(&Html) -> Vec<ViolationNode>,
}

/// Run the applicable rules over the page's serialized document
pub(crate) async fn run_markup_rules(
    rules: &[MarkupRule],
    page: &dyn PageHandle,
    level: WcagLevel,
) -> Result<Vec<Violation>> {
    let html: String = evaluate_as(page, &probes::DOCUMENT_HTML, serde_json::json!({})).await?;
    Ok(check_markup(rules, &html, level))
}

fn check_markup(rules: &[MarkupRule], html: &str, level: WcagLevel) -> Vec<Violation> {
    let doc = Html::parse_document(html);
    rules
        .iter()
        .filter(|rule| rule.level <= level)
        .filter_map(|rule| {
            let nodes = (rule.check)(&doc);
            if nodes.is_empty() {
                return None;
            }
            Some(Violation {
                id: rule.id.to_string(),
                label: rule.label.to_string(),
                tags: rule.tags.iter().map(|t| t.to_string()).collect(),
                description: rule.description.to_string(),
                help: Some(rule.help.to_string()),
                nodes,
            })
        })
        .collect()
}
