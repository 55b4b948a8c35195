// SPDX-License-Identifier: PMPL-1.0-or-later
//! Report generation for audits.
//!
//! Supports multiple output formats:
//! - Text: score card followed by issues grouped by severity
//! - JSON: `{ audit, score }` document for programmatic consumption
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration

use serde::Serialize;
use serde_json::{json, Value};

use crate::model::AuditRecord;
use crate::scoring::{summary_text, ScoreRecord};
use crate::severity::Severity;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
    /// SARIF for IDE/CI integration
    Sarif,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Sarif => write!(f, "sarif"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "sarif" => Ok(OutputFormat::Sarif),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Generate a report for a scored audit
pub fn generate_report(audit: &AuditRecord, score: &ScoreRecord, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => generate_text_report(audit, score),
        OutputFormat::Json => generate_json_report(audit, score),
        OutputFormat::Sarif => generate_sarif_report(audit),
    }
}

/// Generate human-readable text report
fn generate_text_report(audit: &AuditRecord, score: &ScoreRecord) -> String {
    let mut output = String::new();

    output.push_str("=== Page Accessibility Audit ===\n");
    output.push_str(&format!("URL: {}\n", audit.url));
    output.push_str(&format!(
        "Browser: {}  Mode: {}  WCAG: {}  Audited: {}\n\n",
        audit.browser,
        audit.mode,
        audit.wcag_level,
        audit.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output.push_str(&summary_text(score));
    output.push('\n');

    if audit.issues.is_empty() {
        output.push_str("No accessibility issues found. All checks passed.\n");
    }

    for severity in Severity::ALL {
        let bucket: Vec<_> = audit.issues.bucket(severity).collect();
        if bucket.is_empty() {
            continue;
        }

        output.push_str(&format!("--- {} ({}) ---\n", severity, bucket.len()));

        for issue in bucket {
            output.push_str(&format!("[{}] {}\n", issue.kind, issue.description));
            output.push_str(&format!("  Location: {}\n", issue.location_string()));

            if !issue.wcag_tags.is_empty() {
                output.push_str(&format!("  WCAG: {}\n", issue.wcag_tags.join(", ")));
            }

            if let Some(ref suggestion) = issue.suggestion {
                output.push_str(&format!("  Fix: {}\n", suggestion));
            }

            output.push_str(&format!("  Tool: {}\n\n", issue.tool));
        }
    }

    if !audit.failures.is_empty() {
        output.push_str("--- analyzers that did not complete ---\n");
        for failure in &audit.failures {
            output.push_str(&format!("{}: {}\n", failure.tool, failure.message));
        }
    }

    output
}

#[derive(Serialize)]
struct JsonReport<'a> {
    audit: &'a AuditRecord,
    score: &'a ScoreRecord,
}

/// Generate JSON report
fn generate_json_report(audit: &AuditRecord, score: &ScoreRecord) -> String {
    serde_json::to_string_pretty(&JsonReport { audit, score }).unwrap_or_else(|e| {
        format!("{{\"error\": \"Failed to serialize report: {}\"}}", e)
    })
}

const SARIF_SCHEMA: &str = "https://json.schemastore.org/sarif-2.1.0.json";

fn sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::Serious => "error",
        Severity::Moderate => "warning",
        Severity::Minor => "note",
    }
}

/// Generate a SARIF 2.1.0 log with one result per issue
fn generate_sarif_report(audit: &AuditRecord) -> String {
    let results: Vec<Value> = audit
        .issues
        .iter()
        .map(|issue| {
            let text = match issue.wcag_tags.is_empty() {
                true => issue.description.clone(),
                false => format!("{} (WCAG {})", issue.description, issue.wcag_tags.join(", ")),
            };

            let mut location = json!({
                "physicalLocation": { "artifactLocation": { "uri": audit.url } }
            });
            if let Some(selector) = &issue.selector {
                location["logicalLocations"] = json!([{ "fullyQualifiedName": selector }]);
            }

            json!({
                "ruleId": format!("{}/{}", issue.tool, issue.kind),
                "level": sarif_level(issue.severity()),
                "message": { "text": text },
                "locations": [location],
            })
        })
        .collect();

    let report = json!({
        "$schema": SARIF_SCHEMA,
        "version": "2.1.0",
        "runs": [{
            "tool": { "driver": { "name": "pageauditbot", "version": env!("CARGO_PKG_VERSION") } },
            "results": results,
        }],
    });

    serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
        format!("{{\"error\": \"Failed to serialize SARIF report: {}\"}}", e)
    })
}
