// SPDX-License-Identifier: PMPL-1.0-or-later
//! Care-sector compliance analyzer
//!
//! Heuristics for health and social care services, tagged with the CQC key
//! questions and the NHS Digital Service Standard alongside WCAG:
//! - Emergency features must be visible, clearly labelled and large
//! - Body text must stay readable for elderly users
//! - Health and medication information must not use small text
//! - Care record fields should support autocomplete
//!
//! The brand palette check only samples branded elements; it raises nothing.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use crate::analyzers::{Analyzer, AuditContext};
use crate::config::DomainConfig;
use crate::error::Result;
use crate::model::Issue;
use crate::page::probes::{self, ColorPair, EmergencyElement, HealthText, RecordField, TextSample};
use crate::page::{evaluate_as, PageHandle, Probe};
use crate::severity::Severity;

pub const TOOL: &str = "care-sector-checker";

const EMERGENCY_KEYWORDS: &[&str] = &["emergency", "urgent", "crisis", "alert", "999", "111", "help"];

const HEALTH_KEYWORDS: &[&str] = &[
    "medication",
    "dosage",
    "prescription",
    "treatment",
    "diagnosis",
    "allergy",
    "condition",
    "symptoms",
    "side effects",
    "contraindication",
];

const RECORD_KEYWORDS: &[&str] = &["care plan", "resident", "patient", "notes", "assessment", "observation"];

/// Emergency controls smaller than this are hard to spot
const EMERGENCY_MIN_PX: f64 = 16.0;

/// Body and health text smaller than this is too small for elderly readers
const READABLE_MIN_PX: f64 = 14.0;

/// Labels shorter than this say too little about an emergency action
const EMERGENCY_MIN_LABEL_CHARS: usize = 5;

/// Which sector checks passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorCompliance {
    pub emergency_accessible: bool,
    pub elderly_friendly: bool,
    pub brand_compliant: bool,
    pub health_info_clear: bool,
    pub care_record_accessible: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainReport {
    pub issues: Vec<Issue>,
    #[serde(rename = "careSectorCompliance")]
    pub compliance: SectorCompliance,
}

/// Health and social care sector analyzer
pub struct DomainComplianceAnalyzer {
    config: DomainConfig,
}

impl Default for DomainComplianceAnalyzer {
    fn default() -> Self {
        Self::new(DomainConfig::default())
    }
}

impl DomainComplianceAnalyzer {
    pub fn new(config: DomainConfig) -> Self {
        Self { config }
    }

    /// Run every sector check. A check whose probe fails is logged and
    /// reported as not passed.
    pub async fn check(&self, page: &dyn PageHandle) -> Result<DomainReport> {
        let mut issues = Vec::new();

        let emergency = self.emergency_issues(page).await;
        let elderly = elderly_text_issues(page).await;
        let brand = self.brand_issues(page).await;
        let health = health_info_issues(page).await;
        let records = care_record_issues(page).await;

        let compliance = SectorCompliance {
            emergency_accessible: passed(&emergency),
            elderly_friendly: passed(&elderly),
            brand_compliant: passed(&brand),
            health_info_clear: passed(&health),
            care_record_accessible: passed(&records),
        };

        for found in [emergency, elderly, brand, health, records] {
            issues.extend(found.unwrap_or_default());
        }

        tracing::debug!(issues = issues.len(), "Care sector checks finished");
        Ok(DomainReport { issues, compliance })
    }

    async fn emergency_issues(&self, page: &dyn PageHandle) -> Option<Vec<Issue>> {
        let elements: Vec<EmergencyElement> = probe(
            page,
            &probes::EMERGENCY_ELEMENTS,
            json!({ "keywords": EMERGENCY_KEYWORDS }),
        )
        .await?;

        let mut issues = Vec::new();
        for element in &elements {
            issues.extend(self.emergency_element_issues(element));
        }
        Some(issues)
    }

    fn emergency_element_issues(&self, element: &EmergencyElement) -> Vec<Issue> {
        let mut issues = Vec::new();

        if element.font_size < EMERGENCY_MIN_PX {
            issues.push(
                Issue::new(
                    TOOL,
                    "emergency-feature-too-small",
                    self.config.emergency_too_small_severity,
                    &format!("Emergency feature text too small ({}px)", element.font_size),
                )
                .with_wcag(&["1.4.4", "CQC-Safe"])
                .with_selector(&element.selector)
                .with_element(&element.text)
                .with_evidence("fontSize", element.font_size)
                .with_evidence(
                    "careSectorStandard",
                    "CQC Safe - Emergency features must be immediately identifiable",
                )
                .with_suggestion("Emergency features should be at least 18px for elderly users"),
            );
        }

        if !element.has_aria_label && element.text.chars().count() < EMERGENCY_MIN_LABEL_CHARS {
            issues.push(
                Issue::new(
                    TOOL,
                    "emergency-feature-unclear-label",
                    Severity::Serious,
                    "Emergency feature has unclear or missing label",
                )
                .with_wcag(&["4.1.2", "CQC-Safe"])
                .with_selector(&element.selector)
                .with_element(&element.tag_name)
                .with_evidence(
                    "careSectorStandard",
                    "CQC Safe - Emergency features must be clearly labelled",
                )
                .with_suggestion("Add clear aria-label describing the emergency action"),
            );
        }

        if !element.is_visible {
            issues.push(
                Issue::new(TOOL, "emergency-feature-hidden", Severity::Critical, "Emergency feature is hidden")
                    .with_wcag(&["CQC-Safe"])
                    .with_selector(&element.selector)
                    .with_element(&element.text)
                    .with_evidence(
                        "careSectorStandard",
                        "CQC Safe - Emergency features must be accessible at all times",
                    )
                    .with_suggestion("Emergency features must be always visible"),
            );
        }

        issues
    }

    /// Samples branded elements only; palette rules are not enforced yet
    async fn brand_issues(&self, page: &dyn PageHandle) -> Option<Vec<Issue>> {
        let usage: Vec<ColorPair> = probe(
            page,
            &probes::BRAND_ELEMENTS,
            json!({ "marker": self.config.brand_class_marker }),
        )
        .await?;
        tracing::trace!(branded = usage.len(), "Brand palette sampled");
        Some(Vec::new())
    }
}

#[async_trait]
impl Analyzer for DomainComplianceAnalyzer {
    fn name(&self) -> &str {
        TOOL
    }

    async fn analyze(&self, page: &dyn PageHandle, _ctx: &AuditContext) -> Result<Vec<Issue>> {
        Ok(self.check(page).await?.issues)
    }
}

fn passed(found: &Option<Vec<Issue>>) -> bool {
    found.as_ref().is_some_and(|issues| issues.is_empty())
}

/// Evaluate a probe, logging and swallowing failures
async fn probe<T: serde::de::DeserializeOwned>(
    page: &dyn PageHandle,
    probe: &Probe,
    args: serde_json::Value,
) -> Option<T> {
    match evaluate_as(page, probe, args).await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(probe = probe.name, "Care sector check failed: {}", e);
            None
        }
    }
}

async fn elderly_text_issues(page: &dyn PageHandle) -> Option<Vec<Issue>> {
    let samples: Vec<TextSample> = probe(
        page,
        &probes::SMALL_TEXT,
        json!({ "maxPx": READABLE_MIN_PX, "limit": 10 }),
    )
    .await?;

    if samples.is_empty() {
        return Some(Vec::new());
    }
    let examples: Vec<&TextSample> = samples.iter().take(5).collect();
    Some(vec![Issue::new(
        TOOL,
        "text-too-small-for-elderly",
        Severity::Moderate,
        &format!(
            "{} text elements below 14px (elderly users may struggle)",
            samples.len()
        ),
    )
    .with_wcag(&["1.4.4", "NHS-Digital-Standard"])
    .with_evidence("examples", examples)
    .with_evidence(
        "careSectorStandard",
        "NHS Digital Service Standard - Design for users with visual impairments",
    )
    .with_suggestion("Use minimum 14px for body text, 16px preferred for elderly users")])
}

async fn health_info_issues(page: &dyn PageHandle) -> Option<Vec<Issue>> {
    let found: Vec<HealthText> = probe(
        page,
        &probes::HEALTH_TEXT,
        json!({ "keywords": HEALTH_KEYWORDS }),
    )
    .await?;

    Some(
        found
            .iter()
            .filter(|info| info.font_size < READABLE_MIN_PX)
            .map(|info| {
                Issue::new(
                    TOOL,
                    "health-info-unclear",
                    Severity::Serious,
                    "Health/medication information uses small text",
                )
                .with_wcag(&["CQC-Effective"])
                .with_evidence("text", &info.text)
                .with_evidence("fontSize", info.font_size)
                .with_evidence("keyword", &info.keyword)
                .with_evidence(
                    "careSectorStandard",
                    "CQC Effective - Health information must be clearly communicated",
                )
                .with_suggestion("Health-critical information should be at least 16px and bold")
            })
            .collect(),
    )
}

async fn care_record_issues(page: &dyn PageHandle) -> Option<Vec<Issue>> {
    let fields: Vec<RecordField> = probe(
        page,
        &probes::RECORD_FIELDS,
        json!({ "keywords": RECORD_KEYWORDS }),
    )
    .await?;

    Some(
        fields
            .iter()
            .filter(|field| !field.has_autocomplete && field.field_type != "textarea")
            .map(|field| {
                let label = if field.label_text.is_empty() {
                    &field.placeholder
                } else {
                    &field.label_text
                };
                Issue::new(
                    TOOL,
                    "care-record-missing-autocomplete",
                    Severity::Moderate,
                    "Care record field missing autocomplete attribute",
                )
                .with_wcag(&["1.3.5"])
                .with_evidence("field", label)
                .with_evidence(
                    "careSectorStandard",
                    "CQC Effective - Systems should support efficient care delivery",
                )
                .with_suggestion("Add autocomplete to help staff fill forms faster")
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::testing::ScriptedPage;
    use serde_json::Value;

    fn emergency(text: &str, font_size: f64, visible: bool, aria: bool) -> Value {
        json!({
            "text": text,
            "tagName": "button",
            "fontSize": font_size,
            "isVisible": visible,
            "hasAriaLabel": aria,
            "role": null,
            "selector": "#sos"
        })
    }

    fn clean_page() -> ScriptedPage {
        ScriptedPage::default()
            .with("emergency-elements", json!([]))
            .with("small-text", json!([]))
            .with("brand-elements", json!([]))
            .with("health-text", json!([]))
            .with("record-fields", json!([]))
    }

    #[tokio::test]
    async fn test_clean_page_is_fully_compliant() {
        let report = DomainComplianceAnalyzer::default().check(&clean_page()).await.unwrap();
        assert!(report.issues.is_empty());
        assert_eq!(
            report.compliance,
            SectorCompliance {
                emergency_accessible: true,
                elderly_friendly: true,
                brand_compliant: true,
                health_info_clear: true,
                care_record_accessible: true,
            }
        );
    }

    #[tokio::test]
    async fn test_emergency_element_checks() {
        let page = clean_page().with("emergency-elements", json!([emergency("SOS", 12.0, false, false)]));
        let report = DomainComplianceAnalyzer::default().check(&page).await.unwrap();
        let kinds: Vec<(&str, Severity)> = report.issues.iter().map(|i| (i.kind.as_str(), i.severity())).collect();
        assert_eq!(
            kinds,
            vec![
                ("emergency-feature-too-small", Severity::Critical),
                ("emergency-feature-unclear-label", Severity::Serious),
                ("emergency-feature-hidden", Severity::Critical),
            ]
        );
        assert_eq!(report.issues[0].wcag_tags, vec!["1.4.4", "CQC-Safe"]);
        assert!(!report.compliance.emergency_accessible);
    }

    #[tokio::test]
    async fn test_too_small_severity_is_configurable() {
        let config = DomainConfig {
            emergency_too_small_severity: Severity::Serious,
            ..DomainConfig::default()
        };
        let page = clean_page().with("emergency-elements", json!([emergency("Call 999 now", 12.0, true, true)]));
        let report = DomainComplianceAnalyzer::new(config).check(&page).await.unwrap();
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].severity(), Severity::Serious);
    }

    #[tokio::test]
    async fn test_small_text_and_health_info() {
        let samples: Vec<Value> = (0..7)
            .map(|i| json!({ "tagName": "p", "fontSize": 12.0, "text": format!("Small text {}", i) }))
            .collect();
        let page = clean_page()
            .with("small-text", json!(samples))
            .with(
                "health-text",
                json!([
                    { "text": "Medication at 8am", "fontSize": 12.0, "fontWeight": 400, "keyword": "medication" },
                    { "text": "Allergy list", "fontSize": 18.0, "fontWeight": 700, "keyword": "allergy" }
                ]),
            );
        let report = DomainComplianceAnalyzer::default().check(&page).await.unwrap();

        let elderly = report.issues.iter().find(|i| i.kind == "text-too-small-for-elderly").unwrap();
        assert_eq!(elderly.severity(), Severity::Moderate);
        assert_eq!(elderly.description, "7 text elements below 14px (elderly users may struggle)");
        assert_eq!(elderly.evidence["examples"].as_array().unwrap().len(), 5);

        let health: Vec<&Issue> = report.issues.iter().filter(|i| i.kind == "health-info-unclear").collect();
        assert_eq!(health.len(), 1);
        assert_eq!(health[0].evidence["keyword"], "medication");
        assert!(!report.compliance.health_info_clear);
        assert!(!report.compliance.elderly_friendly);
    }

    #[tokio::test]
    async fn test_record_fields_exempt_textarea() {
        let page = clean_page().with(
            "record-fields",
            json!([
                { "type": "text", "name": "resident_name", "hasLabel": true, "hasAutocomplete": false, "placeholder": "", "labelText": "resident name" },
                { "type": "textarea", "name": "notes", "hasLabel": true, "hasAutocomplete": false, "placeholder": "", "labelText": "notes" },
                { "type": "text", "name": "patient_id", "hasLabel": false, "hasAutocomplete": true, "placeholder": "patient id", "labelText": "" }
            ]),
        );
        let report = DomainComplianceAnalyzer::default().check(&page).await.unwrap();
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, "care-record-missing-autocomplete");
        assert_eq!(report.issues[0].evidence["field"], "resident name");
    }

    #[tokio::test]
    async fn test_failed_check_is_not_compliant_and_others_run() {
        let page = clean_page()
            .failing_on("emergency-elements")
            .with("small-text", json!([{ "tagName": "li", "fontSize": 11.0, "text": "Tiny list item" }]));
        let report = DomainComplianceAnalyzer::default().check(&page).await.unwrap();
        assert!(!report.compliance.emergency_accessible);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, "text-too-small-for-elderly");
    }
}
