// SPDX-License-Identifier: PMPL-1.0-or-later
//! ARIA validator - WCAG 4.1.2 Name, Role, Value (Level A)
//!
//! Checks rendered elements for:
//! - Interactive controls with no accessible name
//! - Roles outside the supported widget and landmark set

use serde::Serialize;
use serde_json::json;

use crate::error::Result;
use crate::model::Issue;
use crate::page::probes::{self, AriaElement};
use crate::page::{evaluate_as, PageHandle};
use crate::severity::Severity;

pub const TOOL: &str = "aria-validator";

/// Roles the validator accepts
const VALID_ROLES: &[&str] = &[
    "alert",
    "button",
    "checkbox",
    "dialog",
    "link",
    "menu",
    "navigation",
    "region",
    "tab",
    "tabpanel",
    "textbox",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AriaSummary {
    pub elements_checked: usize,
    pub missing_names: usize,
    pub invalid_roles: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AriaReport {
    pub issues: Vec<Issue>,
    pub summary: AriaSummary,
}

/// ARIA name and role validator
pub struct AriaValidator;

impl AriaValidator {
    /// With `interactive_only` the controls themselves are checked for an
    /// accessible name; otherwise every element carrying ARIA is role-checked
    pub async fn check(&self, page: &dyn PageHandle, interactive_only: bool) -> Result<AriaReport> {
        let elements: Vec<AriaElement> = evaluate_as(
            page,
            &probes::ARIA_ELEMENTS,
            json!({ "interactiveOnly": interactive_only }),
        )
        .await?;
        Ok(validate(&elements, interactive_only))
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Whether assistive technology can announce a name for the element
pub fn has_accessible_name(element: &AriaElement) -> bool {
    present(&element.aria_label)
        || present(&element.aria_labelledby)
        || !element.text.trim().is_empty()
        || element.has_label
        || present(&element.alt_text)
}

pub fn validate(elements: &[AriaElement], interactive_only: bool) -> AriaReport {
    let mut report = AriaReport {
        summary: AriaSummary {
            elements_checked: elements.len(),
            ..Default::default()
        },
        ..Default::default()
    };

    for element in elements {
        let hidden_input = element.input_type.as_deref() == Some("hidden");
        if interactive_only && !hidden_input && !has_accessible_name(element) {
            report.summary.missing_names += 1;
            report.issues.push(
                Issue::new(
                    TOOL,
                    "missing-accessible-name",
                    Severity::Serious,
                    &format!("{} has no accessible name", element.tag_name),
                )
                .with_wcag(&["4.1.2"])
                .with_selector(&element.selector)
                .with_element(&element.tag_name)
                .with_evidence("role", element.role.as_deref().unwrap_or("none"))
                .with_suggestion("Give the control visible text, a <label>, or an aria-label"),
            );
        }

        if let Some(role) = element.role.as_deref().filter(|r| !r.is_empty()) {
            if !VALID_ROLES.contains(&role) {
                report.summary.invalid_roles += 1;
                report.issues.push(
                    Issue::new(
                        TOOL,
                        "invalid-role",
                        Severity::Moderate,
                        &format!("Invalid ARIA role: {}", role),
                    )
                    .with_wcag(&["4.1.2"])
                    .with_selector(&element.selector)
                    .with_element(&element.tag_name)
                    .with_evidence("role", role),
                );
            }
        }
    }

    report
}
