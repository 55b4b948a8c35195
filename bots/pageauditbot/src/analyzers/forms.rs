// SPDX-License-Identifier: PMPL-1.0-or-later
//! Form accessibility auditor - WCAG 3.3.2 Labels or Instructions,
//! 1.3.1 Info and Relationships, 1.3.5 Identify Input Purpose

use serde::Serialize;
use serde_json::json;

use crate::error::Result;
use crate::model::Issue;
use crate::page::probes::{self, FormField};
use crate::page::{evaluate_as, PageHandle};
use crate::severity::Severity;

pub const TOOL: &str = "form-auditor";

/// Field types that benefit from an autocomplete token
const AUTOCOMPLETE_TYPES: &[&str] = &["email", "tel", "url", "text", "password"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    pub fields_checked: usize,
    pub missing_labels: usize,
    pub missing_autocomplete: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FormReport {
    pub issues: Vec<Issue>,
    pub summary: FormSummary,
}

/// Form label and autocomplete auditor
pub struct FormAuditor;

impl FormAuditor {
    /// Audit the fields of every form matching `form_selector` (all forms by default)
    pub async fn check(&self, page: &dyn PageHandle, form_selector: Option<&str>) -> Result<FormReport> {
        let args = match form_selector {
            Some(selector) => json!({ "formSelector": selector }),
            None => json!({}),
        };
        let fields: Vec<FormField> = evaluate_as(page, &probes::FORM_FIELDS, args).await?;
        Ok(audit_fields(&fields))
    }
}

/// Autocomplete token to suggest for a field
pub fn suggest_autocomplete(field_type: &str, name: &str) -> &'static str {
    match field_type {
        "email" => "email",
        "tel" => "tel",
        "password" => "current-password",
        _ if name.contains("postal") => "postal-code",
        _ if name.contains("address") => "street-address",
        _ => "on",
    }
}

fn field_element(field: &FormField) -> String {
    if field.tag_name == "input" {
        format!("input[type=\"{}\"]", field.field_type)
    } else {
        field.tag_name.clone()
    }
}

pub fn audit_fields(fields: &[FormField]) -> FormReport {
    let mut report = FormReport {
        summary: FormSummary {
            fields_checked: fields.len(),
            ..Default::default()
        },
        ..Default::default()
    };

    for field in fields {
        let labelled = field.has_label
            || field.aria_label.as_deref().is_some_and(|l| !l.trim().is_empty())
            || field.aria_labelledby.as_deref().is_some_and(|l| !l.trim().is_empty());

        if !labelled && field.field_type != "hidden" {
            report.summary.missing_labels += 1;
            report.issues.push(
                Issue::new(TOOL, "missing-label", Severity::Critical, "Form field has no associated label")
                    .with_wcag(&["3.3.2", "1.3.1"])
                    .with_selector(&field.selector)
                    .with_element(&field_element(field))
                    .with_evidence("name", if field.name.is_empty() { "unnamed" } else { field.name.as_str() })
                    .with_suggestion("Add a <label for> element, or aria-label / aria-labelledby"),
            );
        }

        let has_autocomplete = field.autocomplete.is_some();
        if AUTOCOMPLETE_TYPES.contains(&field.field_type.as_str()) && !has_autocomplete {
            let token = suggest_autocomplete(&field.field_type, &field.name.to_lowercase());
            report.summary.missing_autocomplete += 1;
            report.issues.push(
                Issue::new(TOOL, "missing-autocomplete", Severity::Minor, "Input field missing autocomplete attribute")
                    .with_wcag(&["1.3.5"])
                    .with_selector(&field.selector)
                    .with_element(&field_element(field))
                    .with_evidence("suggestedToken", token)
                    .with_suggestion(&format!("Add autocomplete=\"{}\"", token)),
            );
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::StaticPage;

    #[test]
    fn test_autocomplete_suggestions() {
        assert_eq!(suggest_autocomplete("email", ""), "email");
        assert_eq!(suggest_autocomplete("tel", "phone"), "tel");
        assert_eq!(suggest_autocomplete("password", ""), "current-password");
        assert_eq!(suggest_autocomplete("text", "postal_code"), "postal-code");
        assert_eq!(suggest_autocomplete("text", "home_address"), "street-address");
        assert_eq!(suggest_autocomplete("url", "site"), "on");
    }

    #[tokio::test]
    async fn test_form_fields_from_static_page() {
        let page = StaticPage::new(
            "file:///form.html",
            r#"<html><body>
              <form id="contact">
                <label for="email">Email</label>
                <input id="email" type="email" autocomplete="email">
                <input type="text" name="postal_code">
                <input type="hidden" name="token">
                <textarea aria-label="Message"></textarea>
              </form>
              <form id="search"><input type="search" name="q"></form>
            </body></html>"#,
        );

        let report = FormAuditor.check(&page, Some("#contact")).await.unwrap();
        assert_eq!(report.summary.fields_checked, 4);
        let kinds: Vec<(&str, Severity)> = report.issues.iter().map(|i| (i.kind.as_str(), i.severity())).collect();
        assert_eq!(
            kinds,
            vec![
                ("missing-label", Severity::Critical),
                ("missing-autocomplete", Severity::Minor)
            ]
        );
        assert_eq!(report.issues[0].element.as_deref(), Some("input[type=\"text\"]"));
        assert_eq!(report.issues[1].suggestion.as_deref(), Some("Add autocomplete=\"postal-code\""));

        let all = FormAuditor.check(&page, None).await.unwrap();
        assert_eq!(all.summary.fields_checked, 5);
        assert_eq!(all.summary.missing_labels, 2);
    }
}
