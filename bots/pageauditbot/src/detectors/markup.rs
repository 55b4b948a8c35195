// SPDX-License-Identifier: PMPL-1.0-or-later
//! `markup-rules`: the fast detector run on every audit.
//!
//! Checks that every page needs regardless of layout: text alternatives,
//! document language and title, and accessible names for form controls,
//! buttons and links. Reports impact labels (critical/serious/moderate/minor).

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use super::{run_markup_rules, MarkupRule, RuleEngine, Violation, ViolationNode};
use crate::dom::text_of;
use crate::error::Result;
use crate::model::WcagLevel;
use crate::page::PageHandle;
use crate::severity::SeverityScale;

static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("valid selector"));
static HTML: LazyLock<Selector> = LazyLock::new(|| Selector::parse("html").expect("valid selector"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static CONTROLS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input, select, textarea").expect("valid selector"));
static BUTTONS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"button, [role="button"], input[type="submit"], input[type="button"]"#)
        .expect("valid selector")
});
static LINKS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static LABELS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("label[for]").expect("valid selector"));
static IMG_ALT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[alt]").expect("valid selector"));

/// Input types that never need a visible label
const UNLABELLED_INPUT_TYPES: &[&str] = &["hidden", "submit", "button", "reset", "image"];

const RULES: &[MarkupRule] = &[
    MarkupRule {
        id: "image-alt",
        label: "critical",
        level: WcagLevel::A,
        tags: &["1.1.1"],
        description: "Images must have alternate text",
        help: "Add alt=\"description\" for informative images or alt=\"\" for decorative images",
        check: image_alt,
    },
    MarkupRule {
        id: "html-has-lang",
        label: "serious",
        level: WcagLevel::A,
        tags: &["3.1.1"],
        description: "<html> element must have a lang attribute",
        help: "Add a lang attribute to the <html> element, e.g. lang=\"en\"",
        check: html_has_lang,
    },
    MarkupRule {
        id: "label",
        label: "critical",
        level: WcagLevel::A,
        tags: &["1.3.1", "4.1.2"],
        description: "Form elements must have labels",
        help: "Associate a <label for> with the control, wrap it in a <label>, or add aria-label",
        check: control_labels,
    },
    MarkupRule {
        id: "button-name",
        label: "critical",
        level: WcagLevel::A,
        tags: &["4.1.2"],
        description: "Buttons must have discernible text",
        help: "Give the button visible text, an aria-label, or a labelled image",
        check: button_names,
    },
    MarkupRule {
        id: "link-name",
        label: "serious",
        level: WcagLevel::A,
        tags: &["2.4.4", "4.1.2"],
        description: "Links must have discernible text",
        help: "Give the link visible text, an aria-label, or an image with alt text",
        check: link_names,
    },
    MarkupRule {
        id: "document-title",
        label: "serious",
        level: WcagLevel::A,
        tags: &["2.4.2"],
        description: "Documents must have a <title> element to aid in navigation",
        help: "Add a descriptive, non-empty <title> to the document head",
        check: document_title,
    },
];

/// Impact-scale detector over the serialized document
pub struct MarkupRules;

#[async_trait]
impl RuleEngine for MarkupRules {
    fn name(&self) -> &str {
        "markup-rules"
    }

    fn scale(&self) -> SeverityScale {
        SeverityScale::Impact
    }

    async fn run(&self, page: &dyn PageHandle, level: WcagLevel) -> Result<Vec<Violation>> {
        run_markup_rules(RULES, page, level).await
    }
}

fn attr_nonempty(el: ElementRef<'_>, name: &str) -> bool {
    el.value()
        .attr(name)
        .is_some_and(|v| !v.trim().is_empty())
}

/// Whether an element has a name from aria, title, own text or a labelled image
fn has_accessible_name(el: ElementRef<'_>) -> bool {
    attr_nonempty(el, "aria-label")
        || attr_nonempty(el, "aria-labelledby")
        || attr_nonempty(el, "title")
        || !text_of(el).is_empty()
        || el
            .select(&IMG_ALT)
            .any(|img| attr_nonempty(img, "alt"))
}

fn image_alt(doc: &Html) -> Vec<ViolationNode> {
    doc.select(&IMG)
        .filter(|img| {
            let role = img.value().attr("role").unwrap_or_default();
            img.value().attr("alt").is_none()
                && role != "presentation"
                && role != "none"
                && !attr_nonempty(*img, "aria-label")
                && !attr_nonempty(*img, "aria-labelledby")
        })
        .map(|img| ViolationNode::from_element(img).with_summary("Element has no alt attribute"))
        .collect()
}

fn html_has_lang(doc: &Html) -> Vec<ViolationNode> {
    doc.select(&HTML)
        .filter(|html| !attr_nonempty(*html, "lang"))
        .map(|html| {
            ViolationNode::from_element(html)
                .with_summary("The <html> element does not have a lang attribute")
        })
        .collect()
}

fn control_labels(doc: &Html) -> Vec<ViolationNode> {
    let labelled_ids: Vec<&str> = doc
        .select(&LABELS)
        .filter_map(|l| l.value().attr("for"))
        .collect();

    doc.select(&CONTROLS)
        .filter(|el| {
            let input_type = el
                .value()
                .attr("type")
                .unwrap_or("text")
                .to_ascii_lowercase();
            if el.value().name() == "input" && UNLABELLED_INPUT_TYPES.contains(&input_type.as_str()) {
                return false;
            }
            let by_for = el
                .value()
                .attr("id")
                .is_some_and(|id| labelled_ids.contains(&id));
            let wrapped = el
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| a.value().name() == "label");
            !(by_for
                || wrapped
                || attr_nonempty(*el, "aria-label")
                || attr_nonempty(*el, "aria-labelledby")
                || attr_nonempty(*el, "title"))
        })
        .map(|el| ViolationNode::from_element(el).with_summary("Form element does not have an implicit or explicit label"))
        .collect()
}

fn button_names(doc: &Html) -> Vec<ViolationNode> {
    doc.select(&BUTTONS)
        .filter(|el| {
            if el.value().name() == "input" {
                return !attr_nonempty(*el, "value")
                    && !attr_nonempty(*el, "aria-label")
                    && !attr_nonempty(*el, "title");
            }
            !has_accessible_name(*el)
        })
        .map(|el| ViolationNode::from_element(el).with_summary("Element does not have inner text that is visible to screen readers"))
        .collect()
}

fn link_names(doc: &Html) -> Vec<ViolationNode> {
    doc.select(&LINKS)
        .filter(|el| !has_accessible_name(*el))
        .map(|el| ViolationNode::from_element(el).with_summary("Element is in tab order and does not have accessible text"))
        .collect()
}

fn document_title(doc: &Html) -> Vec<ViolationNode> {
    let has_title = doc.select(&TITLE).any(|t| !text_of(t).is_empty());
    if has_title {
        return Vec::new();
    }
    vec![ViolationNode::from_element(doc.root_element())
        .with_summary("Document does not have a non-empty <title> element")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::{check_markup, normalize};
    use crate::severity::Severity;

    fn ids(html: &str) -> Vec<String> {
        check_markup(RULES, html, WcagLevel::AA)
            .into_iter()
            .map(|v| v.id)
            .collect()
    }

    #[test]
    fn test_clean_page_has_no_violations() {
        let html = r#"<!DOCTYPE html><html lang="en"><head><title>Home</title></head><body>
            <img src="a.png" alt="A resident smiling">
            <label for="name">Name</label><input id="name" type="text">
            <button>Save</button><a href="/about">About us</a>
            </body></html>"#;
        assert!(ids(html).is_empty());
    }

    #[test]
    fn test_detects_each_markup_defect() {
        let html = r#"<html><head></head><body>
            <img src="a.png">
            <input type="email">
            <button></button>
            <a href="/x"><img src="icon.png" alt=""></a>
            </body></html>"#;
        let found = ids(html);
        for id in ["image-alt", "html-has-lang", "label", "button-name", "link-name", "document-title"] {
            assert!(found.iter().any(|f| f == id), "missing {}", id);
        }
    }

    #[test]
    fn test_decorative_and_wrapped_cases_pass() {
        let html = r#"<html lang="en"><head><title>T</title></head><body>
            <img src="line.png" role="presentation">
            <label>Email <input type="email"></label>
            <input type="hidden" name="csrf">
            <input type="submit" value="Send">
            <button aria-label="Close"></button>
            <a href="/home"><img src="logo.png" alt="Home"></a>
            </body></html>"#;
        assert!(ids(html).is_empty());
    }

    #[test]
    fn test_impact_labels_normalize_directly() {
        let html = r#"<html lang="en"><head><title>T</title></head><body><img src="a.png"></body></html>"#;
        let issues = normalize("markup-rules", SeverityScale::Impact, check_markup(RULES, html, WcagLevel::A));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity(), Severity::Critical);
        assert_eq!(issues[0].kind, "image-alt");
        assert_eq!(issues[0].element.as_deref(), Some(r#"<img src="a.png">"#));
    }
}
