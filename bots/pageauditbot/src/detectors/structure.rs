// SPDX-License-Identifier: PMPL-1.0-or-later
//! `structure-rules`: the second generic detector, run in full audits.
//!
//! Document structure and operability checks reported with
//! error / warning / notice levels.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;

use super::{run_markup_rules, MarkupRule, RuleEngine, Violation, ViolationNode};
use crate::dom::text_of;
use crate::error::Result;
use crate::model::WcagLevel;
use crate::page::PageHandle;
use crate::severity::SeverityScale;

static WITH_ID: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[id]").expect("valid selector"));
static HEADINGS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").expect("valid selector"));
static TABINDEX: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[tabindex]").expect("valid selector"));
static ONCLICK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[onclick]").expect("valid selector"));
static TABLES: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").expect("valid selector"));
static ROWS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static HEADER_CELLS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"th, [role="columnheader"], [role="rowheader"]"#).expect("valid selector"));
static LINKS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static IMG_ALT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[alt]").expect("valid selector"));

/// Elements that are keyboard operable without extra attributes
const INTERACTIVE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea", "summary", "option"];

/// Link texts that say nothing out of context
const GENERIC_LINK_TEXT: &[&str] = &["click here", "here", "read more", "more", "link", "this"];

const RULES: &[MarkupRule] = &[
    MarkupRule {
        id: "duplicate-id",
        label: "error",
        level: WcagLevel::A,
        tags: &["4.1.1"],
        description: "Duplicate id attribute value found on the page",
        help: "Give every element a unique id; labels and ARIA references resolve to the first match only",
        check: duplicate_ids,
    },
    MarkupRule {
        id: "empty-heading",
        label: "error",
        level: WcagLevel::A,
        tags: &["1.3.1", "2.4.6"],
        description: "Heading element contains no text",
        help: "Add text to the heading or remove it",
        check: empty_headings,
    },
    MarkupRule {
        id: "heading-order",
        label: "warning",
        level: WcagLevel::A,
        tags: &["1.3.1"],
        description: "Heading levels should only increase by one",
        help: "Use the next heading level rather than skipping levels, e.g. h2 after h1",
        check: heading_order,
    },
    MarkupRule {
        id: "positive-tabindex",
        label: "warning",
        level: WcagLevel::A,
        tags: &["2.4.3"],
        description: "Element has a positive tabindex, which overrides the natural tab order",
        help: "Remove the tabindex attribute or use tabindex=\"0\" to follow document order",
        check: positive_tabindex,
    },
    MarkupRule {
        id: "click-without-keyboard",
        label: "error",
        level: WcagLevel::A,
        tags: &["2.1.1"],
        description: "Non-interactive element has a click handler but cannot be reached or operated by keyboard",
        help: "Use a <button>, or add role, tabindex=\"0\" and a key handler",
        check: click_only_handlers,
    },
    MarkupRule {
        id: "table-headers",
        label: "error",
        level: WcagLevel::A,
        tags: &["1.3.1"],
        description: "Data table has no header cells",
        help: "Mark header cells with <th> (and scope) so cells can be related to their headers",
        check: tables_without_headers,
    },
    MarkupRule {
        id: "link-purpose",
        label: "notice",
        level: WcagLevel::AAA,
        tags: &["2.4.9"],
        description: "Link text does not describe the link's purpose on its own",
        help: "Replace generic link text such as \"click here\" with text naming the destination",
        check: generic_link_text,
    },
];

/// Level-scale detector over the serialized document
pub struct StructureRules;

#[async_trait]
impl RuleEngine for StructureRules {
    fn name(&self) -> &str {
        "structure-rules"
    }

    fn scale(&self) -> SeverityScale {
        SeverityScale::Level
    }

    async fn run(&self, page: &dyn PageHandle, level: WcagLevel) -> Result<Vec<Violation>> {
        run_markup_rules(RULES, page, level).await
    }
}

fn duplicate_ids(doc: &Html) -> Vec<ViolationNode> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut nodes = Vec::new();
    for el in doc.select(&WITH_ID) {
        let Some(id) = el.value().attr("id").filter(|id| !id.is_empty()) else {
            continue;
        };
        let count = seen.entry(id).or_insert(0);
        *count += 1;
        if *count == 2 {
            nodes.push(
                ViolationNode::from_element(el)
                    .with_summary(format!("Document has multiple elements with id \"{}\"", id)),
            );
        }
    }
    nodes
}

fn heading_level(el: ElementRef<'_>) -> Option<u8> {
    el.value()
        .name()
        .strip_prefix('h')
        .and_then(|n| n.parse::<u8>().ok())
}

fn empty_headings(doc: &Html) -> Vec<ViolationNode> {
    doc.select(&HEADINGS)
        .filter(|h| {
            text_of(*h).is_empty()
                && !h.value().attr("aria-label").is_some_and(|l| !l.trim().is_empty())
                && !h.select(&IMG_ALT).any(|img| img.value().attr("alt").is_some_and(|a| !a.trim().is_empty()))
        })
        .map(ViolationNode::from_element)
        .collect()
}

fn heading_order(doc: &Html) -> Vec<ViolationNode> {
    let mut previous: Option<u8> = None;
    let mut nodes = Vec::new();
    for heading in doc.select(&HEADINGS) {
        let Some(level) = heading_level(heading) else {
            continue;
        };
        if let Some(prev) = previous {
            if level > prev + 1 {
                nodes.push(
                    ViolationNode::from_element(heading)
                        .with_summary(format!("Heading jumps from h{} to h{}", prev, level)),
                );
            }
        }
        previous = Some(level);
    }
    nodes
}

fn positive_tabindex(doc: &Html) -> Vec<ViolationNode> {
    doc.select(&TABINDEX)
        .filter(|el| {
            el.value()
                .attr("tabindex")
                .and_then(|t| t.trim().parse::<i32>().ok())
                .is_some_and(|t| t > 0)
        })
        .map(ViolationNode::from_element)
        .collect()
}

fn click_only_handlers(doc: &Html) -> Vec<ViolationNode> {
    doc.select(&ONCLICK)
        .filter(|el| {
            let attrs = el.value();
            !INTERACTIVE_TAGS.contains(&attrs.name())
                && attrs.attr("role").is_none()
                && attrs.attr("tabindex").is_none()
                && attrs.attr("onkeydown").is_none()
                && attrs.attr("onkeyup").is_none()
                && attrs.attr("onkeypress").is_none()
        })
        .map(ViolationNode::from_element)
        .collect()
}

fn tables_without_headers(doc: &Html) -> Vec<ViolationNode> {
    doc.select(&TABLES)
        .filter(|table| {
            let role = table.value().attr("role").unwrap_or_default();
            role != "presentation"
                && role != "none"
                && table.select(&ROWS).count() > 1
                && table.select(&HEADER_CELLS).next().is_none()
        })
        .map(ViolationNode::from_element)
        .collect()
}

fn generic_link_text(doc: &Html) -> Vec<ViolationNode> {
    doc.select(&LINKS)
        .filter(|a| {
            let text = text_of(*a).to_lowercase();
            a.value().attr("aria-label").is_none() && GENERIC_LINK_TEXT.contains(&text.as_str())
        })
        .map(ViolationNode::from_element)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::{check_markup, normalize};
    use crate::severity::Severity;

    const PAGE: &str = r#"<html lang="en"><head><title>T</title></head><body>
        <h1>Title</h1>
        <h3>Skipped</h3>
        <h2></h2>
        <div id="dup">a</div><span id="dup">b</span>
        <button tabindex="3">Go</button>
        <div onclick="open()">Open</div>
        <div role="button" tabindex="0" onclick="ok()" onkeydown="ok()">Fine</div>
        <table><tr><td>a</td></tr><tr><td>b</td></tr></table>
        <table><tr><th>H</th></tr><tr><td>b</td></tr></table>
        <a href="/more">Click here</a>
        </body></html>"#;

    fn found(level: WcagLevel) -> Vec<Violation> {
        check_markup(RULES, PAGE, level)
    }

    #[test]
    fn test_detects_structure_defects() {
        let violations = found(WcagLevel::AA);
        let ids: Vec<&str> = violations.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "duplicate-id",
                "empty-heading",
                "heading-order",
                "positive-tabindex",
                "click-without-keyboard",
                "table-headers"
            ]
        );
        let order = violations.iter().find(|v| v.id == "heading-order").unwrap();
        assert_eq!(order.nodes.len(), 1);
        assert_eq!(order.nodes[0].failure_summary.as_deref(), Some("Heading jumps from h1 to h3"));
        let click = violations.iter().find(|v| v.id == "click-without-keyboard").unwrap();
        assert_eq!(click.nodes.len(), 1);
    }

    #[test]
    fn test_aaa_adds_link_purpose() {
        let violations = found(WcagLevel::AAA);
        assert!(violations.iter().any(|v| v.id == "link-purpose"));
    }

    #[test]
    fn test_level_labels_map_to_canonical_severity() {
        let issues = normalize("structure-rules", SeverityScale::Level, found(WcagLevel::AAA));
        let dup = issues.iter().find(|i| i.kind == "duplicate-id").unwrap();
        assert_eq!(dup.severity(), Severity::Critical);
        let tab = issues.iter().find(|i| i.kind == "positive-tabindex").unwrap();
        assert_eq!(tab.severity(), Severity::Serious);
        let link = issues.iter().find(|i| i.kind == "link-purpose").unwrap();
        assert_eq!(link.severity(), Severity::Moderate);
    }
}
