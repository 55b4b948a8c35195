// SPDX-License-Identifier: PMPL-1.0-or-later
//! Keyboard flow analyzer - WCAG 2.1.2 No Keyboard Trap, 2.4.1 Bypass Blocks,
//! 2.4.3 Focus Order, 2.4.7 Focus Visible
//!
//! Simulates forward tabbing through the page and records what receives
//! focus at each step:
//! - Focus landing on the same element twice in a row is a trap
//! - Long pages without a skip link
//! - Focusable elements whose focus state is invisible
//! - Tab sequences that jump between unrelated element kinds
//!
//! Each check runs on its own; a failing probe is logged and the rest
//! still report.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;

use crate::analyzers::{Analyzer, AuditContext};
use crate::config::KeyboardConfig;
use crate::error::Result;
use crate::model::Issue;
use crate::page::probes::{self, ElementIdentity, FocusableElement};
use crate::page::{evaluate_as, Key, PageHandle};
use crate::severity::Severity;

pub const TOOL: &str = "keyboard-tester";

/// Pages with more focusable elements than this need a skip link
const SKIP_LINK_THRESHOLD: usize = 20;

/// Tab-order entries kept in the report
const TAB_ORDER_SAMPLE: usize = 20;

/// Elements listed on a focus-indicator issue
const INDICATOR_EXAMPLES: usize = 5;

/// Distinct transitions per step above which the order counts as chaotic
const CHAOS_RATIO: f64 = 0.7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyboardSummary {
    pub total_focusable: usize,
    pub tabs_tested: usize,
    pub has_skip_link: bool,
    pub focus_indicator_issues: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyboardReport {
    pub issues: Vec<Issue>,
    /// The first focus stops, in order
    pub tab_order: Vec<ElementIdentity>,
    pub summary: KeyboardSummary,
}

/// Keyboard-only navigation tester
pub struct KeyboardFlowAnalyzer {
    max_tab_steps: usize,
    focus_sample: usize,
}

impl Default for KeyboardFlowAnalyzer {
    fn default() -> Self {
        Self::new(&KeyboardConfig::default())
    }
}

impl KeyboardFlowAnalyzer {
    pub fn new(config: &KeyboardConfig) -> Self {
        Self {
            max_tab_steps: config.max_tab_steps,
            focus_sample: config.focus_sample,
        }
    }

    /// Walk the tab sequence, optionally starting from `start_selector`
    pub async fn check(
        &self,
        page: &dyn PageHandle,
        start_selector: Option<&str>,
    ) -> Result<KeyboardReport> {
        if let Some(selector) = start_selector {
            page.focus(selector).await?;
        }

        let focusable: Vec<FocusableElement> =
            match evaluate_as(page, &probes::FOCUSABLE_ELEMENTS, json!({})).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!("Could not enumerate focusable elements: {}", e);
                    Vec::new()
                }
            };

        let mut issues = Vec::new();

        let steps = self.max_tab_steps.min(focusable.len());
        let walk = walk_tab_order(page, steps).await;
        issues.extend(walk.trap.clone());

        let has_skip_link = match evaluate_as::<bool>(page, &probes::SKIP_LINK, json!({})).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Skip link check failed: {}", e);
                false
            }
        };
        if let Some(issue) = skip_link_issue(has_skip_link, focusable.len()) {
            issues.push(issue);
        }

        let flagged: Vec<ElementIdentity> = match evaluate_as(
            page,
            &probes::FOCUS_INDICATORS,
            json!({ "limit": self.focus_sample }),
        )
        .await
        {
            Ok(flagged) => flagged,
            Err(e) => {
                tracing::warn!("Focus indicator check failed: {}", e);
                Vec::new()
            }
        };
        if let Some(issue) = focus_indicator_issue(&flagged) {
            issues.push(issue);
        }

        if let Some(issue) = tab_order_issue(&walk.order) {
            issues.push(issue);
        }

        tracing::debug!(
            focusable = focusable.len(),
            tabs = walk.order.len(),
            issues = issues.len(),
            "Keyboard flow tested"
        );

        Ok(KeyboardReport {
            issues,
            summary: KeyboardSummary {
                total_focusable: focusable.len(),
                tabs_tested: walk.order.len(),
                has_skip_link,
                focus_indicator_issues: flagged.len(),
            },
            tab_order: walk.order.into_iter().take(TAB_ORDER_SAMPLE).collect(),
        })
    }
}

#[async_trait]
impl Analyzer for KeyboardFlowAnalyzer {
    fn name(&self) -> &str {
        TOOL
    }

    async fn analyze(&self, page: &dyn PageHandle, _ctx: &AuditContext) -> Result<Vec<Issue>> {
        Ok(self.check(page, None).await?.issues)
    }
}

#[derive(Debug, Default)]
struct TabWalk {
    order: Vec<ElementIdentity>,
    trap: Option<Issue>,
}

/// Press Tab up to `steps` times, stopping early at a trap or a page error.
/// Stops recorded before an error are kept.
async fn walk_tab_order(page: &dyn PageHandle, steps: usize) -> TabWalk {
    let mut walk = TabWalk::default();
    for _ in 0..steps {
        let current = match tab_once(page).await {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(tabs = walk.order.len(), "Tab walk stopped early: {}", e);
                break;
            }
        };

        if walk.order.last().is_some_and(|prev| is_same_stop(prev, &current)) {
            walk.trap = Some(
                Issue::new(
                    TOOL,
                    "focus-trap",
                    Severity::Critical,
                    "Keyboard focus trap detected - users cannot escape",
                )
                .with_wcag(&["2.1.2"])
                .with_element(&current.tag_name)
                .with_evidence("elementId", &current.id)
                .with_suggestion("Make sure Tab and Shift+Tab always move focus out of the component"),
            );
            walk.order.push(current);
            break;
        }
        walk.order.push(current);
    }
    walk
}

async fn tab_once(page: &dyn PageHandle) -> Result<ElementIdentity> {
    page.press_key(Key::Tab).await?;
    evaluate_as(page, &probes::ACTIVE_ELEMENT, json!({})).await
}

/// Two consecutive stops on the same identified element
fn is_same_stop(prev: &ElementIdentity, current: &ElementIdentity) -> bool {
    !current.id.is_empty() && prev == current
}

fn skip_link_issue(has_skip_link: bool, focusable: usize) -> Option<Issue> {
    if has_skip_link || focusable <= SKIP_LINK_THRESHOLD {
        return None;
    }
    Some(
        Issue::new(
            TOOL,
            "missing-skip-link",
            Severity::Moderate,
            "No skip navigation link found - keyboard users must tab through all navigation",
        )
        .with_wcag(&["2.4.1"])
        .with_evidence("focusableCount", focusable)
        .with_suggestion("Add a \"Skip to main content\" link as the first focusable element"),
    )
}

fn focus_indicator_issue(flagged: &[ElementIdentity]) -> Option<Issue> {
    if flagged.is_empty() {
        return None;
    }
    let examples: Vec<&ElementIdentity> = flagged.iter().take(INDICATOR_EXAMPLES).collect();
    Some(
        Issue::new(
            TOOL,
            "missing-focus-indicator",
            Severity::Serious,
            &format!("{} elements lack visible focus indicators", flagged.len()),
        )
        .with_wcag(&["2.4.7"])
        .with_evidence("elements", examples)
        .with_suggestion("Add :focus styles with a visible outline or border"),
    )
}

/// Flags a tab sequence whose distinct tag transitions outnumber 70% of its steps
fn tab_order_issue(order: &[ElementIdentity]) -> Option<Issue> {
    let transitions: HashSet<(&str, &str)> = order
        .windows(2)
        .map(|pair| (pair[0].tag_name.as_str(), pair[1].tag_name.as_str()))
        .collect();

    if order.is_empty() || transitions.len() as f64 <= order.len() as f64 * CHAOS_RATIO {
        return None;
    }
    Some(
        Issue::new(
            TOOL,
            "chaotic-tab-order",
            Severity::Moderate,
            "Tab order appears illogical - may confuse keyboard users",
        )
        .with_wcag(&["2.4.3"])
        .with_evidence("distinctTransitions", transitions.len())
        .with_evidence("tabsTested", order.len())
        .with_suggestion("Review tabindex values and DOM order"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::testing::ScriptedPage;
    use crate::page::StaticPage;
    use serde_json::Value;

    fn stop(tag: &str, id: &str) -> ElementIdentity {
        ElementIdentity {
            tag_name: tag.to_string(),
            id: id.to_string(),
            class_name: String::new(),
            text: id.to_string(),
        }
    }

    fn focusables(n: usize) -> Value {
        let items: Vec<FocusableElement> = (0..n)
            .map(|index| FocusableElement {
                index,
                tag_name: "a".to_string(),
                id: format!("link-{}", index),
                class_name: String::new(),
                tab_index: 0,
                text: format!("Link {}", index),
                input_type: None,
                is_visible: true,
                selector: format!("#link-{}", index),
            })
            .collect();
        serde_json::to_value(items).unwrap()
    }

    fn page(n: usize, sequence: Vec<ElementIdentity>) -> ScriptedPage {
        ScriptedPage::default()
            .with("focusable-elements", focusables(n))
            .with("skip-link", json!(true))
            .with("focus-indicators", json!([]))
            .with_focus_sequence(sequence.into_iter().map(|s| serde_json::to_value(s).unwrap()).collect())
    }

    #[tokio::test]
    async fn test_repeated_focus_is_one_trap() {
        let page = page(5, vec![stop("a", "a"), stop("button", "b"), stop("button", "b")]);
        let report = KeyboardFlowAnalyzer::default().check(&page, None).await.unwrap();

        let traps: Vec<&Issue> = report.issues.iter().filter(|i| i.kind == "focus-trap").collect();
        assert_eq!(traps.len(), 1);
        assert_eq!(traps[0].severity(), Severity::Critical);
        assert_eq!(traps[0].evidence["elementId"], "b");
        assert_eq!(page.tab_presses(), 3);
        assert_eq!(report.summary.tabs_tested, 3);
    }

    #[tokio::test]
    async fn test_repeated_anonymous_stop_is_not_a_trap() {
        let page = page(3, vec![stop("div", ""), stop("div", ""), stop("a", "x")]);
        let report = KeyboardFlowAnalyzer::default().check(&page, None).await.unwrap();
        assert!(report.issues.iter().all(|i| i.kind != "focus-trap"));
        assert_eq!(page.tab_presses(), 3);
    }

    #[tokio::test]
    async fn test_steps_bounded_by_config() {
        let config = KeyboardConfig {
            max_tab_steps: 4,
            focus_sample: 10,
        };
        let sequence = (0..10).map(|i| stop("a", &format!("s{}", i))).collect();
        let page = page(10, sequence);
        let report = KeyboardFlowAnalyzer::new(&config).check(&page, None).await.unwrap();
        assert_eq!(page.tab_presses(), 4);
        assert_eq!(report.summary.total_focusable, 10);
    }

    #[tokio::test]
    async fn test_skip_link_required_only_on_long_pages() {
        let short = ScriptedPage::default()
            .with("focusable-elements", focusables(20))
            .with("skip-link", json!(false))
            .with("focus-indicators", json!([]));
        let report = KeyboardFlowAnalyzer::default().check(&short, None).await.unwrap();
        assert!(report.issues.iter().all(|i| i.kind != "missing-skip-link"));

        let long = ScriptedPage::default()
            .with("focusable-elements", focusables(21))
            .with("skip-link", json!(false))
            .with("focus-indicators", json!([]));
        let report = KeyboardFlowAnalyzer::default().check(&long, None).await.unwrap();
        let skip = report.issues.iter().find(|i| i.kind == "missing-skip-link").unwrap();
        assert_eq!(skip.severity(), Severity::Moderate);
        assert_eq!(skip.wcag_tags, vec!["2.4.1"]);
    }

    #[tokio::test]
    async fn test_focus_indicator_issue_lists_five_examples() {
        let flagged: Vec<ElementIdentity> = (0..7).map(|i| stop("button", &format!("b{}", i))).collect();
        let page = page(3, Vec::new()).with("focus-indicators", serde_json::to_value(flagged).unwrap());
        let report = KeyboardFlowAnalyzer::default().check(&page, None).await.unwrap();

        let issue = report.issues.iter().find(|i| i.kind == "missing-focus-indicator").unwrap();
        assert_eq!(issue.severity(), Severity::Serious);
        assert_eq!(issue.evidence["elements"].as_array().unwrap().len(), 5);
        assert_eq!(report.summary.focus_indicator_issues, 7);
    }

    #[tokio::test]
    async fn test_failed_sub_check_does_not_stop_the_rest() {
        let flagged = vec![stop("button", "save")];
        let page = ScriptedPage::default()
            .with("focusable-elements", focusables(25))
            .with("focus-indicators", serde_json::to_value(flagged).unwrap())
            .failing_on("skip-link");
        let report = KeyboardFlowAnalyzer::default().check(&page, None).await.unwrap();
        assert!(!report.summary.has_skip_link);
        assert!(report.issues.iter().any(|i| i.kind == "missing-focus-indicator"));
    }

    #[tokio::test]
    async fn test_walk_keeps_stops_before_page_error() {
        let tags = ["a", "button", "input", "select", "textarea"];
        let sequence = tags.iter().enumerate().map(|(i, t)| stop(t, &format!("f{}", i))).collect();
        let page = page(8, sequence).failing_after_tabs(5);
        let report = KeyboardFlowAnalyzer::default().check(&page, None).await.unwrap();

        assert_eq!(page.tab_presses(), 6);
        assert_eq!(report.summary.tabs_tested, 5);
        assert_eq!(report.tab_order.len(), 5);
        assert_eq!(report.tab_order[4].id, "f4");
        assert!(report.issues.iter().any(|i| i.kind == "chaotic-tab-order"));
    }

    #[tokio::test]
    async fn test_walk_starts_after_start_selector() {
        let links: String = (1..=5)
            .map(|i| format!(r#"<a id="l{i}" href="/l{i}">Link {i}</a>"#))
            .collect();
        let page = StaticPage::new(
            "file:///tmp/links.html",
            format!("<html><body><main>{}</main></body></html>", links),
        );
        let report = KeyboardFlowAnalyzer::default().check(&page, Some("#l3")).await.unwrap();

        let ids: Vec<&str> = report.tab_order.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["l4", "l5", "", "l1", "l2"]);
        assert_eq!(report.tab_order[2].tag_name, "body");
        assert!(report.issues.iter().all(|i| i.kind != "focus-trap"));
    }

    #[tokio::test]
    async fn test_unknown_start_selector_is_an_error() {
        let page = StaticPage::new(
            "file:///tmp/links.html",
            r#"<html><body><a id="only" href="/">Home</a></body></html>"#,
        );
        assert!(KeyboardFlowAnalyzer::default().check(&page, Some("#missing")).await.is_err());
    }

    #[test]
    fn test_chaotic_order_threshold() {
        let orderly: Vec<ElementIdentity> = (0..10).map(|i| stop("a", &i.to_string())).collect();
        assert!(tab_order_issue(&orderly).is_none());

        let tags = ["a", "button", "input", "select", "textarea", "summary", "a", "input", "button", "select"];
        let chaotic: Vec<ElementIdentity> = tags.iter().map(|t| stop(t, "")).collect();
        let issue = tab_order_issue(&chaotic).unwrap();
        assert_eq!(issue.kind, "chaotic-tab-order");
        assert_eq!(issue.severity(), Severity::Moderate);
    }
}
