// SPDX-License-Identifier: PMPL-1.0-or-later
//! Color contrast analyzer - WCAG 1.4.3 Contrast (Minimum), 1.4.6 Contrast (Enhanced)
//!
//! Reads the rendered foreground/background of visible text and evaluates
//! each unique color pair once using the WCAG luminance algorithm.
//! - AA: 4.5:1 for normal text, 3:1 for large text
//! - AAA: 7:1 for normal text, 4.5:1 for large text
//!
//! Large text is at least 18pt, or 14pt when bold.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;

use crate::analyzers::{Analyzer, AuditContext};
use crate::color::{contrast_ratio, parse_color, to_css, to_hex, Rgb};
use crate::error::Result;
use crate::model::{Issue, WcagLevel};
use crate::page::probes::{self, TextStyle};
use crate::page::{evaluate_as, PageHandle};
use crate::severity::Severity;

pub const TOOL: &str = "contrast-checker";

/// Per-channel adjustment applied on each fix attempt
const FIX_STEP: u8 = 50;

/// Last-resort pair offered when no adjustment passes
const FALLBACK_TEXT: Rgb = (0x1F, 0x29, 0x37);
const FALLBACK_BACKGROUND: Rgb = (0xFF, 0xFF, 0xFF);

/// A suggested color change that meets the required ratio
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorFix {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_background_color: Option<String>,
    pub new_ratio: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContrastSummary {
    /// Unique color pairs evaluated
    pub total_checked: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ContrastReport {
    pub issues: Vec<Issue>,
    pub summary: ContrastSummary,
}

/// Contrast analyzer over rendered text
pub struct ContrastAnalyzer;

impl ContrastAnalyzer {
    /// Check visible text within `scope` (all of `body` when `None`)
    pub async fn check(
        &self,
        page: &dyn PageHandle,
        level: WcagLevel,
        scope: Option<&str>,
    ) -> Result<ContrastReport> {
        let args = match scope {
            Some(selector) => json!({ "selector": selector }),
            None => json!({}),
        };
        let styles: Vec<TextStyle> = evaluate_as(page, &probes::TEXT_STYLES, args).await?;
        Ok(evaluate_styles(&styles, level))
    }
}

#[async_trait]
impl Analyzer for ContrastAnalyzer {
    fn name(&self) -> &str {
        TOOL
    }

    async fn analyze(&self, page: &dyn PageHandle, ctx: &AuditContext) -> Result<Vec<Issue>> {
        Ok(self.check(page, ctx.wcag_level, None).await?.issues)
    }
}

/// Whether text counts as large: >= 18pt, or >= 14pt at weight 700+
pub fn is_large_text(font_size_px: f64, font_weight: u16) -> bool {
    let points = font_size_px * 0.75;
    points >= 18.0 || (points >= 14.0 && font_weight >= 700)
}

/// Minimum ratio for the level and text size
pub fn required_ratio(level: WcagLevel, large: bool) -> f64 {
    match (level, large) {
        (WcagLevel::AAA, false) => 7.0,
        (WcagLevel::AAA, true) => 4.5,
        (_, false) => 4.5,
        (_, true) => 3.0,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn shift(rgb: Rgb, darker: bool) -> Rgb {
    let step = |c: u8| {
        if darker {
            c.saturating_sub(FIX_STEP)
        } else {
            c.saturating_add(FIX_STEP)
        }
    };
    (step(rgb.0), step(rgb.1), step(rgb.2))
}

/// Darken the text step by step, else lighten the background step by
/// step, else fall back to a known high-contrast pair
pub fn suggest_fix(fg: Rgb, bg: Rgb, required: f64) -> ColorFix {
    let mut text = fg;
    while text != (0, 0, 0) {
        text = shift(text, true);
        let ratio = contrast_ratio(text, bg);
        if ratio >= required {
            return ColorFix {
                method: "Darken text color".to_string(),
                new_text_color: Some(to_css(text)),
                new_background_color: None,
                new_ratio: round2(ratio),
            };
        }
    }

    let mut background = bg;
    while background != (255, 255, 255) {
        background = shift(background, false);
        let ratio = contrast_ratio(fg, background);
        if ratio >= required {
            return ColorFix {
                method: "Lighten background color".to_string(),
                new_text_color: None,
                new_background_color: Some(to_css(background)),
                new_ratio: round2(ratio),
            };
        }
    }

    ColorFix {
        method: "Use high contrast colors".to_string(),
        new_text_color: Some(to_hex(FALLBACK_TEXT)),
        new_background_color: Some(to_hex(FALLBACK_BACKGROUND)),
        new_ratio: round2(contrast_ratio(FALLBACK_TEXT, FALLBACK_BACKGROUND)),
    }
}

/// Evaluate probe results; each (foreground, background) pair is checked
/// once, first occurrence wins
pub fn evaluate_styles(styles: &[TextStyle], level: WcagLevel) -> ContrastReport {
    let mut checked: HashSet<(&str, &str)> = HashSet::new();
    let mut issues = Vec::new();

    for style in styles {
        if !checked.insert((style.color.as_str(), style.background_color.as_str())) {
            continue;
        }
        let (Some(fg), Some(bg)) = (parse_color(&style.color), parse_color(&style.background_color)) else {
            tracing::trace!("Unparseable colors {} / {}", style.color, style.background_color);
            continue;
        };

        let ratio = contrast_ratio(fg, bg);
        let large = is_large_text(style.font_size, style.font_weight);
        let required = required_ratio(level, large);
        if ratio >= required {
            continue;
        }

        let severity = if ratio < 3.0 {
            Severity::Critical
        } else {
            Severity::Serious
        };
        let mut wcag = vec!["1.4.3"];
        if level == WcagLevel::AAA {
            wcag.push("1.4.6");
        }

        let mut issue = Issue::new(
            TOOL,
            "insufficient-contrast",
            severity,
            &format!(
                "Insufficient color contrast {:.2}:1 (requires {:.1}:1)",
                ratio, required
            ),
        )
        .with_wcag(wcag.as_slice())
        .with_element(&style.tag_name)
        .with_evidence("textColor", &style.color)
        .with_evidence("backgroundColor", &style.background_color)
        .with_evidence("actualRatio", round2(ratio))
        .with_evidence("requiredRatio", required)
        .with_evidence("level", level)
        .with_evidence("isLargeText", large)
        .with_evidence("sample", &style.text)
        .with_evidence("fix", suggest_fix(fg, bg, required));
        if !style.selector.is_empty() {
            issue = issue.with_selector(&style.selector);
        }
        issues.push(issue);
    }

    let issues = dedupe_by_pair(issues);
    ContrastReport {
        summary: ContrastSummary {
            total_checked: checked.len(),
            failed: issues.len(),
        },
        issues,
    }
}

fn dedupe_by_pair(issues: Vec<Issue>) -> Vec<Issue> {
    let mut seen = HashSet::new();
    issues
        .into_iter()
        .filter(|issue| {
            let color = |key: &str| {
                issue
                    .evidence
                    .get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            seen.insert((color("textColor"), color("backgroundColor")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::testing::ScriptedPage;
    use crate::page::StaticPage;

    fn style(color: &str, bg: &str, size: f64, weight: u16) -> TextStyle {
        TextStyle {
            color: color.to_string(),
            background_color: bg.to_string(),
            font_size: size,
            font_weight: weight,
            text: "Sample".to_string(),
            tag_name: "p".to_string(),
            selector: "main > p".to_string(),
        }
    }

    #[test]
    fn test_large_text_threshold() {
        assert!(is_large_text(24.0, 400));
        assert!(!is_large_text(23.9, 400));
        assert!(is_large_text(18.67, 700));
        assert!(!is_large_text(18.67, 400));
    }

    #[test]
    fn test_required_ratios() {
        assert_eq!(required_ratio(WcagLevel::AA, false), 4.5);
        assert_eq!(required_ratio(WcagLevel::AA, true), 3.0);
        assert_eq!(required_ratio(WcagLevel::AAA, false), 7.0);
        assert_eq!(required_ratio(WcagLevel::AAA, true), 4.5);
    }

    #[test]
    fn test_failing_pair_is_serious_with_darken_fix() {
        let report = evaluate_styles(&[style("rgb(119, 119, 119)", "rgb(255, 255, 255)", 16.0, 400)], WcagLevel::AA);
        assert_eq!(report.issues.len(), 1);
        let issue = &report.issues[0];
        assert_eq!(issue.severity(), Severity::Serious);
        assert_eq!(issue.wcag_tags, vec!["1.4.3"]);
        assert_eq!(issue.evidence["fix"]["method"], "Darken text color");
        assert_eq!(issue.evidence["fix"]["newTextColor"], "rgb(69, 69, 69)");
        assert_eq!(issue.evidence["requiredRatio"], 4.5);
    }

    #[test]
    fn test_very_low_ratio_is_critical_and_aaa_tagged() {
        let report = evaluate_styles(&[style("rgb(200, 200, 200)", "rgb(255, 255, 255)", 16.0, 400)], WcagLevel::AAA);
        assert_eq!(report.issues[0].severity(), Severity::Critical);
        assert_eq!(report.issues[0].wcag_tags, vec!["1.4.3", "1.4.6"]);
    }

    #[test]
    fn test_large_text_passes_at_three_to_one() {
        // #777 on white is ~4.48: fails normal text, passes large text
        let report = evaluate_styles(&[style("rgb(119, 119, 119)", "rgb(255, 255, 255)", 24.0, 400)], WcagLevel::AA);
        assert!(report.issues.is_empty());
        assert_eq!(report.summary.total_checked, 1);
    }

    #[test]
    fn test_pairs_are_checked_once() {
        let styles = vec![
            style("rgb(119, 119, 119)", "rgb(255, 255, 255)", 16.0, 400),
            style("rgb(119, 119, 119)", "rgb(255, 255, 255)", 12.0, 400),
            style("rgb(0, 0, 0)", "rgb(255, 255, 255)", 16.0, 400),
        ];
        let report = evaluate_styles(&styles, WcagLevel::AA);
        assert_eq!(report.summary, ContrastSummary { total_checked: 2, failed: 1 });
    }

    #[test]
    fn test_fix_falls_back_when_no_step_passes() {
        let fix = suggest_fix((200, 200, 200), (120, 120, 120), 7.0);
        assert_eq!(fix.method, "Use high contrast colors");
        assert_eq!(fix.new_text_color.as_deref(), Some("#1F2937"));
        assert!(fix.new_ratio > 14.0);
    }

    #[test]
    fn test_fix_lightens_background_when_text_is_black() {
        let fix = suggest_fix((0, 0, 0), (60, 60, 60), 4.5);
        assert_eq!(fix.method, "Lighten background color");
        assert!(fix.new_ratio >= 4.5);
    }

    #[tokio::test]
    async fn test_check_reads_text_styles_probe() {
        let page = ScriptedPage::default().with(
            "text-styles",
            serde_json::to_value(vec![style("rgb(170, 170, 170)", "rgb(255, 255, 255)", 16.0, 400)]).unwrap(),
        );
        let report = ContrastAnalyzer.check(&page, WcagLevel::AA, None).await.unwrap();
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.issues[0].tool, TOOL);
        assert_eq!(report.issues[0].selector.as_deref(), Some("main > p"));
    }

    #[tokio::test]
    async fn test_scoped_check_covers_nested_text() {
        let page = StaticPage::new(
            "file:///tmp/scoped.html",
            r#"<html><body>
                 <header><p style="color:#dddddd">Banner text outside main</p></header>
                 <main><section><p style="color:#cccccc">Low contrast text inside main</p></section></main>
               </body></html>"#,
        );

        let scoped = ContrastAnalyzer.check(&page, WcagLevel::AA, Some("main")).await.unwrap();
        assert_eq!(scoped.summary, ContrastSummary { total_checked: 1, failed: 1 });
        assert_eq!(scoped.issues[0].evidence["sample"], "Low contrast text inside main");

        let whole = ContrastAnalyzer.check(&page, WcagLevel::AA, None).await.unwrap();
        assert_eq!(whole.summary, ContrastSummary { total_checked: 2, failed: 2 });
    }

    #[tokio::test]
    async fn test_scope_without_matches_checks_nothing() {
        let page = StaticPage::new(
            "file:///tmp/scoped.html",
            r#"<html><body><p style="color:#cccccc">Outside</p></body></html>"#,
        );
        let report = ContrastAnalyzer.check(&page, WcagLevel::AA, Some("aside")).await.unwrap();
        assert_eq!(report.summary.total_checked, 0);
    }
}
