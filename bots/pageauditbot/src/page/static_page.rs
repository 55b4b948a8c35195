// SPDX-License-Identifier: PMPL-1.0-or-later
//! Markup-only page automation.
//!
//! [`StaticPage`] answers every probe in [`super::probes`] by parsing the
//! page's HTML with scraper and running the style cascade in
//! [`super::style`]. No script on the page is executed. Keyboard focus is
//! simulated over the tab sequence derived from the markup.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Node, Selector};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::Mutex;

use super::probes::{
    AriaElement, ColorPair, ElementIdentity, EmergencyElement, FocusableElement, FormField,
    HealthText, RecordField, TextSample, TextStyle, TimeLimitDetail, TimeLimitScan,
};
use super::style::StyleSheet;
use super::{Automation, Key, Navigation, PageHandle, Probe};
use crate::color::to_css;
use crate::config::{BrowsersConfig, Config};
use crate::dom::{css_path, text_of, truncate};
use crate::error::{Error, Result};
use crate::model::BrowserTarget;

const FOCUSABLE: &str =
    r#"a[href], button, input, select, textarea, [tabindex]:not([tabindex="-1"])"#;
const NATIVE_CONTROLS: &str = "a[href], button, input, select, textarea";
const MAIN_REGION: &str = r#"main, [role="main"], article, .content, #content"#;
const EMERGENCY_CANDIDATES: &str =
    r#"button, a, div[role="button"], [class*="emergency"], [class*="alert"]"#;
const SMALL_TEXT_CANDIDATES: &str = "p, li, td, span, div, label";
const HEALTH_TEXT_CANDIDATES: &str = "p, li, div, span, td";
const INTERACTIVE: &str = r#"button, a, input, select, textarea, [role="button"], [role="link"]"#;
const NAMED: &str = "[role], [aria-label], [aria-labelledby]";
const EXCLUDED_TEXT_PARENTS: [&str; 6] = ["script", "style", "nav", "header", "footer", "noscript"];

static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));
static FOCUSABLE_SEL: LazyLock<Selector> = LazyLock::new(|| selector(FOCUSABLE));
static NATIVE_SEL: LazyLock<Selector> = LazyLock::new(|| selector(NATIVE_CONTROLS));
static MAIN_SEL: LazyLock<Selector> = LazyLock::new(|| selector(MAIN_REGION));
static SKIP_SEL: LazyLock<Selector> = LazyLock::new(|| selector(r##"a[href^="#"]"##));
static SCRIPT_SEL: LazyLock<Selector> = LazyLock::new(|| selector("script"));
static META_SEL: LazyLock<Selector> = LazyLock::new(|| selector("meta[http-equiv]"));
static EMERGENCY_SEL: LazyLock<Selector> = LazyLock::new(|| selector(EMERGENCY_CANDIDATES));
static SMALL_TEXT_SEL: LazyLock<Selector> = LazyLock::new(|| selector(SMALL_TEXT_CANDIDATES));
static HEALTH_SEL: LazyLock<Selector> = LazyLock::new(|| selector(HEALTH_TEXT_CANDIDATES));
static FIELD_SEL: LazyLock<Selector> = LazyLock::new(|| selector("input, textarea, select"));
static CLASSED_SEL: LazyLock<Selector> = LazyLock::new(|| selector("[class]"));
static INTERACTIVE_SEL: LazyLock<Selector> = LazyLock::new(|| selector(INTERACTIVE));
static NAMED_SEL: LazyLock<Selector> = LazyLock::new(|| selector(NAMED));
static LABEL_SEL: LazyLock<Selector> = LazyLock::new(|| selector("label[for]"));
static IMG_ALT_SEL: LazyLock<Selector> = LazyLock::new(|| selector("img[alt]"));

fn selector(s: &str) -> Selector {
    Selector::parse(s).expect("valid selector")
}

fn parse_selector(probe: &str, s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| Error::Script {
        probe: probe.to_string(),
        message: format!("invalid selector '{}': {:?}", s, e),
    })
}

/// A page loaded from markup
pub struct StaticPage {
    url: String,
    html: String,
    /// Position in the tab sequence; `None` means the document body
    focused: Mutex<Option<usize>>,
    closed: AtomicBool,
}

impl StaticPage {
    pub fn new(url: &str, html: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            html: html.into(),
            focused: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn answer(&self, probe: &Probe, args: &Value, focused: Option<usize>) -> Result<Value> {
        let doc = Html::parse_document(&self.html);
        let sheet = StyleSheet::from_document(&doc);
        let dom = Dom { doc: &doc, sheet: &sheet };

        match probe.name {
            "document-html" => Ok(Value::String(self.html.clone())),
            "text-styles" => {
                let scope = match args.get("selector").and_then(Value::as_str) {
                    Some(s) => parse_selector(probe.name, s)?,
                    None => BODY.clone(),
                };
                to_value(dom.text_styles(&scope))
            }
            "focusable-elements" => to_value(dom.focusable()),
            "active-element" => {
                let active = focused
                    .and_then(|i| dom.tab_sequence().get(i).copied())
                    .or_else(|| doc.select(&BODY).next());
                to_value(active.map(identity).unwrap_or_default())
            }
            "skip-link" => to_value(dom.has_skip_link()),
            "focus-indicators" => to_value(dom.focus_indicators(arg_usize(args, "limit", 10))),
            "main-text" => to_value(dom.main_text()),
            "time-limits" => to_value(dom.time_limits()),
            "emergency-elements" => to_value(dom.emergency_elements(&arg_strings(args, "keywords"))),
            "small-text" => to_value(dom.small_text(
                args.get("maxPx").and_then(Value::as_f64).unwrap_or(14.0),
                arg_usize(args, "limit", 10),
            )),
            "brand-elements" => {
                let marker = args.get("marker").and_then(Value::as_str).unwrap_or("nhs");
                to_value(dom.brand_elements(marker))
            }
            "health-text" => to_value(dom.health_text(&arg_strings(args, "keywords"))),
            "record-fields" => to_value(dom.record_fields(&arg_strings(args, "keywords"))),
            "aria-elements" => {
                let interactive = args
                    .get("interactiveOnly")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                to_value(dom.aria_elements(interactive))
            }
            "form-fields" => {
                let forms = match args.get("formSelector").and_then(Value::as_str) {
                    Some(s) => parse_selector(probe.name, s)?,
                    None => selector("form"),
                };
                to_value(dom.form_fields(&forms))
            }
            other => Err(Error::Script {
                probe: other.to_string(),
                message: "probe not supported by static pages".to_string(),
            }),
        }
    }

    fn tab_len(&self) -> usize {
        let doc = Html::parse_document(&self.html);
        let sheet = StyleSheet::from_document(&doc);
        Dom { doc: &doc, sheet: &sheet }.tab_sequence().len()
    }

    fn tab_position(&self, css: &str) -> Result<Option<usize>> {
        let target = parse_selector("focus", css)?;
        let doc = Html::parse_document(&self.html);
        let sheet = StyleSheet::from_document(&doc);
        let dom = Dom { doc: &doc, sheet: &sheet };
        let Some(el) = doc.select(&target).next() else {
            return Err(Error::Script {
                probe: "focus".to_string(),
                message: format!("no element matches '{}'", css),
            });
        };
        Ok(dom.tab_sequence().iter().position(|e| e.id() == el.id()))
    }

    fn ensure_open(&self, what: &str) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Script {
                probe: what.to_string(),
                message: "page is closed".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PageHandle for StaticPage {
    fn url(&self) -> &str {
        &self.url
    }

    async fn evaluate(&self, probe: &Probe, args: Value) -> Result<Value> {
        self.ensure_open(probe.name)?;
        let focused = *self.focused.lock().await;
        self.answer(probe, &args, focused)
    }

    async fn press_key(&self, key: Key) -> Result<()> {
        self.ensure_open("keyboard")?;
        let len = self.tab_len();
        let mut focused = self.focused.lock().await;
        if len == 0 {
            *focused = None;
            return Ok(());
        }
        // Past either end focus returns to the body, then re-enters the page
        *focused = match (key, *focused) {
            (Key::Tab, None) => Some(0),
            (Key::Tab, Some(i)) => (i + 1 < len).then_some(i + 1),
            (Key::ShiftTab, None) => Some(len - 1),
            (Key::ShiftTab, Some(i)) => i.checked_sub(1),
            (Key::Enter | Key::Escape, current) => current,
        };
        Ok(())
    }

    async fn focus(&self, selector: &str) -> Result<()> {
        self.ensure_open("focus")?;
        let position = self.tab_position(selector)?;
        *self.focused.lock().await = position;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn arg_usize(args: &Value, key: &str, default: usize) -> usize {
    args.get(key)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .unwrap_or(default)
}

fn arg_strings(args: &Value, key: &str) -> Vec<String> {
    args.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_lowercase)
                .collect()
        })
        .unwrap_or_default()
}

fn class_of(el: ElementRef<'_>) -> String {
    el.value().attr("class").unwrap_or_default().to_string()
}

fn identity(el: ElementRef<'_>) -> ElementIdentity {
    ElementIdentity {
        tag_name: el.value().name().to_string(),
        id: el.value().attr("id").unwrap_or_default().to_string(),
        class_name: class_of(el),
        text: truncate(&text_of(el), 30),
    }
}

fn tab_index(el: ElementRef<'_>) -> Option<i32> {
    el.value().attr("tabindex").and_then(|t| t.trim().parse().ok())
}

fn field_type(el: ElementRef<'_>) -> String {
    match el.value().name() {
        "textarea" => "textarea".to_string(),
        "select" => {
            if el.value().attr("multiple").is_some() {
                "select-multiple".to_string()
            } else {
                "select-one".to_string()
            }
        }
        "button" => el.value().attr("type").unwrap_or("submit").to_lowercase(),
        _ => el.value().attr("type").unwrap_or("text").to_lowercase(),
    }
}

/// One parsed document plus its stylesheet
struct Dom<'a> {
    doc: &'a Html,
    sheet: &'a StyleSheet,
}

impl<'a> Dom<'a> {
    fn visible(&self, el: ElementRef<'_>) -> bool {
        self.sheet.computed(el).is_visible()
    }

    fn label_for(&self, scope: ElementRef<'a>, id: &str) -> Option<ElementRef<'a>> {
        if id.is_empty() {
            return None;
        }
        scope
            .select(&LABEL_SEL)
            .find(|l| l.value().attr("for") == Some(id))
    }

    fn document_root(&self) -> ElementRef<'a> {
        self.doc.root_element()
    }

    fn has_label(&self, scope: ElementRef<'a>, el: ElementRef<'_>) -> bool {
        let id = el.value().attr("id").unwrap_or_default();
        self.label_for(scope, id).is_some()
            || el
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| a.value().name() == "label")
    }

    /// Text-bearing elements under every scope match, each visited once
    fn text_styles(&self, scope: &Selector) -> Vec<TextStyle> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let within = self
            .doc
            .select(scope)
            .flat_map(|root| root.descendants().filter_map(ElementRef::wrap));
        for el in within {
            if !seen.insert(el.id()) {
                continue;
            }
            let own: Vec<&str> = el
                .children()
                .filter_map(|c| c.value().as_text().map(|t| t.trim()))
                .filter(|t| !t.is_empty())
                .collect();
            if own.is_empty() {
                continue;
            }
            let style = self.sheet.computed(el);
            if !style.is_visible() {
                continue;
            }
            out.push(TextStyle {
                color: to_css(style.color),
                background_color: to_css(style.background),
                font_size: style.font_size,
                font_weight: style.font_weight,
                text: truncate(&own.join(" "), 50),
                tag_name: el.value().name().to_string(),
                selector: css_path(el),
            });
        }
        out
    }

    fn candidates(&self) -> Vec<ElementRef<'a>> {
        self.doc
            .select(&FOCUSABLE_SEL)
            .filter(|el| !tab_index(*el).is_some_and(|t| t < 0))
            .filter(|el| {
                !(el.value().name() == "input" && field_type(*el) == "hidden")
                    && el.value().attr("disabled").is_none()
            })
            .collect()
    }

    fn focusable(&self) -> Vec<FocusableElement> {
        self.candidates()
            .into_iter()
            .enumerate()
            .map(|(index, el)| {
                let name = el.value().name();
                FocusableElement {
                    index,
                    tag_name: name.to_string(),
                    id: el.value().attr("id").unwrap_or_default().to_string(),
                    class_name: class_of(el),
                    tab_index: tab_index(el).unwrap_or(0),
                    text: truncate(&text_of(el), 30),
                    input_type: matches!(name, "input" | "button" | "select" | "textarea")
                        .then(|| field_type(el)),
                    is_visible: self.visible(el),
                    selector: css_path(el),
                }
            })
            .collect()
    }

    /// Rendered focusables in keyboard order: positive tabindex ascending,
    /// then the rest in document order
    fn tab_sequence(&self) -> Vec<ElementRef<'a>> {
        let rendered: Vec<_> = self
            .candidates()
            .into_iter()
            .filter(|el| self.visible(*el))
            .collect();
        let mut positive: Vec<_> = rendered
            .iter()
            .copied()
            .filter(|el| tab_index(*el).is_some_and(|t| t > 0))
            .collect();
        positive.sort_by_key(|el| tab_index(*el).unwrap_or(0));
        positive.extend(
            rendered
                .into_iter()
                .filter(|el| !tab_index(*el).is_some_and(|t| t > 0)),
        );
        positive
    }

    fn has_skip_link(&self) -> bool {
        self.doc.select(&SKIP_SEL).any(|link| {
            let text = text_of(link).to_lowercase();
            text.contains("skip") || text.contains("jump")
        })
    }

    fn focus_indicators(&self, limit: usize) -> Vec<ElementIdentity> {
        self.doc
            .select(&NATIVE_SEL)
            .take(limit)
            .filter(|el| self.sheet.focus_indicator_missing(*el))
            .map(identity)
            .collect()
    }

    fn main_text(&self) -> String {
        let Some(root) = self
            .doc
            .select(&MAIN_SEL)
            .next()
            .or_else(|| self.doc.select(&BODY).next())
        else {
            return String::new();
        };

        let mut texts = Vec::new();
        for node in root.descendants() {
            let Node::Text(text) = node.value() else {
                continue;
            };
            let excluded = node
                .ancestors()
                .take_while(|a| a.id() != root.id())
                .filter_map(ElementRef::wrap)
                .any(|a| EXCLUDED_TEXT_PARENTS.contains(&a.value().name()));
            let trimmed = text.trim();
            if !excluded && !trimmed.is_empty() {
                texts.push(trimmed.to_string());
            }
        }
        texts.join(" ")
    }

    fn time_limits(&self) -> TimeLimitScan {
        let mut details = Vec::new();
        for script in self.doc.select(&SCRIPT_SEL) {
            let content = script.text().collect::<String>();
            if ["setTimeout", "sessionTimeout", "idleTimeout"]
                .iter()
                .any(|k| content.contains(k))
            {
                details.push(TimeLimitDetail {
                    kind: "script-timeout".to_string(),
                    preview: truncate(content.trim(), 100),
                });
            }
        }
        if let Some(meta) = self.doc.select(&META_SEL).find(|m| {
            m.value()
                .attr("http-equiv")
                .is_some_and(|v| v.eq_ignore_ascii_case("refresh"))
        }) {
            details.push(TimeLimitDetail {
                kind: "meta-refresh".to_string(),
                preview: meta.value().attr("content").unwrap_or_default().to_string(),
            });
        }
        TimeLimitScan {
            found: !details.is_empty(),
            details,
        }
    }

    fn emergency_elements(&self, keywords: &[String]) -> Vec<EmergencyElement> {
        let mut out = Vec::new();
        for el in self.doc.select(&EMERGENCY_SEL) {
            let text = text_of(el);
            let haystacks = [
                text.to_lowercase(),
                class_of(el).to_lowercase(),
                el.value().attr("id").unwrap_or_default().to_lowercase(),
            ];
            if !keywords
                .iter()
                .any(|k| haystacks.iter().any(|h| h.contains(k.as_str())))
            {
                continue;
            }
            let style = self.sheet.computed(el);
            out.push(EmergencyElement {
                text: truncate(&text, 50),
                tag_name: el.value().name().to_string(),
                font_size: style.font_size,
                is_visible: style.is_visible(),
                has_aria_label: el.value().attr("aria-label").is_some(),
                role: el.value().attr("role").map(str::to_string),
                selector: css_path(el),
            });
        }
        out
    }

    fn small_text(&self, max_px: f64, limit: usize) -> Vec<TextSample> {
        let mut out = Vec::new();
        for el in self.doc.select(&SMALL_TEXT_SEL) {
            if out.len() >= limit {
                break;
            }
            let text = text_of(el);
            if text.chars().count() < 10 {
                continue;
            }
            let style = self.sheet.computed(el);
            if style.font_size < max_px {
                out.push(TextSample {
                    tag_name: el.value().name().to_string(),
                    font_size: style.font_size,
                    text: truncate(&text, 50),
                });
            }
        }
        out
    }

    fn brand_elements(&self, marker: &str) -> Vec<ColorPair> {
        let marker = marker.to_lowercase();
        self.doc
            .select(&CLASSED_SEL)
            .filter(|el| class_of(*el).to_lowercase().contains(&marker))
            .map(|el| {
                let style = self.sheet.computed(el);
                ColorPair {
                    color: to_css(style.color),
                    background_color: to_css(style.background),
                }
            })
            .collect()
    }

    fn health_text(&self, keywords: &[String]) -> Vec<HealthText> {
        let mut out = Vec::new();
        for el in self.doc.select(&HEALTH_SEL) {
            let text = text_of(el);
            let lower = text.to_lowercase();
            let Some(keyword) = keywords.iter().find(|k| lower.contains(k.as_str())) else {
                continue;
            };
            let style = self.sheet.computed(el);
            out.push(HealthText {
                text: truncate(&text, 100),
                font_size: style.font_size,
                font_weight: style.font_weight,
                keyword: keyword.clone(),
            });
        }
        out
    }

    fn record_fields(&self, keywords: &[String]) -> Vec<RecordField> {
        let root = self.document_root();
        let mut out = Vec::new();
        for input in self.doc.select(&FIELD_SEL) {
            let id = input.value().attr("id").unwrap_or_default();
            let label = self.label_for(root, id);
            let placeholder = input
                .value()
                .attr("placeholder")
                .unwrap_or_default()
                .to_lowercase();
            let label_text = label.map(text_of).unwrap_or_default().to_lowercase();
            let name = input.value().attr("name").unwrap_or_default().to_lowercase();
            if !keywords.iter().any(|k| {
                placeholder.contains(k.as_str())
                    || label_text.contains(k.as_str())
                    || name.contains(k.as_str())
            }) {
                continue;
            }
            out.push(RecordField {
                field_type: field_type(input),
                name,
                has_label: label.is_some(),
                has_autocomplete: input.value().attr("autocomplete").is_some(),
                placeholder,
                label_text,
            });
        }
        out
    }

    fn aria_elements(&self, interactive_only: bool) -> Vec<AriaElement> {
        let root = self.document_root();
        let sel: &Selector = if interactive_only {
            &INTERACTIVE_SEL
        } else {
            &NAMED_SEL
        };
        self.doc
            .select(sel)
            .map(|el| AriaElement {
                tag_name: el.value().name().to_string(),
                role: el.value().attr("role").map(str::to_string),
                aria_label: el.value().attr("aria-label").map(str::to_string),
                aria_labelledby: el.value().attr("aria-labelledby").map(str::to_string),
                text: text_of(el),
                has_label: self.has_label(root, el),
                alt_text: el
                    .select(&IMG_ALT_SEL)
                    .next()
                    .and_then(|img| img.value().attr("alt"))
                    .map(str::to_string),
                input_type: (el.value().name() == "input").then(|| field_type(el)),
                selector: css_path(el),
            })
            .collect()
    }

    fn form_fields(&self, forms: &Selector) -> Vec<FormField> {
        let mut out = Vec::new();
        for form in self.doc.select(forms) {
            for el in form.select(&FIELD_SEL) {
                out.push(FormField {
                    tag_name: el.value().name().to_string(),
                    field_type: field_type(el),
                    id: el.value().attr("id").unwrap_or_default().to_string(),
                    name: el.value().attr("name").unwrap_or_default().to_string(),
                    has_label: self.has_label(form, el),
                    aria_label: el.value().attr("aria-label").map(str::to_string),
                    aria_labelledby: el.value().attr("aria-labelledby").map(str::to_string),
                    autocomplete: el.value().attr("autocomplete").map(str::to_string),
                    selector: css_path(el),
                });
            }
        }
        out
    }
}

/// Loads pages over HTTP(S) or from the filesystem and serves them as
/// [`StaticPage`]s. One instance is shared by all browser targets.
pub struct StaticAutomation {
    browsers: BrowsersConfig,
    client: reqwest::Client,
}

impl StaticAutomation {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.navigation.timeout_secs))
            .user_agent(config.navigation.user_agent.clone())
            .build()?;
        Ok(Self {
            browsers: config.browsers.clone(),
            client,
        })
    }

    async fn fetch(&self, url: &str) -> std::result::Result<String, String> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| e.to_string())?;
            return response.text().await.map_err(|e| e.to_string());
        }

        let path = url.strip_prefix("file://").unwrap_or(url);
        if url.starts_with("file://") || Path::new(path).exists() {
            return tokio::fs::read_to_string(path)
                .await
                .map_err(|e| format!("{}: {}", path, e));
        }

        Err(format!("unsupported URL: {}", url))
    }
}

#[async_trait]
impl Automation for StaticAutomation {
    fn enabled_targets(&self) -> Vec<BrowserTarget> {
        self.browsers.enabled_targets()
    }

    async fn navigate(&self, url: &str, target: BrowserTarget) -> Result<Navigation> {
        if !self.browsers.is_enabled(target) {
            return Err(Error::BrowserDisabled(target));
        }

        tracing::debug!("Loading {} for {}", url, target);
        match self.fetch(url).await {
            Ok(html) => Ok(Navigation::Loaded(Box::new(StaticPage::new(url, html)))),
            Err(error) => Ok(Navigation::Failed { page: None, error }),
        }
    }
}
