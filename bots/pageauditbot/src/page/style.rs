// SPDX-License-Identifier: PMPL-1.0-or-later
//! A small CSS cascade over static markup.
//!
//! Rules come from `<style>` elements and `style` attributes. Selector
//! matching is delegated to scraper; specificity is estimated from the
//! selector text. Only the properties the probes report are computed.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::color::{first_color_in, parse_color_alpha, to_css, Rgb};

static BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^{}]+)\{([^{}]*)\}").expect("valid regex"));

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));

static FOCUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":focus(?:-visible|-within)?").expect("valid regex"));

static DYNAMIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":(?:hover|active|visited|target)|::").expect("valid regex"));

static STYLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("style").expect("valid selector"));

const OUTLINE_STYLES: [&str; 9] = [
    "auto", "solid", "dotted", "dashed", "double", "groove", "ridge", "inset", "outset",
];

#[derive(Debug, Clone)]
struct Declaration {
    property: String,
    value: String,
    important: bool,
}

struct Rule {
    selector: Selector,
    /// Applies only while the element has focus
    focus: bool,
    specificity: (u32, u32, u32),
    order: usize,
    declarations: Vec<Declaration>,
}

/// All author rules of one document
#[derive(Default)]
pub(crate) struct StyleSheet {
    rules: Vec<Rule>,
}

/// The subset of computed style the probes need
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ComputedStyle {
    pub color: Rgb,
    /// First non-transparent background up the ancestor chain, else white
    pub background: Rgb,
    /// CSS pixels
    pub font_size: f64,
    pub font_weight: u16,
    /// False when the element or an ancestor is `display: none` or `hidden`
    pub rendered: bool,
    pub visibility_visible: bool,
}

impl ComputedStyle {
    fn root() -> Self {
        Self {
            color: (0, 0, 0),
            background: (255, 255, 255),
            font_size: 16.0,
            font_weight: 400,
            rendered: true,
            visibility_visible: true,
        }
    }

    /// Whether a sighted user can see the element
    pub fn is_visible(&self) -> bool {
        self.rendered && self.visibility_visible
    }
}

impl StyleSheet {
    /// Collect the rules of every `<style>` element in the document
    pub fn from_document(doc: &Html) -> Self {
        let mut sheet = Self::default();
        for style in doc.select(&STYLE_SEL) {
            sheet.add_css(&style.text().collect::<String>());
        }
        sheet
    }

    /// Append the rules of a stylesheet
    pub fn add_css(&mut self, css: &str) {
        let css = COMMENT_RE.replace_all(css, "");
        for caps in BLOCK_RE.captures_iter(&css) {
            let declarations = parse_declarations(&caps[2]);
            if declarations.is_empty() {
                continue;
            }
            for raw in caps[1].split(',') {
                let raw = raw.trim();
                if raw.is_empty() || raw.starts_with('@') || DYNAMIC_RE.is_match(raw) {
                    continue;
                }
                let focus = FOCUS_RE.is_match(raw);
                let base = FOCUS_RE.replace_all(raw, "");
                let base = match base.trim() {
                    "" => "*",
                    b => b,
                };
                let Ok(selector) = Selector::parse(base) else {
                    tracing::trace!("Skipping unsupported selector {}", raw);
                    continue;
                };
                self.rules.push(Rule {
                    selector,
                    focus,
                    specificity: specificity(raw),
                    order: self.rules.len(),
                    declarations: declarations.clone(),
                });
            }
        }
    }

    /// Cascaded declarations for one element. With `focus` set only the
    /// focus-state rules are considered.
    fn cascaded(&self, el: ElementRef<'_>, focus: bool) -> HashMap<String, String> {
        let mut ranked: Vec<((bool, bool, (u32, u32, u32), usize), &Declaration)> = Vec::new();
        for rule in self.rules.iter().filter(|r| r.focus == focus) {
            if rule.selector.matches(&el) {
                for decl in &rule.declarations {
                    ranked.push(((decl.important, false, rule.specificity, rule.order), decl));
                }
            }
        }

        let inline = if focus {
            Vec::new()
        } else {
            el.value()
                .attr("style")
                .map(parse_declarations)
                .unwrap_or_default()
        };
        for decl in &inline {
            ranked.push(((decl.important, true, (0, 0, 0), usize::MAX), decl));
        }

        ranked.sort_by(|a, b| a.0.cmp(&b.0));
        ranked
            .into_iter()
            .map(|(_, d)| (d.property.clone(), d.value.clone()))
            .collect()
    }

    /// Computed style of `el`, resolved from the document root down
    pub fn computed(&self, el: ElementRef<'_>) -> ComputedStyle {
        let mut chain: Vec<ElementRef<'_>> = el.ancestors().filter_map(ElementRef::wrap).collect();
        chain.reverse();
        chain.push(el);

        chain
            .into_iter()
            .fold(ComputedStyle::root(), |parent, node| self.derive(&parent, node))
    }

    fn derive(&self, parent: &ComputedStyle, el: ElementRef<'_>) -> ComputedStyle {
        let tag = el.value().name();
        let decl = self.cascaded(el, false);

        let mut font_size = parent.font_size * ua_font_scale(tag);
        if let Some(px) = decl.get("font-size").and_then(|v| parse_font_size(v, parent.font_size)) {
            font_size = px;
        }

        let mut font_weight = if ua_bold(tag) { 700 } else { parent.font_weight };
        if let Some(w) = decl.get("font-weight").and_then(|v| parse_font_weight(v, parent.font_weight)) {
            font_weight = w;
        }

        let mut color = if tag == "a" && el.value().attr("href").is_some() {
            (0, 0, 238)
        } else {
            parent.color
        };
        if let Some((rgb, _)) = decl.get("color").and_then(|v| parse_color_alpha(v)) {
            color = rgb;
        }

        let background = match decl.get("background-color").and_then(|v| parse_color_alpha(v)) {
            Some((rgb, alpha)) if alpha > 0.0 => rgb,
            _ => parent.background,
        };

        let display_none = decl.get("display").is_some_and(|d| d == "none");
        let rendered = parent.rendered
            && !ua_hidden(tag)
            && el.value().attr("hidden").is_none()
            && !display_none;

        let visibility_visible = match decl.get("visibility").map(String::as_str) {
            Some("hidden") | Some("collapse") => false,
            Some("visible") => true,
            _ => parent.visibility_visible,
        };

        ComputedStyle {
            color,
            background,
            font_size,
            font_weight,
            rendered,
            visibility_visible,
        }
    }

    /// True when focusing `el` produces no visible change: the resting or
    /// focus style suppresses the outline and no focus rule supplies an
    /// outline, box-shadow or border instead.
    pub fn focus_indicator_missing(&self, el: ElementRef<'_>) -> bool {
        let rest = self.cascaded(el, false);
        let focus = self.cascaded(el, true);

        if !outline_suppressed(&rest) && !outline_suppressed(&focus) {
            return false;
        }

        let outline = focus.contains_key("outline-style") && !outline_suppressed(&focus);
        let shadow = focus.get("box-shadow").is_some_and(|v| v != "none");
        let border = focus
            .iter()
            .any(|(k, v)| k.starts_with("border") && !is_zero_or_none(v));

        !(outline || shadow || border)
    }
}

fn outline_suppressed(decl: &HashMap<String, String>) -> bool {
    decl.get("outline-style").is_some_and(|v| v == "none")
        || decl.get("outline-width").is_some_and(|v| is_zero_or_none(v))
}

fn is_zero_or_none(value: &str) -> bool {
    matches!(value.trim(), "none" | "0" | "0px" | "hidden")
}

fn parse_declarations(block: &str) -> Vec<Declaration> {
    let mut out = Vec::new();
    for part in block.split(';') {
        let Some((prop, value)) = part.split_once(':') else {
            continue;
        };
        let property = prop.trim().to_ascii_lowercase();
        let mut value = value.trim().to_ascii_lowercase();
        if property.is_empty() || value.is_empty() {
            continue;
        }
        let important = value.ends_with("!important");
        if important {
            value = value.trim_end_matches("!important").trim().to_string();
        }

        match property.as_str() {
            "background" => {
                let color = match first_color_in(&value) {
                    Some((rgb, alpha)) if alpha > 0.0 => to_css(rgb),
                    _ => "transparent".to_string(),
                };
                out.push(Declaration {
                    property: "background-color".into(),
                    value: color,
                    important,
                });
            }
            "outline" => {
                let style = if is_zero_or_none(&value) || value.split_whitespace().any(|t| t == "none") {
                    "none"
                } else {
                    value
                        .split_whitespace()
                        .find(|t| OUTLINE_STYLES.contains(t))
                        .unwrap_or("auto")
                };
                out.push(Declaration {
                    property: "outline-style".into(),
                    value: style.to_string(),
                    important,
                });
            }
            _ => out.push(Declaration {
                property,
                value,
                important,
            }),
        }
    }
    out
}

/// (ids, classes/attributes/pseudo-classes, type selectors)
fn specificity(selector: &str) -> (u32, u32, u32) {
    let mut ids = 0;
    let mut classes = 0;
    let mut types = 0;
    for compound in selector.split(|c: char| c.is_whitespace() || c == '>' || c == '+' || c == '~') {
        if compound.is_empty() {
            continue;
        }
        if compound.starts_with(|c: char| c.is_ascii_alphabetic()) {
            types += 1;
        }
        ids += compound.matches('#').count() as u32;
        classes += (compound.matches('.').count() + compound.matches('[').count() + compound.matches(':').count()) as u32;
    }
    (ids, classes, types)
}

fn ua_font_scale(tag: &str) -> f64 {
    match tag {
        "h1" => 2.0,
        "h2" => 1.5,
        "h3" => 1.17,
        "h5" | "small" | "sub" | "sup" => 0.83,
        "h6" => 0.67,
        _ => 1.0,
    }
}

fn ua_bold(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "b" | "strong" | "th")
}

fn ua_hidden(tag: &str) -> bool {
    matches!(
        tag,
        "head" | "script" | "style" | "template" | "title" | "meta" | "link" | "noscript" | "base"
    )
}

fn parse_font_size(value: &str, parent: f64) -> Option<f64> {
    let value = value.trim();
    let keyword = match value {
        "xx-small" => Some(9.0),
        "x-small" => Some(10.0),
        "small" => Some(13.0),
        "medium" => Some(16.0),
        "large" => Some(18.0),
        "x-large" => Some(24.0),
        "xx-large" => Some(32.0),
        "smaller" => Some(parent / 1.2),
        "larger" => Some(parent * 1.2),
        "inherit" => Some(parent),
        _ => None,
    };
    if keyword.is_some() {
        return keyword;
    }

    let number = |s: &str| s.trim().parse::<f64>().ok();
    if let Some(n) = value.strip_suffix("px") {
        number(n)
    } else if let Some(n) = value.strip_suffix("pt") {
        number(n).map(|v| v * 4.0 / 3.0)
    } else if let Some(n) = value.strip_suffix("rem") {
        number(n).map(|v| v * 16.0)
    } else if let Some(n) = value.strip_suffix("em") {
        number(n).map(|v| v * parent)
    } else if let Some(n) = value.strip_suffix('%') {
        number(n).map(|v| v * parent / 100.0)
    } else {
        None
    }
}

fn parse_font_weight(value: &str, parent: u16) -> Option<u16> {
    match value.trim() {
        "normal" => Some(400),
        "bold" => Some(700),
        "bolder" => Some((parent.max(400) + 300).min(900)),
        "lighter" => Some(if parent > 500 { 400 } else { 100 }),
        "inherit" => Some(parent),
        n => n.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style_of(html: &str, selector: &str) -> ComputedStyle {
        let doc = Html::parse_document(html);
        let sheet = StyleSheet::from_document(&doc);
        let sel = Selector::parse(selector).unwrap();
        let el = doc.select(&sel).next().unwrap();
        sheet.computed(el)
    }

    #[test]
    fn test_defaults_apply_without_styles() {
        let s = style_of("<p>Hello</p>", "p");
        assert_eq!(s.color, (0, 0, 0));
        assert_eq!(s.background, (255, 255, 255));
        assert_eq!(s.font_size, 16.0);
        assert!(s.is_visible());
    }

    #[test]
    fn test_specificity_and_inline_override() {
        let html = r#"<style>p { color: red } #x { color: blue } .c { color: green }</style>
            <p id="x" class="c">a</p><p class="c" style="color: #333">b</p>"#;
        assert_eq!(style_of(html, "#x").color, (0, 0, 255));
        assert_eq!(style_of(html, "p[style]").color, (51, 51, 51));
    }

    #[test]
    fn test_later_rule_wins_on_equal_specificity() {
        let html = "<style>p { color: red } p { color: navy }</style><p>a</p>";
        assert_eq!(style_of(html, "p").color, (0, 0, 128));
    }

    #[test]
    fn test_important_beats_inline() {
        let html = r#"<style>p { color: red !important }</style><p style="color: blue">a</p>"#;
        assert_eq!(style_of(html, "p").color, (255, 0, 0));
    }

    #[test]
    fn test_inheritance_and_relative_sizes() {
        let html = r#"<style>div { font-size: 20px; color: #777 } span { font-size: 0.5em }</style>
            <div><p><span>x</span></p></div>"#;
        let s = style_of(html, "span");
        assert_eq!(s.color, (119, 119, 119));
        assert_eq!(s.font_size, 10.0);
        assert_eq!(style_of("<h1>T</h1>", "h1").font_size, 32.0);
        assert_eq!(style_of("<h1>T</h1>", "h1").font_weight, 700);
        assert!((style_of(r#"<p style="font-size: 18pt">x</p>"#, "p").font_size - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_background_walks_ancestors() {
        let html = r#"<style>.dark { background: #000 url(x.png) }</style>
            <div class="dark"><section><p>x</p></section></div>"#;
        assert_eq!(style_of(html, "p").background, (0, 0, 0));
        let html = r#"<div style="background-color: rgba(0,0,0,0)"><p>x</p></div>"#;
        assert_eq!(style_of(html, "p").background, (255, 255, 255));
    }

    #[test]
    fn test_hidden_content() {
        let html = r#"<style>.gone { display: none }</style>
            <div class="gone"><p id="a">a</p></div><p id="b" hidden>b</p>
            <div style="visibility: hidden"><p id="c">c</p></div><p id="d">d</p>"#;
        assert!(!style_of(html, "#a").is_visible());
        assert!(!style_of(html, "#b").is_visible());
        assert!(!style_of(html, "#c").is_visible());
        assert!(style_of(html, "#d").is_visible());
    }

    #[test]
    fn test_focus_indicator_detection() {
        let html = r#"<style>
            .bare { outline: none }
            .ring { outline: 0 }
            .ring:focus { box-shadow: 0 0 0 3px blue }
            a:focus { outline: none }
            </style>
            <button class="bare">a</button><button class="ring">b</button>
            <button class="plain">c</button><a href="/x">d</a>"#;
        let doc = Html::parse_document(html);
        let sheet = StyleSheet::from_document(&doc);
        let pick = |s: &str| doc.select(&Selector::parse(s).unwrap()).next().unwrap();
        assert!(sheet.focus_indicator_missing(pick(".bare")));
        assert!(!sheet.focus_indicator_missing(pick(".ring")));
        assert!(!sheet.focus_indicator_missing(pick(".plain")));
        assert!(sheet.focus_indicator_missing(pick("a")));
    }

    #[test]
    fn test_specificity_estimate() {
        assert_eq!(specificity("p"), (0, 0, 1));
        assert_eq!(specificity("div.main > p#x"), (1, 1, 2));
        assert_eq!(specificity("input[type=text]:focus"), (0, 2, 1));
    }
}
