// SPDX-License-Identifier: PMPL-1.0-or-later
//! Probe catalogue.
//!
//! Each probe pairs the script a live browser driver evaluates with the
//! typed shape of its result. Scripts are arrow functions taking a single
//! `args` object; results are JSON with camelCase keys.

use serde::{Deserialize, Serialize};

use super::Probe;

/// Shared helper prepended to scripts that report element selectors
macro_rules! css_path_js {
    () => {
        "const cssPath = (el) => { const parts = []; \
         while (el && el.nodeType === 1 && el !== document.body && el !== document.documentElement) { \
           let part = el.tagName.toLowerCase(); \
           if (el.id) { parts.unshift(part + '#' + el.id); break; } \
           const cls = (typeof el.className === 'string' ? el.className.trim().split(/\\s+/)[0] : ''); \
           if (cls) { part += '.' + cls; } \
           else if (el.parentElement) { \
             const same = Array.from(el.parentElement.children).filter(c => c.tagName === el.tagName); \
             if (same.length > 1) part += ':nth-of-type(' + (same.indexOf(el) + 1) + ')'; } \
           parts.unshift(part); el = el.parentElement; } \
         return parts.length ? parts.join(' > ') : 'body'; };\n"
    };
}

/// Helper resolving the first non-transparent background up the tree
macro_rules! effective_bg_js {
    () => {
        "const effectiveBg = (el) => { \
           for (let n = el; n && n.nodeType === 1; n = n.parentElement) { \
             const bg = getComputedStyle(n).backgroundColor; \
             if (bg && bg !== 'transparent' && !/rgba\\([^)]*,\\s*0\\)$/.test(bg)) return bg; } \
           return 'rgb(255, 255, 255)'; };\n"
    };
}

/// Serialized markup of the whole document
pub const DOCUMENT_HTML: Probe = Probe {
    name: "document-html",
    script: "(args) => document.documentElement.outerHTML",
};

/// Computed text/background colors and font metrics of visible text-bearing
/// elements. Args: `{ selector?: string }`; each match and everything inside
/// it is scanned (default scope `body`).
pub const TEXT_STYLES: Probe = Probe {
    name: "text-styles",
    script: concat!(
        "(args) => {\n",
        css_path_js!(),
        effective_bg_js!(),
        "const roots = Array.from(document.querySelectorAll(args.selector || 'body')); \
           const scope = [...new Set(roots.flatMap(root => [root, ...root.querySelectorAll('*')]))]; \
           const out = []; \
           for (const el of scope) { \
             if (el.offsetParent === null && getComputedStyle(el).position !== 'fixed') continue; \
             const own = Array.from(el.childNodes).filter(n => n.nodeType === 3).map(n => n.textContent).join(' ').trim(); \
             if (!own) continue; \
             const cs = getComputedStyle(el); \
             out.push({ color: cs.color, backgroundColor: effectiveBg(el), fontSize: parseFloat(cs.fontSize), \
               fontWeight: parseInt(cs.fontWeight, 10) || 400, text: own.substring(0, 50), \
               tagName: el.tagName.toLowerCase(), selector: cssPath(el) }); } \
           return out; }"
    ),
};

/// Focusable elements in document order
pub const FOCUSABLE_ELEMENTS: Probe = Probe {
    name: "focusable-elements",
    script: concat!(
        "(args) => {\n",
        css_path_js!(),
        "return Array.from(document.querySelectorAll(\
           'a[href], button, input, select, textarea, [tabindex]:not([tabindex=\"-1\"])'))\
           .filter(el => !(el.hasAttribute('tabindex') && el.tabIndex < 0))\
           .map((el, index) => ({ index, tagName: el.tagName.toLowerCase(), id: el.id, \
             className: typeof el.className === 'string' ? el.className : '', tabIndex: el.tabIndex, \
             text: (el.textContent || '').trim().substring(0, 30), type: el.type || null, \
             isVisible: el.offsetParent !== null, selector: cssPath(el) })); }"
    ),
};

/// Identity of `document.activeElement`
pub const ACTIVE_ELEMENT: Probe = Probe {
    name: "active-element",
    script: "(args) => { const a = document.activeElement || document.body; \
             return { tagName: a.tagName.toLowerCase(), id: a.id || '', \
               className: typeof a.className === 'string' ? a.className : '', \
               text: (a.textContent || '').trim().substring(0, 30) }; }",
};

/// Whether an in-page anchor reads as a skip/jump link
pub const SKIP_LINK: Probe = Probe {
    name: "skip-link",
    script: "(args) => Array.from(document.querySelectorAll('a[href^=\"#\"]')).some(link => { \
               const t = (link.textContent || '').toLowerCase(); \
               return t.includes('skip') || t.includes('jump'); })",
};

/// Focus each of the first `limit` focusable controls and report those whose
/// outline, box-shadow and border are unchanged by focus. Args: `{ limit }`.
pub const FOCUS_INDICATORS: Probe = Probe {
    name: "focus-indicators",
    script: "(args) => { \
               const els = Array.from(document.querySelectorAll('a[href], button, input, select, textarea')).slice(0, args.limit || 10); \
               const snap = (el) => { const s = getComputedStyle(el); \
                 return [s.outlineStyle + ' ' + s.outlineWidth + ' ' + s.outlineColor, s.boxShadow, s.borderWidth + ' ' + s.borderStyle + ' ' + s.borderColor]; }; \
               const flagged = []; \
               for (const el of els) { \
                 if (document.activeElement === el) el.blur(); \
                 const rest = snap(el); el.focus(); const focused = snap(el); el.blur(); \
                 const hasOutline = focused[0] !== rest[0] && !focused[0].startsWith('none'); \
                 if (!hasOutline && focused[1] === rest[1] && focused[2] === rest[2]) { \
                   flagged.push({ tagName: el.tagName.toLowerCase(), id: el.id || '', \
                     className: typeof el.className === 'string' ? el.className : '', \
                     text: (el.textContent || '').trim().substring(0, 30) }); } } \
               return flagged; }",
};

/// Visible text of the main content region, script/style/nav/header/footer
/// excluded, joined with single spaces
pub const MAIN_TEXT: Probe = Probe {
    name: "main-text",
    script: "(args) => { \
               const root = document.querySelector('main, [role=\"main\"], article, .content, #content') || document.body; \
               const skip = ['SCRIPT', 'STYLE', 'NAV', 'HEADER', 'FOOTER', 'NOSCRIPT']; \
               const walker = document.createTreeWalker(root, NodeFilter.SHOW_TEXT, { acceptNode: (node) => { \
                 for (let p = node.parentElement; p && p !== root.parentElement; p = p.parentElement) { \
                   if (skip.includes(p.tagName)) return NodeFilter.FILTER_REJECT; } \
                 return node.textContent.trim() ? NodeFilter.FILTER_ACCEPT : NodeFilter.FILTER_REJECT; } }); \
               const texts = []; let n; \
               while ((n = walker.nextNode())) texts.push(n.textContent.trim()); \
               return texts.join(' '); }",
};

/// Inline timeout logic and refresh directives
pub const TIME_LIMITS: Probe = Probe {
    name: "time-limits",
    script: "(args) => { const details = []; \
               for (const s of document.querySelectorAll('script')) { const c = s.textContent || ''; \
                 if (c.includes('setTimeout') || c.includes('sessionTimeout') || c.includes('idleTimeout')) \
                   details.push({ kind: 'script-timeout', preview: c.trim().substring(0, 100) }); } \
               const meta = document.querySelector('meta[http-equiv=\"refresh\" i]'); \
               if (meta) details.push({ kind: 'meta-refresh', preview: meta.getAttribute('content') || '' }); \
               return { found: details.length > 0, details }; }",
};

/// Controls whose text, class or id mention an emergency keyword.
/// Args: `{ keywords: string[] }`.
pub const EMERGENCY_ELEMENTS: Probe = Probe {
    name: "emergency-elements",
    script: concat!(
        "(args) => {\n",
        css_path_js!(),
        "const out = []; \
           for (const el of document.querySelectorAll('button, a, div[role=\"button\"], [class*=\"emergency\"], [class*=\"alert\"]')) { \
             const text = (el.textContent || '').toLowerCase(); \
             const cls = (typeof el.className === 'string' ? el.className : '').toLowerCase(); \
             const id = (el.id || '').toLowerCase(); \
             if (!args.keywords.some(k => text.includes(k) || cls.includes(k) || id.includes(k))) continue; \
             const cs = getComputedStyle(el); \
             out.push({ text: (el.textContent || '').trim().substring(0, 50), tagName: el.tagName.toLowerCase(), \
               fontSize: parseFloat(cs.fontSize), isVisible: el.offsetParent !== null, \
               hasAriaLabel: el.hasAttribute('aria-label'), role: el.getAttribute('role'), selector: cssPath(el) }); } \
           return out; }"
    ),
};

/// Text blocks rendered below `maxPx`. Args: `{ maxPx, limit }`.
pub const SMALL_TEXT: Probe = Probe {
    name: "small-text",
    script: "(args) => { const out = []; \
               for (const el of document.querySelectorAll('p, li, td, span, div, label')) { \
                 const text = (el.textContent || '').trim(); if (text.length < 10) continue; \
                 const size = parseFloat(getComputedStyle(el).fontSize); \
                 if (size < args.maxPx) out.push({ tagName: el.tagName.toLowerCase(), fontSize: size, text: text.substring(0, 50) }); \
                 if (out.length >= args.limit) break; } \
               return out; }",
};

/// Colors of elements carrying the brand class marker. Args: `{ marker }`.
pub const BRAND_ELEMENTS: Probe = Probe {
    name: "brand-elements",
    script: "(args) => Array.from(document.querySelectorAll('[class]')) \
               .filter(el => typeof el.className === 'string' && el.className.toLowerCase().includes(args.marker.toLowerCase())) \
               .map(el => { const cs = getComputedStyle(el); return { color: cs.color, backgroundColor: cs.backgroundColor }; })",
};

/// Text blocks mentioning a health keyword. Args: `{ keywords: string[] }`.
pub const HEALTH_TEXT: Probe = Probe {
    name: "health-text",
    script: "(args) => { const out = []; \
               for (const el of document.querySelectorAll('p, li, div, span, td')) { \
                 const text = (el.textContent || '').toLowerCase(); \
                 const keyword = args.keywords.find(k => text.includes(k)); if (!keyword) continue; \
                 const cs = getComputedStyle(el); \
                 out.push({ text: (el.textContent || '').trim().substring(0, 100), fontSize: parseFloat(cs.fontSize), \
                   fontWeight: parseInt(cs.fontWeight, 10) || 400, keyword }); } \
               return out; }",
};

/// Form fields whose label, placeholder or name mention a record-keeping
/// keyword. Args: `{ keywords: string[] }`.
pub const RECORD_FIELDS: Probe = Probe {
    name: "record-fields",
    script: "(args) => { const out = []; \
               for (const input of document.querySelectorAll('input, textarea, select')) { \
                 const label = input.id ? document.querySelector('label[for=\"' + input.id + '\"]') : null; \
                 const placeholder = (input.placeholder || '').toLowerCase(); \
                 const labelText = label ? (label.textContent || '').trim().toLowerCase() : ''; \
                 const name = (input.name || '').toLowerCase(); \
                 if (!args.keywords.some(k => placeholder.includes(k) || labelText.includes(k) || name.includes(k))) continue; \
                 out.push({ type: input.type, name, hasLabel: !!label, hasAutocomplete: input.hasAttribute('autocomplete'), \
                   placeholder, labelText }); } \
               return out; }",
};

/// Elements subject to ARIA naming checks. Args: `{ interactiveOnly }`.
pub const ARIA_ELEMENTS: Probe = Probe {
    name: "aria-elements",
    script: concat!(
        "(args) => {\n",
        css_path_js!(),
        "const sel = args.interactiveOnly \
             ? 'button, a, input, select, textarea, [role=\"button\"], [role=\"link\"]' \
             : '*[role], *[aria-label], *[aria-labelledby]'; \
           return Array.from(document.querySelectorAll(sel)).map(el => ({ \
             tagName: el.tagName.toLowerCase(), role: el.getAttribute('role'), \
             ariaLabel: el.getAttribute('aria-label'), ariaLabelledby: el.getAttribute('aria-labelledby'), \
             text: (el.textContent || '').trim(), \
             hasLabel: !!(el.id && document.querySelector('label[for=\"' + el.id + '\"]')) || !!el.closest('label'), \
             altText: el.querySelector('img[alt]') ? el.querySelector('img[alt]').getAttribute('alt') : null, \
             inputType: el.tagName === 'INPUT' ? (el.type || 'text') : null, \
             selector: cssPath(el) })); }"
    ),
};

/// Fields inside forms. Args: `{ formSelector?: string }` (default `form`).
pub const FORM_FIELDS: Probe = Probe {
    name: "form-fields",
    script: concat!(
        "(args) => {\n",
        css_path_js!(),
        "const out = []; \
           for (const form of document.querySelectorAll(args.formSelector || 'form')) { \
             for (const el of form.querySelectorAll('input, select, textarea')) { \
               out.push({ tagName: el.tagName.toLowerCase(), type: el.type || 'text', id: el.id || '', name: el.name || '', \
                 hasLabel: !!(el.id && form.querySelector('label[for=\"' + el.id + '\"]')) || !!el.closest('label'), \
                 ariaLabel: el.getAttribute('aria-label'), ariaLabelledby: el.getAttribute('aria-labelledby'), \
                 autocomplete: el.getAttribute('autocomplete'), selector: cssPath(el) }); } } \
           return out; }"
    ),
};

/// Rendered text/background colors and font metrics of one element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub color: String,
    pub background_color: String,
    /// CSS pixels
    pub font_size: f64,
    pub font_weight: u16,
    pub text: String,
    pub tag_name: String,
    #[serde(default)]
    pub selector: String,
}

/// A focusable element as enumerated in document order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusableElement {
    pub index: usize,
    pub tag_name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub class_name: String,
    pub tab_index: i32,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type", default)]
    pub input_type: Option<String>,
    pub is_visible: bool,
    #[serde(default)]
    pub selector: String,
}

/// What a keyboard user has focused
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementIdentity {
    pub tag_name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeLimitScan {
    pub found: bool,
    #[serde(default)]
    pub details: Vec<TimeLimitDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeLimitDetail {
    pub kind: String,
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyElement {
    pub text: String,
    pub tag_name: String,
    pub font_size: f64,
    pub is_visible: bool,
    pub has_aria_label: bool,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub selector: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSample {
    pub tag_name: String,
    pub font_size: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorPair {
    pub color: String,
    pub background_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthText {
    pub text: String,
    pub font_size: f64,
    pub font_weight: u16,
    pub keyword: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordField {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub name: String,
    pub has_label: bool,
    pub has_autocomplete: bool,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub label_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AriaElement {
    pub tag_name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub aria_labelledby: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub has_label: bool,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub selector: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub tag_name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub has_label: bool,
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub aria_labelledby: Option<String>,
    #[serde(default)]
    pub autocomplete: Option<String>,
    #[serde(default)]
    pub selector: String,
}
