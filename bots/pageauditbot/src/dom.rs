// SPDX-License-Identifier: PMPL-1.0-or-later
//! Helpers over parsed markup shared by the static page and the rule engines.

use scraper::ElementRef;

/// First `max` characters of `text`
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Trimmed text content of an element and its descendants
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Opening tag with its attributes, e.g. `<img src="a.png">`
pub fn opening_tag(el: ElementRef<'_>) -> String {
    let attrs: String = el
        .value()
        .attrs()
        .map(|(k, v)| format!(" {}=\"{}\"", k, v))
        .collect();
    format!("<{}{}>", el.value().name(), attrs)
}

/// Short structural path used as an issue locator: stops at the nearest
/// ancestor with an id, qualifies by first class or `:nth-of-type`
pub fn css_path(el: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    let mut current = Some(el);
    while let Some(node) = current {
        let tag = node.value().name();
        if tag == "body" || tag == "html" {
            break;
        }
        if let Some(id) = node.value().attr("id").filter(|id| !id.is_empty()) {
            parts.push(format!("{}#{}", tag, id));
            break;
        }
        let mut part = tag.to_string();
        let parent = node.parent().and_then(ElementRef::wrap);
        if let Some(class) = node.value().classes().next() {
            part.push('.');
            part.push_str(class);
        } else if let Some(parent) = parent {
            let same: Vec<_> = parent
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| c.value().name() == tag)
                .collect();
            if same.len() > 1 {
                if let Some(pos) = same.iter().position(|c| c.id() == node.id()) {
                    part.push_str(&format!(":nth-of-type({})", pos + 1));
                }
            }
        }
        parts.push(part);
        current = parent;
    }

    if parts.is_empty() {
        return "body".to_string();
    }
    parts.reverse();
    parts.join(" > ")
}
