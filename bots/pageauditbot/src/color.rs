// SPDX-License-Identifier: PMPL-1.0-or-later
//! CSS color parsing and the WCAG luminance / contrast arithmetic.

use regex::Regex;
use std::sync::LazyLock;

/// An opaque sRGB color
pub type Rgb = (u8, u8, u8);

static RGB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"rgba?\(\s*(\d+(?:\.\d+)?)\s*[, ]\s*(\d+(?:\.\d+)?)\s*[, ]\s*(\d+(?:\.\d+)?)\s*(?:[,/]\s*([\d.]+%?)\s*)?\)")
        .expect("valid regex")
});

static COLOR_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)rgba?\([^)]*\)|#[0-9a-f]{3,8}\b|\b[a-z]+\b").expect("valid regex")
});

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)url\([^)]*\)").expect("valid regex"));

/// Parse a CSS hex color (#rgb, #rgba, #rrggbb, #rrggbbaa) with its alpha
fn parse_hex_color(hex: &str) -> Option<(Rgb, f64)> {
    let hex = hex.trim_start_matches('#');
    let expanded: String = match hex.len() {
        3 | 4 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 | 8 => hex.to_string(),
        _ => return None,
    };
    let channel = |i: usize| u8::from_str_radix(expanded.get(i..i + 2)?, 16).ok();
    let rgb = (channel(0)?, channel(2)?, channel(4)?);
    let alpha = if expanded.len() == 8 {
        f64::from(channel(6)?) / 255.0
    } else {
        1.0
    };
    Some((rgb, alpha))
}

/// Parse an rgb() or rgba() color with its alpha
fn parse_rgb_color(value: &str) -> Option<(Rgb, f64)> {
    let caps = RGB_RE.captures(value)?;
    let channel = |i: usize| -> Option<u8> {
        let v: f64 = caps[i].parse().ok()?;
        Some(v.round().clamp(0.0, 255.0) as u8)
    };
    let alpha = match caps.get(4) {
        Some(a) => {
            let raw = a.as_str();
            match raw.strip_suffix('%') {
                Some(pct) => pct.parse::<f64>().ok()? / 100.0,
                None => raw.parse::<f64>().ok()?,
            }
        }
        None => 1.0,
    };
    Some(((channel(1)?, channel(2)?, channel(3)?), alpha))
}

/// Parse a named CSS color
pub fn parse_named_color(name: &str) -> Option<Rgb> {
    match name {
        "white" => Some((255, 255, 255)),
        "black" => Some((0, 0, 0)),
        "red" => Some((255, 0, 0)),
        "darkred" => Some((139, 0, 0)),
        "green" => Some((0, 128, 0)),
        "darkgreen" => Some((0, 100, 0)),
        "blue" => Some((0, 0, 255)),
        "darkblue" => Some((0, 0, 139)),
        "yellow" => Some((255, 255, 0)),
        "gray" | "grey" => Some((128, 128, 128)),
        "darkgray" | "darkgrey" => Some((169, 169, 169)),
        "lightgray" | "lightgrey" => Some((211, 211, 211)),
        "dimgray" | "dimgrey" => Some((105, 105, 105)),
        "whitesmoke" => Some((245, 245, 245)),
        "gainsboro" => Some((220, 220, 220)),
        "silver" => Some((192, 192, 192)),
        "maroon" => Some((128, 0, 0)),
        "olive" => Some((128, 128, 0)),
        "lime" => Some((0, 255, 0)),
        "aqua" | "cyan" => Some((0, 255, 255)),
        "teal" => Some((0, 128, 128)),
        "navy" => Some((0, 0, 128)),
        "fuchsia" | "magenta" => Some((255, 0, 255)),
        "purple" => Some((128, 0, 128)),
        "orange" => Some((255, 165, 0)),
        "pink" => Some((255, 192, 203)),
        "brown" => Some((165, 42, 42)),
        "beige" => Some((245, 245, 220)),
        "ivory" => Some((255, 255, 240)),
        _ => None,
    }
}

/// Parse any CSS color value together with its alpha channel.
/// `transparent` parses as black with alpha 0.
pub fn parse_color_alpha(value: &str) -> Option<(Rgb, f64)> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.starts_with('#') {
        parse_hex_color(&trimmed)
    } else if trimmed.starts_with("rgb") {
        parse_rgb_color(&trimmed)
    } else if trimmed == "transparent" {
        Some(((0, 0, 0), 0.0))
    } else {
        parse_named_color(&trimmed).map(|rgb| (rgb, 1.0))
    }
}

/// Parse any CSS color value into (r, g, b), ignoring alpha
pub fn parse_color(value: &str) -> Option<Rgb> {
    parse_color_alpha(value).map(|(rgb, _)| rgb)
}

/// First color token in a shorthand such as `background: #fff url(x.png)`
pub fn first_color_in(value: &str) -> Option<(Rgb, f64)> {
    let without_urls = URL_RE.replace_all(value, " ");
    COLOR_TOKEN_RE
        .find_iter(&without_urls)
        .find_map(|m| parse_color_alpha(m.as_str()))
}

/// Serialize as a browser would report a computed color
pub fn to_css(rgb: Rgb) -> String {
    format!("rgb({}, {}, {})", rgb.0, rgb.1, rgb.2)
}

/// Serialize as uppercase hex
pub fn to_hex(rgb: Rgb) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb.0, rgb.1, rgb.2)
}

/// Calculate relative luminance per WCAG 2.x
/// <https://www.w3.org/TR/WCAG21/#dfn-relative-luminance>
pub fn relative_luminance(rgb: Rgb) -> f64 {
    let srgb = [rgb.0, rgb.1, rgb.2].map(|c| {
        let v = c as f64 / 255.0;
        if v <= 0.03928 {
            v / 12.92
        } else {
            ((v + 0.055) / 1.055).powf(2.4)
        }
    });
    0.2126 * srgb[0] + 0.7152 * srgb[1] + 0.0722 * srgb[2]
}

/// Contrast ratio between two colors, always >= 1.0 and symmetric
pub fn contrast_ratio(fg: Rgb, bg: Rgb) -> f64 {
    let l1 = relative_luminance(fg);
    let l2 = relative_luminance(bg);
    let (lighter, darker) = if l1 > l2 { (l1, l2) } else { (l2, l1) };
    (lighter + 0.05) / (darker + 0.05)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(parse_color("#fff"), Some((255, 255, 255)));
        assert_eq!(parse_color("#1F2937"), Some((31, 41, 55)));
        assert_eq!(parse_color_alpha("#00000000"), Some(((0, 0, 0), 0.0)));
        assert_eq!(parse_color("#12"), None);
    }

    #[test]
    fn test_parse_rgb_forms() {
        assert_eq!(parse_color("rgb(255, 0, 0)"), Some((255, 0, 0)));
        assert_eq!(parse_color_alpha("rgba(0, 0, 0, 0)"), Some(((0, 0, 0), 0.0)));
        let (_, alpha) = parse_color_alpha("rgba(10, 20, 30, 0.5)").unwrap();
        assert!((alpha - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_named_and_transparent() {
        assert_eq!(parse_color("Navy"), Some((0, 0, 128)));
        assert_eq!(parse_color_alpha("transparent").map(|(_, a)| a), Some(0.0));
        assert_eq!(parse_color("notacolor"), None);
    }

    #[test]
    fn test_first_color_in_shorthand() {
        let (rgb, _) = first_color_in("url(bg.png) no-repeat #333").unwrap();
        assert_eq!(rgb, (51, 51, 51));
        let (rgb, _) = first_color_in("rgb(1, 2, 3) fixed").unwrap();
        assert_eq!(rgb, (1, 2, 3));
        assert!(first_color_in("none").is_none());
    }

    #[test]
    fn test_color_names_inside_url_are_ignored() {
        assert!(first_color_in("url(red.png) no-repeat").is_none());
        let (rgb, _) = first_color_in("url('images/white-texture.jpg') navy").unwrap();
        assert_eq!(rgb, (0, 0, 128));
    }

    #[test]
    fn test_black_on_white_is_21() {
        let ratio = contrast_ratio((0, 0, 0), (255, 255, 255));
        assert!((ratio - 21.0).abs() < 0.01);
    }

    #[test]
    fn test_ratio_is_symmetric_and_at_least_one() {
        let a = (119, 119, 119);
        let b = (255, 255, 255);
        assert!((contrast_ratio(a, b) - contrast_ratio(b, a)).abs() < 1e-12);
        assert!((contrast_ratio(a, a) - 1.0).abs() < 1e-12);
        // #777 on white sits just under 4.5
        assert!(contrast_ratio(a, b) < 4.5);
        assert!(contrast_ratio(a, b) > 4.4);
    }

    #[test]
    fn test_serialization() {
        assert_eq!(to_css((1, 2, 3)), "rgb(1, 2, 3)");
        assert_eq!(to_hex((31, 41, 55)), "#1F2937");
    }
}
