//! Computed-colour parsing and WCAG luminance math.
//!
//! Colours reach the analyzer as browser-computed strings (`rgb(r, g, b)` or
//! `rgba(r, g, b, a)`). Channel extraction deliberately stays loose: the first
//! three digit groups are the red, green and blue channels, which is how
//! computed styles are read back from every engine this crate talks to.
//! Hex and named colours are an engine concern (see `markup::style`).

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// sRGB channel threshold below which the linear segment applies
const LINEAR_THRESHOLD: f64 = 0.03928;

fn digit_groups() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("static digit regex"))
}

/// An sRGB colour with straight alpha, as produced by a computed style
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Alpha in `[0, 1]`
    pub a: f64,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::opaque(255, 255, 255);
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);
    pub const TRANSPARENT: Rgba = Rgba { r: 0, g: 0, b: 0, a: 0.0 };

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    /// Serialize the way browsers report computed colours
    pub fn to_css(&self) -> String {
        if self.a >= 1.0 {
            format!("rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            let a = (self.a.clamp(0.0, 1.0) * 1000.0).round() / 1000.0;
            format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, a)
        }
    }

    /// Relative luminance of the colour channels (alpha is ignored)
    pub fn luminance(&self) -> f64 {
        luminance_of([self.r, self.g, self.b])
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

/// Extract the first three digit groups of a computed colour string.
///
/// Returns `None` when fewer than three groups are present. Channel values
/// above 255 are clamped.
pub fn parse_channels(value: &str) -> Option<[u8; 3]> {
    let mut groups = digit_groups().find_iter(value);
    let mut out = [0u8; 3];
    for slot in out.iter_mut() {
        let m = groups.next()?;
        let n: u64 = m.as_str().parse().unwrap_or(u64::MAX);
        *slot = n.min(255) as u8;
    }
    Some(out)
}

/// Alpha component of an `rgb()`/`rgba()` string, if one is present.
fn alpha_component(value: &str) -> Option<f64> {
    let open = value.find('(')?;
    let close = value.rfind(')')?;
    if close <= open {
        return None;
    }
    let parts: Vec<&str> = value[open + 1..close]
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    let raw = parts.get(3)?;
    match raw.strip_suffix('%') {
        Some(pct) => pct.parse::<f64>().ok().map(|p| p / 100.0),
        None => raw.parse::<f64>().ok(),
    }
}

/// Whether a computed background is fully transparent.
///
/// Matches the literal keyword `transparent` and any `rgb()`/`rgba()` value
/// whose alpha component is zero (`rgba(0, 0, 0, 0)` is what browsers report
/// for an unset background).
pub fn is_transparent(value: &str) -> bool {
    let v = value.trim().to_ascii_lowercase();
    if v == "transparent" {
        return true;
    }
    if v.starts_with("rgb") {
        return matches!(alpha_component(&v), Some(a) if a <= 0.0);
    }
    false
}

/// Parse a computed colour string into an [`Rgba`].
pub fn parse_computed(value: &str) -> Option<Rgba> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    if v.eq_ignore_ascii_case("transparent") {
        return Some(Rgba::TRANSPARENT);
    }
    let [r, g, b] = parse_channels(v)?;
    let a = alpha_component(v).map(|a| a.clamp(0.0, 1.0)).unwrap_or(1.0);
    Some(Rgba { r, g, b, a })
}

/// Linearize one sRGB channel already scaled to `[0, 1]`
fn linearize(c: f64) -> f64 {
    if c <= LINEAR_THRESHOLD {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Relative luminance of 8-bit sRGB channels.
/// <https://www.w3.org/TR/WCAG21/#dfn-relative-luminance>
pub fn luminance_of(rgb: [u8; 3]) -> f64 {
    let [r, g, b] = rgb.map(|c| linearize(c as f64 / 255.0));
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

/// Relative luminance of a computed colour string.
///
/// `None` for empty strings, `transparent`, and anything without three
/// numeric channels. No default is substituted.
pub fn relative_luminance(value: &str) -> Option<f64> {
    let v = value.trim();
    if v.is_empty() || v.eq_ignore_ascii_case("transparent") {
        return None;
    }
    parse_channels(v).map(luminance_of)
}

/// Contrast ratio between two luminances. Symmetric and always `>= 1`.
pub fn ratio_from_luminance(l1: f64, l2: f64) -> f64 {
    let lighter = l1.max(l2);
    let darker = l1.min(l2);
    (lighter + 0.05) / (darker + 0.05)
}

/// Contrast ratio between two computed colour strings, if both resolve.
pub fn contrast_ratio(a: &str, b: &str) -> Option<f64> {
    let l1 = relative_luminance(a)?;
    let l2 = relative_luminance(b)?;
    Some(ratio_from_luminance(l1, l2))
}
