//! A small CSS cascade: stylesheet parsing, selector matching, and the
//! computed values the contrast analyzer reads back.
//!
//! Only what contrast analysis needs is computed: `display`, `color`,
//! `background-color` (including the colour of the `background` shorthand),
//! `font-size` and `font-weight`. At-rule blocks (`@media`, `@font-face`, ...)
//! are skipped. Selectors are parsed and matched by `scraper`; entries it
//! rejects (pseudo-elements, `:hover` and other dynamic states) are dropped
//! from their rule.

use crate::color::Rgba;
use scraper::{ElementRef, Selector};

/// Default stylesheet applied beneath author styles
pub const USER_AGENT_CSS: &str = r#"
head, script, style, title, meta, link, noscript, template, base { display: none }
h1 { font-size: 2em; font-weight: bold }
h2 { font-size: 1.5em; font-weight: bold }
h3 { font-size: 1.17em; font-weight: bold }
h4 { font-weight: bold }
h5 { font-size: 0.83em; font-weight: bold }
h6 { font-size: 0.67em; font-weight: bold }
b, strong, th { font-weight: bold }
small { font-size: smaller }
a { color: #0000ee }
mark { background-color: yellow; color: black }
"#;

pub const DEFAULT_FONT_SIZE: f64 = 16.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
    pub important: bool,
}

/// Parse the body of a rule or an inline `style` attribute
pub fn parse_declarations(block: &str) -> Vec<Declaration> {
    split_top_level_by(block, |c| c == ';')
        .into_iter()
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let mut value = value.trim().to_string();
            let bang = value.rfind('!');
            let important = match bang {
                Some(pos) if value[pos + 1..].trim().eq_ignore_ascii_case("important") => {
                    value.truncate(pos);
                    value = value.trim().to_string();
                    true
                }
                _ => false,
            };
            if name.is_empty() || value.is_empty() {
                return None;
            }
            Some(Declaration { name, value, important })
        })
        .collect()
}

/// Split `value` on characters matching `is_sep`, ignoring any that sit
/// inside parentheses, brackets or quoted strings.
fn split_top_level_by(value: &str, is_sep: impl Fn(char) -> bool) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            c if depth <= 0 && is_sep(c) => {
                out.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(&value[start..]);
    out
}

/// Packed `(ids, classes and attributes, types)` as reported by `selectors`
pub type Specificity = u32;

/// One entry of a selector list, kept with its specificity
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSelector {
    pub selector: Selector,
    pub specificity: Specificity,
}

impl RuleSelector {
    /// Parse one complex selector; `None` when `scraper` rejects it
    /// (pseudo-elements, dynamic pseudo-classes, syntax errors)
    pub fn parse(input: &str) -> Option<RuleSelector> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        let selector = Selector::parse(input).ok()?;
        let specificity = selector.selectors.iter().map(|s| s.specificity()).max()?;
        Some(RuleSelector { selector, specificity })
    }

    pub fn matches(&self, element: &ElementRef) -> bool {
        self.selector.matches(element)
    }
}

/// A style rule with its supported selectors
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub selectors: Vec<RuleSelector>,
    pub declarations: Vec<Declaration>,
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Index of the `}` closing the block opened at `open`
fn matching_brace(css: &str, open: usize) -> usize {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    for (i, b) in css.bytes().enumerate().skip(open) {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }
    css.len()
}

/// Parse a stylesheet into rules, in source order
pub fn parse_stylesheet(css: &str) -> Vec<Rule> {
    let css = strip_comments(css);
    let mut rules = Vec::new();
    let mut pos = 0;

    while let Some(rel) = css[pos..].find('{') {
        let open = pos + rel;
        let close = matching_brace(&css, open);
        // Block-less at-rules (`@import ...;`) end with ';' before the prelude
        let raw_prelude = &css[pos..open];
        let prelude = raw_prelude.rsplit(';').next().unwrap_or("").trim();
        let body = &css[(open + 1).min(close)..close];
        pos = (close + 1).min(css.len());

        if prelude.starts_with('@') {
            log::debug!("skipping at-rule block `{}`", prelude);
            continue;
        }
        let selectors: Vec<RuleSelector> = split_top_level_by(prelude, |c| c == ',')
            .into_iter()
            .filter_map(RuleSelector::parse)
            .collect();
        if selectors.is_empty() {
            log::debug!("skipping rule with unsupported selector `{}`", prelude);
            continue;
        }
        let declarations = parse_declarations(body);
        if !declarations.is_empty() {
            rules.push(Rule { selectors, declarations });
        }
    }
    rules
}

/// Where a declaration came from, lowest precedence first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Origin {
    UserAgent,
    Author,
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Precedence {
    important: bool,
    origin: Origin,
    specificity: Specificity,
    order: usize,
}

/// Declarations applying to `idx`, sorted so that later entries win.
pub fn cascade(
    ua_rules: &[Rule],
    author_rules: &[Rule],
    element: &ElementRef,
    inline_style: Option<&str>,
) -> Vec<Declaration> {
    let inline_decls = inline_style.map(parse_declarations).unwrap_or_default();
    let mut matched: Vec<(Precedence, &Declaration)> = Vec::new();
    let mut order = 0usize;

    for (origin, rules) in [(Origin::UserAgent, ua_rules), (Origin::Author, author_rules)] {
        for rule in rules {
            let best = rule
                .selectors
                .iter()
                .filter(|s| s.matches(element))
                .map(|s| s.specificity)
                .max();
            if let Some(specificity) = best {
                for decl in &rule.declarations {
                    matched.push((
                        Precedence { important: decl.important, origin, specificity, order },
                        decl,
                    ));
                    order += 1;
                }
            }
        }
    }

    for decl in &inline_decls {
        matched.push((
            Precedence {
                important: decl.important,
                origin: Origin::Inline,
                specificity: 0,
                order,
            },
            decl,
        ));
        order += 1;
    }

    matched.sort_by(|a, b| a.0.cmp(&b.0));
    matched.into_iter().map(|(_, d)| d.clone()).collect()
}

/// Computed values for one element
#[derive(Debug, Clone, PartialEq)]
pub struct Computed {
    pub display_none: bool,
    pub color: Rgba,
    pub background: Rgba,
    pub font_size: f64,
    pub font_weight: u32,
}

impl Default for Computed {
    fn default() -> Self {
        Self {
            display_none: false,
            color: Rgba::BLACK,
            background: Rgba::TRANSPARENT,
            font_size: DEFAULT_FONT_SIZE,
            font_weight: 400,
        }
    }
}

impl Computed {
    /// Serialize the font size the way computed styles report it
    pub fn font_size_css(&self) -> String {
        let rounded = (self.font_size * 100.0).round() / 100.0;
        format!("{}px", rounded)
    }
}

/// Resolve computed values from cascaded declarations (sorted ascending).
pub fn compute(decls: &[Declaration], parent: Option<&Computed>, root_font_size: f64) -> Computed {
    let inherited = parent.cloned().unwrap_or_default();
    let mut out = Computed {
        display_none: false,
        color: inherited.color,
        background: Rgba::TRANSPARENT,
        font_size: inherited.font_size,
        font_weight: inherited.font_weight,
    };

    for d in decls {
        let v = d.value.trim().to_ascii_lowercase();
        match d.name.as_str() {
            "display" => out.display_none = v == "none",
            "font-size" => {
                if let Some(px) = parse_font_size(&v, inherited.font_size, root_font_size) {
                    out.font_size = px;
                }
            }
            "font-weight" => {
                if let Some(w) = parse_font_weight(&v, inherited.font_weight) {
                    out.font_weight = w;
                }
            }
            "color" => {
                if v == "inherit" || v == "currentcolor" {
                    out.color = inherited.color;
                } else if v == "initial" {
                    out.color = Rgba::BLACK;
                } else if let Some(c) = parse_css_color(&v, inherited.color) {
                    out.color = c;
                }
            }
            _ => {}
        }
    }

    // Background last: `currentcolor` refers to the final computed colour.
    for d in decls {
        let v = d.value.trim().to_ascii_lowercase();
        match d.name.as_str() {
            "background-color" => match v.as_str() {
                "inherit" => {
                    out.background = parent.map(|p| p.background).unwrap_or(Rgba::TRANSPARENT)
                }
                "initial" => out.background = Rgba::TRANSPARENT,
                _ => {
                    if let Some(c) = parse_css_color(&v, out.color) {
                        out.background = c;
                    }
                }
            },
            "background" => {
                out.background = if v == "inherit" {
                    parent.map(|p| p.background).unwrap_or(Rgba::TRANSPARENT)
                } else {
                    split_top_level(&v)
                        .into_iter()
                        .find_map(|tok| parse_css_color(tok.trim_end_matches(','), out.color))
                        .unwrap_or(Rgba::TRANSPARENT)
                };
            }
            _ => {}
        }
    }
    out
}

/// Whitespace-separated tokens outside parentheses and strings
fn split_top_level(value: &str) -> Vec<&str> {
    split_top_level_by(value, char::is_whitespace)
        .into_iter()
        .filter(|tok| !tok.is_empty())
        .collect()
}

/// Computed font size in px
pub fn parse_font_size(value: &str, parent: f64, root: f64) -> Option<f64> {
    let v = value.trim();
    let keyword = match v {
        "xx-small" => Some(9.0),
        "x-small" => Some(10.0),
        "small" => Some(13.0),
        "medium" | "initial" => Some(DEFAULT_FONT_SIZE),
        "large" => Some(18.0),
        "x-large" => Some(24.0),
        "xx-large" => Some(32.0),
        "xxx-large" => Some(48.0),
        "smaller" => Some(parent / 1.2),
        "larger" => Some(parent * 1.2),
        "inherit" => Some(parent),
        _ => None,
    };
    if keyword.is_some() {
        return keyword;
    }
    let number = |s: &str| s.trim().parse::<f64>().ok().filter(|n| n.is_finite() && *n >= 0.0);
    if let Some(n) = v.strip_suffix("rem") {
        number(n).map(|n| n * root)
    } else if let Some(n) = v.strip_suffix("em") {
        number(n).map(|n| n * parent)
    } else if let Some(n) = v.strip_suffix("px") {
        number(n)
    } else if let Some(n) = v.strip_suffix("pt") {
        number(n).map(|n| n * 4.0 / 3.0)
    } else if let Some(n) = v.strip_suffix('%') {
        number(n).map(|n| parent * n / 100.0)
    } else if v == "0" {
        Some(0.0)
    } else {
        None
    }
}

/// Computed numeric font weight
pub fn parse_font_weight(value: &str, parent: u32) -> Option<u32> {
    match value.trim() {
        "normal" | "initial" => Some(400),
        "bold" => Some(700),
        "inherit" => Some(parent),
        "bolder" => Some(match parent {
            0..=349 => 400,
            350..=549 => 700,
            550..=899 => 900,
            _ => parent,
        }),
        "lighter" => Some(match parent {
            0..=99 => parent,
            100..=549 => 100,
            550..=749 => 400,
            _ => 700,
        }),
        other => other
            .parse::<f64>()
            .ok()
            .filter(|w| (1.0..=1000.0).contains(w))
            .map(|w| w.round() as u32),
    }
}

fn parse_channel(token: &str) -> Option<u8> {
    let value = match token.strip_suffix('%') {
        Some(p) => p.parse::<f64>().ok()? * 255.0 / 100.0,
        None => token.parse::<f64>().ok()?,
    };
    Some(value.round().clamp(0.0, 255.0) as u8)
}

fn parse_alpha(token: &str) -> Option<f64> {
    let value = match token.strip_suffix('%') {
        Some(p) => p.parse::<f64>().ok()? / 100.0,
        None => token.parse::<f64>().ok()?,
    };
    Some(value.clamp(0.0, 1.0))
}

fn function_args<'a>(value: &'a str, names: &[&str]) -> Option<Vec<&'a str>> {
    let open = value.find('(')?;
    let name = value[..open].trim();
    if !names.contains(&name) || !value.ends_with(')') {
        return None;
    }
    Some(
        value[open + 1..value.len() - 1]
            .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let h = h.rem_euclid(360.0) / 360.0;
    let hue = |p: f64, q: f64, mut t: f64| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };
    let (r, g, b) = if s == 0.0 {
        (l, l, l)
    } else {
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        (hue(p, q, h + 1.0 / 3.0), hue(p, q, h), hue(p, q, h - 1.0 / 3.0))
    };
    let to8 = |c: f64| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    (to8(r), to8(g), to8(b))
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|n| n * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba::opaque(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Rgba {
            r: nibble(0)?,
            g: nibble(1)?,
            b: nibble(2)?,
            a: nibble(3)? as f64 / 255.0,
        }),
        6 => Some(Rgba::opaque(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Rgba { r: byte(0)?, g: byte(2)?, b: byte(4)?, a: byte(6)? as f64 / 255.0 }),
        _ => None,
    }
}

/// Parse a specified CSS colour. `current` resolves `currentcolor`.
pub fn parse_css_color(value: &str, current: Rgba) -> Option<Rgba> {
    let v = value.trim().to_ascii_lowercase();
    match v.as_str() {
        "transparent" => return Some(Rgba::TRANSPARENT),
        "currentcolor" => return Some(current),
        _ => {}
    }
    if let Some(hex) = v.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(args) = function_args(&v, &["rgb", "rgba"]) {
        if args.len() != 3 && args.len() != 4 {
            return None;
        }
        let a = match args.get(3) {
            Some(t) => parse_alpha(t)?,
            None => 1.0,
        };
        return Some(Rgba {
            r: parse_channel(args[0])?,
            g: parse_channel(args[1])?,
            b: parse_channel(args[2])?,
            a,
        });
    }
    if let Some(args) = function_args(&v, &["hsl", "hsla"]) {
        if args.len() != 3 && args.len() != 4 {
            return None;
        }
        let h = args[0].trim_end_matches("deg").parse::<f64>().ok()?;
        let s = args[1].strip_suffix('%')?.parse::<f64>().ok()? / 100.0;
        let l = args[2].strip_suffix('%')?.parse::<f64>().ok()? / 100.0;
        let a = match args.get(3) {
            Some(t) => parse_alpha(t)?,
            None => 1.0,
        };
        let (r, g, b) = hsl_to_rgb(h, s.clamp(0.0, 1.0), l.clamp(0.0, 1.0));
        return Some(Rgba { r, g, b, a });
    }
    NAMED_COLORS
        .binary_search_by(|(name, _)| name.cmp(&v.as_str()))
        .ok()
        .map(|i| {
            let hex = NAMED_COLORS[i].1;
            Rgba::opaque((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
        })
}

/// CSS named colours, sorted by name
const NAMED_COLORS: &[(&str, u32)] = &[
    ("aliceblue", 0xf0f8ff), ("antiquewhite", 0xfaebd7), ("aqua", 0x00ffff),
    ("aquamarine", 0x7fffd4), ("azure", 0xf0ffff), ("beige", 0xf5f5dc),
    ("bisque", 0xffe4c4), ("black", 0x000000), ("blanchedalmond", 0xffebcd),
    ("blue", 0x0000ff), ("blueviolet", 0x8a2be2), ("brown", 0xa52a2a),
    ("burlywood", 0xdeb887), ("cadetblue", 0x5f9ea0), ("chartreuse", 0x7fff00),
    ("chocolate", 0xd2691e), ("coral", 0xff7f50), ("cornflowerblue", 0x6495ed),
    ("cornsilk", 0xfff8dc), ("crimson", 0xdc143c), ("cyan", 0x00ffff),
    ("darkblue", 0x00008b), ("darkcyan", 0x008b8b), ("darkgoldenrod", 0xb8860b),
    ("darkgray", 0xa9a9a9), ("darkgreen", 0x006400), ("darkgrey", 0xa9a9a9),
    ("darkkhaki", 0xbdb76b), ("darkmagenta", 0x8b008b), ("darkolivegreen", 0x556b2f),
    ("darkorange", 0xff8c00), ("darkorchid", 0x9932cc), ("darkred", 0x8b0000),
    ("darksalmon", 0xe9967a), ("darkseagreen", 0x8fbc8f), ("darkslateblue", 0x483d8b),
    ("darkslategray", 0x2f4f4f), ("darkslategrey", 0x2f4f4f), ("darkturquoise", 0x00ced1),
    ("darkviolet", 0x9400d3), ("deeppink", 0xff1493), ("deepskyblue", 0x00bfff),
    ("dimgray", 0x696969), ("dimgrey", 0x696969), ("dodgerblue", 0x1e90ff),
    ("firebrick", 0xb22222), ("floralwhite", 0xfffaf0), ("forestgreen", 0x228b22),
    ("fuchsia", 0xff00ff), ("gainsboro", 0xdcdcdc), ("ghostwhite", 0xf8f8ff),
    ("gold", 0xffd700), ("goldenrod", 0xdaa520), ("gray", 0x808080),
    ("green", 0x008000), ("greenyellow", 0xadff2f), ("grey", 0x808080),
    ("honeydew", 0xf0fff0), ("hotpink", 0xff69b4), ("indianred", 0xcd5c5c),
    ("indigo", 0x4b0082), ("ivory", 0xfffff0), ("khaki", 0xf0e68c),
    ("lavender", 0xe6e6fa), ("lavenderblush", 0xfff0f5), ("lawngreen", 0x7cfc00),
    ("lemonchiffon", 0xfffacd), ("lightblue", 0xadd8e6), ("lightcoral", 0xf08080),
    ("lightcyan", 0xe0ffff), ("lightgoldenrodyellow", 0xfafad2), ("lightgray", 0xd3d3d3),
    ("lightgreen", 0x90ee90), ("lightgrey", 0xd3d3d3), ("lightpink", 0xffb6c1),
    ("lightsalmon", 0xffa07a), ("lightseagreen", 0x20b2aa), ("lightskyblue", 0x87cefa),
    ("lightslategray", 0x778899), ("lightslategrey", 0x778899), ("lightsteelblue", 0xb0c4de),
    ("lightyellow", 0xffffe0), ("lime", 0x00ff00), ("limegreen", 0x32cd32),
    ("linen", 0xfaf0e6), ("magenta", 0xff00ff), ("maroon", 0x800000),
    ("mediumaquamarine", 0x66cdaa), ("mediumblue", 0x0000cd), ("mediumorchid", 0xba55d3),
    ("mediumpurple", 0x9370db), ("mediumseagreen", 0x3cb371), ("mediumslateblue", 0x7b68ee),
    ("mediumspringgreen", 0x00fa9a), ("mediumturquoise", 0x48d1cc), ("mediumvioletred", 0xc71585),
    ("midnightblue", 0x191970), ("mintcream", 0xf5fffa), ("mistyrose", 0xffe4e1),
    ("moccasin", 0xffe4b5), ("navajowhite", 0xffdead), ("navy", 0x000080),
    ("oldlace", 0xfdf5e6), ("olive", 0x808000), ("olivedrab", 0x6b8e23),
    ("orange", 0xffa500), ("orangered", 0xff4500), ("orchid", 0xda70d6),
    ("palegoldenrod", 0xeee8aa), ("palegreen", 0x98fb98), ("paleturquoise", 0xafeeee),
    ("palevioletred", 0xdb7093), ("papayawhip", 0xffefd5), ("peachpuff", 0xffdab9),
    ("peru", 0xcd853f), ("pink", 0xffc0cb), ("plum", 0xdda0dd),
    ("powderblue", 0xb0e0e6), ("purple", 0x800080), ("rebeccapurple", 0x663399),
    ("red", 0xff0000), ("rosybrown", 0xbc8f8f), ("royalblue", 0x4169e1),
    ("saddlebrown", 0x8b4513), ("salmon", 0xfa8072), ("sandybrown", 0xf4a460),
    ("seagreen", 0x2e8b57), ("seashell", 0xfff5ee), ("sienna", 0xa0522d),
    ("silver", 0xc0c0c0), ("skyblue", 0x87ceeb), ("slateblue", 0x6a5acd),
    ("slategray", 0x708090), ("slategrey", 0x708090), ("snow", 0xfffafa),
    ("springgreen", 0x00ff7f), ("steelblue", 0x4682b4), ("tan", 0xd2b48c),
    ("teal", 0x008080), ("thistle", 0xd8bfd8), ("tomato", 0xff6347),
    ("turquoise", 0x40e0d0), ("violet", 0xee82ee), ("wheat", 0xf5deb3),
    ("white", 0xffffff), ("whitesmoke", 0xf5f5f5), ("yellow", 0xffff00),
    ("yellowgreen", 0x9acd32),
];

#[cfg(test)]
mod tests {
    use super::*;

    use scraper::Html;

    /// First element in `doc` matching `css`
    fn element<'a>(doc: &'a Html, css: &str) -> ElementRef<'a> {
        doc.select(&Selector::parse(css).unwrap()).next().unwrap()
    }

    fn specificity(ids: u32, classes: u32, types: u32) -> Specificity {
        ids << 20 | classes << 10 | types
    }

    fn color_of(html: &str, css: &str, target: &str) -> Rgba {
        let doc = Html::parse_document(html);
        let decls = cascade(&[], &parse_stylesheet(css), &element(&doc, target), None);
        compute(&decls, None, 16.0).color
    }

    #[test]
    fn named_colour_table_is_sorted() {
        assert!(NAMED_COLORS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn parses_colour_syntaxes() {
        let cur = Rgba::opaque(1, 2, 3);
        assert_eq!(parse_css_color("#fff", cur), Some(Rgba::WHITE));
        assert_eq!(parse_css_color("#212121", cur), Some(Rgba::opaque(33, 33, 33)));
        assert_eq!(parse_css_color("rgb(10, 20, 30)", cur), Some(Rgba::opaque(10, 20, 30)));
        assert_eq!(parse_css_color("rgba(0,0,0,0)", cur), Some(Rgba::TRANSPARENT));
        let half_red = Rgba { r: 255, g: 0, b: 0, a: 0.5 };
        assert_eq!(parse_css_color("rgb(100% 0% 0% / 50%)", cur), Some(half_red));
        assert_eq!(parse_css_color("hsl(0, 0%, 100%)", cur), Some(Rgba::WHITE));
        assert_eq!(parse_css_color("WhiteSmoke", cur), Some(Rgba::opaque(245, 245, 245)));
        assert_eq!(parse_css_color("currentColor", cur), Some(cur));
        assert_eq!(parse_css_color("linear-gradient(red, blue)", cur), None);
        assert_eq!(parse_css_color("#ggg", cur), None);
    }

    #[test]
    fn selector_parsing_and_specificity() {
        let spec = |css: &str| RuleSelector::parse(css).unwrap().specificity;
        assert_eq!(spec("#a .b p"), specificity(1, 1, 1));
        assert_eq!(spec("div.card > h2[data-x=\"1\"]"), specificity(0, 2, 2));
        assert_eq!(spec("li:first-child"), specificity(0, 1, 1));
        assert_eq!(spec("*"), specificity(0, 0, 0));
        assert!(RuleSelector::parse("a:hover").is_none());
        assert!(RuleSelector::parse("p::before").is_none());
        assert!(RuleSelector::parse("div >").is_none());
        assert!(RuleSelector::parse("  ").is_none());
    }

    #[test]
    fn combinators_match_the_tree() {
        let doc = Html::parse_document(
            r#"<div id="hero" class="dark"><section><p class="lead">x</p></section></div>"#,
        );
        let lead = element(&doc, "p");
        let matches = |css: &str| RuleSelector::parse(css).unwrap().matches(&lead);
        assert!(matches("#hero p"));
        assert!(matches(".dark section > .lead"));
        assert!(!matches(".dark > p"));
        assert!(!matches("span p"));
    }

    #[test]
    fn structural_pseudo_classes_apply() {
        let html = r#"<div class="list"><p>First</p><p>Second</p></div>"#;
        let css = ".list p:first-child { color: #eeeeee } p:nth-child(2n) { color: #333 }";
        assert_eq!(color_of(html, css, "p"), Rgba::opaque(238, 238, 238));
        assert_eq!(color_of(html, css, "p + p"), Rgba::opaque(51, 51, 51));
        assert_eq!(color_of(html, ".list p:not(:first-child) { color: red }", "p"), Rgba::BLACK);
    }

    #[test]
    fn sibling_combinators_apply() {
        let html = r#"<h2>Title</h2><p class="a">One</p><p class="b">Two</p>"#;
        assert_eq!(color_of(html, "h2 + p { color: #777 }", ".a"), Rgba::opaque(119, 119, 119));
        assert_eq!(color_of(html, "h2 + p { color: #777 }", ".b"), Rgba::BLACK);
        assert_eq!(color_of(html, "h2 ~ p { color: #777 }", ".b"), Rgba::opaque(119, 119, 119));
    }

    #[test]
    fn attribute_operators_apply() {
        let html = r#"<a href="https://example.com/docs" lang="en-US" class="btn btn-ghost">Docs</a>"#;
        for css in [
            "a[href^=\"https:\"] { color: #aaa }",
            "a[href$=docs] { color: #aaa }",
            "a[href*=\"example\"] { color: #aaa }",
            "a[class~=btn-ghost] { color: #aaa }",
            "a[lang|=en] { color: #aaa }",
        ] {
            assert_eq!(color_of(html, css, "a"), Rgba::opaque(170, 170, 170), "{}", css);
        }
        assert_eq!(color_of(html, "a[href^=\"mailto:\"] { color: #aaa }", "a"), Rgba::BLACK);
    }

    #[test]
    fn semicolons_inside_urls_and_strings_stay_in_the_value() {
        let decls = parse_declarations(
            "background: url(\"data:image/svg+xml;charset=utf8,%3Csvg%3E\") #111111; color: #fff",
        );
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[1].name, "color");
        let c = compute(&decls, None, 16.0);
        assert_eq!(c.background, Rgba::opaque(17, 17, 17));
        assert_eq!(c.color, Rgba::WHITE);

        let decls =
            parse_declarations("background: url(a;b.png) navy; font-family: \"A;B\", serif");
        assert_eq!(decls.len(), 2);
        assert_eq!(compute(&decls, None, 16.0).background, Rgba::opaque(0, 0, 128));

        let rules =
            parse_stylesheet(".hero { background: url('x;}.png') #111 } .hero p { color: #fff }");
        assert_eq!(rules.len(), 2);
        let hero = compute(&rules[0].declarations, None, 16.0);
        assert_eq!(hero.background, Rgba::opaque(17, 17, 17));
    }

    #[test]
    fn stylesheet_skips_at_rules_and_comments() {
        let rules = parse_stylesheet(concat!(
            "@import url(x.css);\n",
            "/* c { color: red } */ p { color: red }\n",
            "@media (max-width: 10px) { p { color: blue } }\n",
            "a:hover { color: green }\n",
            "h1, h2:focus { font-weight: 300 !important }",
        ));
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].declarations[0].value, "red");
        assert_eq!(rules[1].selectors.len(), 1);
        assert!(rules[1].declarations[0].important);
    }

    #[test]
    fn cascade_orders_by_importance_specificity_and_source() {
        let doc = Html::parse_document(r#"<p id="x" class="c">text</p>"#);
        let p = element(&doc, "p");
        let author = parse_stylesheet(
            "#x { color: red } .c { color: blue } p { color: green !important } p { color: black }",
        );
        let decls = cascade(&[], &author, &p, Some("color: white"));
        let computed = compute(&decls, None, 16.0);
        assert_eq!(computed.color, Rgba::opaque(0, 128, 0));

        let author = parse_stylesheet(".c { color: blue } #x { color: red }");
        let decls = cascade(&[], &author, &p, Some("color: white"));
        assert_eq!(compute(&decls, None, 16.0).color, Rgba::WHITE);
    }

    #[test]
    fn computes_inherited_font_metrics() {
        let parent = Computed { font_size: 20.0, font_weight: 400, ..Default::default() };
        let decls = parse_declarations(
            "font-size: 1.5em; font-weight: bolder; background: url(a.png) #333 no-repeat",
        );
        let c = compute(&decls, Some(&parent), 16.0);
        assert_eq!(c.font_size, 30.0);
        assert_eq!(c.font_weight, 700);
        assert_eq!(c.background, Rgba::opaque(51, 51, 51));
        assert_eq!(c.font_size_css(), "30px");

        let decls =
            parse_declarations("font-size: 2rem; background-color: currentcolor; color: red");
        let c = compute(&decls, Some(&parent), 16.0);
        assert_eq!(c.font_size, 32.0);
        assert_eq!(c.background, Rgba::opaque(255, 0, 0));
    }

    #[test]
    fn background_is_not_inherited() {
        let parent = Computed { background: Rgba::BLACK, ..Default::default() };
        let c = compute(&[], Some(&parent), 16.0);
        assert_eq!(c.background, Rgba::TRANSPARENT);
        let decls = parse_declarations("background: linear-gradient(red, blue)");
        let c = compute(&decls, Some(&parent), 16.0);
        assert_eq!(c.background, Rgba::TRANSPARENT);
    }
}
