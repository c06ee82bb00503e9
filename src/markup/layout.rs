/// Block layout for the markup backend.
///
/// Every element is a block: children stack vertically inside their parent's
/// content box and an element's own text is wrapped above its children.
/// Glyphs are approximated as half the font size wide, lines as 1.2 times
/// the font size tall.
use crate::dom::Rect;
use crate::Viewport;

pub const GLYPH_WIDTH_EM: f64 = 0.5;
pub const LINE_HEIGHT_EM: f64 = 1.2;

/// Margin the UA stylesheet gives `<body>`
pub const BODY_MARGIN: f64 = 8.0;

/// One element as seen by layout; parents precede children
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockInput {
    pub parent: Option<usize>,
    pub hidden: bool,
    pub margin: f64,
    pub font_size: f64,
    /// Text directly owned by the element (not its descendants)
    pub text: String,
}

/// Number of lines `text` occupies when wrapped to `width` px
pub fn wrapped_lines(text: &str, width: f64, font_size: f64) -> usize {
    let glyph = (font_size * GLYPH_WIDTH_EM).max(f64::EPSILON);
    let chars_per_line = ((width / glyph).floor() as usize).max(1);

    let mut lines = 0usize;
    let mut cur = 0usize;
    for word in text.split_whitespace() {
        let len = word.chars().count();
        if cur > 0 && cur + len + 1 > chars_per_line {
            lines += 1;
            cur = len;
        } else {
            cur += if cur > 0 { len + 1 } else { len };
        }
    }
    if cur > 0 {
        lines += 1;
    }
    lines
}

/// Compute a rectangle for every block, in input order.
pub fn layout_blocks(blocks: &[BlockInput], viewport: Viewport) -> Vec<Rect> {
    let n = blocks.len();
    let mut hidden = vec![false; n];
    let mut rects = vec![Rect::default(); n];
    let mut text_h = vec![0.0f64; n];

    // Widths and text heights flow down from the viewport.
    for (i, b) in blocks.iter().enumerate() {
        hidden[i] = b.hidden || b.parent.map_or(false, |p| hidden[p]);
        if hidden[i] {
            continue;
        }
        let (px, pw) = match b.parent {
            Some(p) => (rects[p].x, rects[p].width),
            None => (0.0, viewport.width as f64),
        };
        rects[i].x = px + b.margin;
        rects[i].width = (pw - 2.0 * b.margin).max(0.0);
        text_h[i] = wrapped_lines(&b.text, rects[i].width, b.font_size) as f64
            * b.font_size
            * LINE_HEIGHT_EM;
    }

    // Heights accumulate up from the leaves; children always follow parents.
    let mut heights = text_h.clone();
    for i in (0..n).rev() {
        if hidden[i] {
            heights[i] = 0.0;
            continue;
        }
        if let Some(p) = blocks[i].parent {
            if !hidden[p] {
                heights[p] += heights[i] + 2.0 * blocks[i].margin;
            }
        }
    }

    // Vertical positions flow down again, one cursor per parent.
    let mut cursor = vec![0.0f64; n];
    for (i, b) in blocks.iter().enumerate() {
        if hidden[i] {
            rects[i] = Rect::default();
            continue;
        }
        let top = match b.parent {
            Some(p) => {
                let y = cursor[p];
                cursor[p] += heights[i] + 2.0 * b.margin;
                y
            }
            None => 0.0,
        };
        rects[i].y = top + b.margin;
        rects[i].height = heights[i];
        cursor[i] = rects[i].y + text_h[i];
    }

    rects
}
