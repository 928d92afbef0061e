//! Caption Layout
//!
//! Word geometry for both display modes. Geometry is computed once per frame
//! and handed to the per-word draw routine; animation never feeds back into it.

use std::ops::Range;

use super::surface::TextMeasure;
use crate::core::style::TextAlign;

/// Maximum line width as a fraction of the canvas width
pub const MAX_LINE_WIDTH_RATIO: f32 = 0.85;
/// Line advance as a multiple of the font size
pub const LINE_HEIGHT_RATIO: f32 = 1.3;
/// Inter-word gap as a multiple of the font size
pub const WORD_SPACING_RATIO: f32 = 0.3;

/// A positioned word, centered on `(center_x, center_y)`
#[derive(Debug, Clone, PartialEq)]
pub struct WordBox {
    /// Index in the caption's word list
    pub index: usize,
    pub text: String,
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineBox {
    pub words: Range<usize>,
    pub width: f32,
    pub center_y: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CaptionLayout {
    pub words: Vec<WordBox>,
    pub lines: Vec<LineBox>,
}

/// Greedy wrap over measured widths.
///
/// A word joins the current line while the line's width plus the gap plus
/// the word stays within `max_width`. The first word of a line is always
/// accepted, so an oversized word ends up alone on its own line.
pub fn wrap_lines(widths: &[f32], spacing: f32, max_width: f32) -> Vec<Range<usize>> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut running = 0.0f32;

    for (i, &width) in widths.iter().enumerate() {
        if i == start {
            running = width;
            continue;
        }
        if running + spacing + width <= max_width {
            running += spacing + width;
        } else {
            lines.push(start..i);
            start = i;
            running = width;
        }
    }
    if start < widths.len() {
        lines.push(start..widths.len());
    }
    lines
}

/// Width of a line: word widths plus the gaps between them
pub fn line_width(widths: &[f32], spacing: f32) -> f32 {
    if widths.is_empty() {
        return 0.0;
    }
    widths.iter().sum::<f32>() + spacing * (widths.len() - 1) as f32
}

/// Block mode: wrapped lines, vertically centered on the anchor.
///
/// Alignment offsets use [`line_width`], the same synthetic word spacing
/// the words are advanced by, not a measurement of the joined line text.
/// `measure` must already carry the caption font.
pub fn layout_block<M: TextMeasure + ?Sized>(
    measure: &mut M,
    words: &[String],
    anchor: (f32, f32),
    font_size: f32,
    align: TextAlign,
    canvas_width: f32,
) -> CaptionLayout {
    if words.is_empty() {
        return CaptionLayout::default();
    }

    let widths: Vec<f32> = words.iter().map(|w| measure.measure_text(w)).collect();
    let spacing = font_size * WORD_SPACING_RATIO;
    let ranges = wrap_lines(&widths, spacing, canvas_width * MAX_LINE_WIDTH_RATIO);

    let line_height = font_size * LINE_HEIGHT_RATIO;
    let total_height = ranges.len() as f32 * line_height;
    let first_center_y = anchor.1 - total_height / 2.0 + line_height / 2.0;

    let mut layout = CaptionLayout::default();
    for (line_no, range) in ranges.into_iter().enumerate() {
        let center_y = first_center_y + line_no as f32 * line_height;
        let width = line_width(&widths[range.clone()], spacing);
        let mut x = match align {
            TextAlign::Left => anchor.0,
            TextAlign::Center => anchor.0 - width / 2.0,
            TextAlign::Right => anchor.0 - width,
        };

        for i in range.clone() {
            layout.words.push(WordBox {
                index: i,
                text: words[i].clone(),
                center_x: x + widths[i] / 2.0,
                center_y,
                width: widths[i],
            });
            x += widths[i] + spacing;
        }
        layout.lines.push(LineBox {
            words: range,
            width,
            center_y,
        });
    }
    layout
}

/// Word mode: only the active word, centered on the anchor
pub fn layout_word<M: TextMeasure + ?Sized>(
    measure: &mut M,
    words: &[String],
    active_index: usize,
    anchor: (f32, f32),
) -> CaptionLayout {
    let Some(text) = words.get(active_index) else {
        return CaptionLayout::default();
    };
    let width = measure.measure_text(text);
    CaptionLayout {
        words: vec![WordBox {
            index: active_index,
            text: text.clone(),
            center_x: anchor.0,
            center_y: anchor.1,
            width,
        }],
        lines: vec![LineBox {
            words: active_index..active_index + 1,
            width,
            center_y: anchor.1,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed advance of 10 units per character
    struct FixedMeasure;

    impl TextMeasure for FixedMeasure {
        fn measure_text(&mut self, text: &str) -> f32 {
            text.chars().count() as f32 * 10.0
        }
    }

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    // -------------------------------------------------------------------------
    // wrap_lines
    // -------------------------------------------------------------------------

    #[test]
    fn test_wrap_single_line_when_it_fits() {
        assert_eq!(wrap_lines(&[50.0, 50.0], 10.0, 110.0), vec![0..2]);
    }

    #[test]
    fn test_wrap_breaks_when_exceeding() {
        assert_eq!(
            wrap_lines(&[50.0, 50.0, 50.0], 10.0, 110.0),
            vec![0..2, 2..3]
        );
    }

    #[test]
    fn test_wrap_oversized_word_gets_own_line() {
        assert_eq!(
            wrap_lines(&[20.0, 500.0, 20.0], 5.0, 100.0),
            vec![0..1, 1..2, 2..3]
        );
    }

    #[test]
    fn test_wrap_never_exceeds_max_width() {
        let widths = [30.0, 45.0, 12.0, 80.0, 5.0, 60.0, 33.0, 21.0, 99.0];
        let spacing = 4.0;
        let max = 100.0;
        let lines = wrap_lines(&widths, spacing, max);

        let covered: usize = lines.iter().map(|r| r.len()).sum();
        assert_eq!(covered, widths.len());
        for range in lines {
            let w = line_width(&widths[range.clone()], spacing);
            assert!(w <= max || range.len() == 1, "line {:?} too wide: {}", range, w);
        }
    }

    #[test]
    fn test_wrap_empty() {
        assert!(wrap_lines(&[], 1.0, 10.0).is_empty());
    }

    // -------------------------------------------------------------------------
    // layout_block / layout_word
    // -------------------------------------------------------------------------

    #[test]
    fn test_block_center_alignment() {
        let mut m = FixedMeasure;
        // widths 50 + 50, spacing 3 → line width 103
        let layout = layout_block(&mut m, &words("Hello world"), (500.0, 400.0), 10.0, TextAlign::Center, 1000.0);
        assert_eq!(layout.lines.len(), 1);
        assert!((layout.lines[0].width - 103.0).abs() < 1e-4);
        assert!((layout.words[0].center_x - (448.5 + 25.0)).abs() < 1e-4);
        assert!((layout.words[1].center_x - (448.5 + 53.0 + 25.0)).abs() < 1e-4);
        assert_eq!(layout.words[0].center_y, 400.0);
    }

    #[test]
    fn test_block_left_and_right_alignment() {
        let mut m = FixedMeasure;
        let left = layout_block(&mut m, &words("ab cd"), (100.0, 0.0), 10.0, TextAlign::Left, 1000.0);
        assert_eq!(left.words[0].center_x, 110.0);

        let right = layout_block(&mut m, &words("ab cd"), (100.0, 0.0), 10.0, TextAlign::Right, 1000.0);
        // line width 20 + 3 + 20 = 43
        assert!((right.words[1].center_x - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_aligned_line_edges_match_word_advance() {
        let mut m = FixedMeasure;
        let text = words("one three fifteen");
        let anchor = (600.0, 0.0);

        let right = layout_block(&mut m, &text, anchor, 20.0, TextAlign::Right, 2000.0);
        let last = &right.words[2];
        assert!((last.center_x + last.width / 2.0 - anchor.0).abs() < 1e-3);

        let center = layout_block(&mut m, &text, anchor, 20.0, TextAlign::Center, 2000.0);
        let first = &center.words[0];
        let last = &center.words[2];
        let left_edge = first.center_x - first.width / 2.0;
        let right_edge = last.center_x + last.width / 2.0;
        assert!((left_edge + right_edge - 2.0 * anchor.0).abs() < 1e-3);
        assert!((right_edge - left_edge - center.lines[0].width).abs() < 1e-3);
    }

    #[test]
    fn test_block_vertical_centering() {
        let mut m = FixedMeasure;
        // max width 0.85 * 100 = 85: "aaaaa"(50) + 3 + "bbbbb"(50) > 85
        let layout = layout_block(&mut m, &words("aaaaa bbbbb"), (50.0, 100.0), 10.0, TextAlign::Center, 100.0);
        assert_eq!(layout.lines.len(), 2);
        // line height 13, block height 26 → centers at 93.5 and 106.5
        assert!((layout.lines[0].center_y - 93.5).abs() < 1e-4);
        assert!((layout.lines[1].center_y - 106.5).abs() < 1e-4);
    }

    #[test]
    fn test_word_mode_centers_active_word() {
        let mut m = FixedMeasure;
        let layout = layout_word(&mut m, &words("one two three"), 2, (10.0, 20.0));
        assert_eq!(layout.words.len(), 1);
        assert_eq!(layout.words[0].text, "three");
        assert_eq!(layout.words[0].index, 2);
        assert_eq!((layout.words[0].center_x, layout.words[0].center_y), (10.0, 20.0));

        assert!(layout_word(&mut m, &words("one"), 4, (0.0, 0.0)).words.is_empty());
    }
}
