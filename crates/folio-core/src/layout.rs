//! Headless block measurement.
//!
//! The pagination engine works on measured heights only. Hosts with a real rendering surface
//! implement [`HeightMeasurer`] and report what they laid out; headless hosts and tests use
//! [`TextMetrics`], which wraps visible text by display width (UAX #11) and multiplies line counts
//! by per-type line heights.

use unicode_width::UnicodeWidthChar;

use crate::block::{Block, BlockContent, BlockType};
use crate::inline;

/// Reports the rendered height of a block, in layout units.
///
/// Returning `None` means the block has no materialized container yet; the reflow that asked is
/// skipped and retried on a later tick.
pub trait HeightMeasurer {
    /// Height of `block` without the inter-block margin.
    fn measure(&self, block: &Block) -> Option<f64>;
}

impl<F> HeightMeasurer for F
where
    F: Fn(&Block) -> Option<f64>,
{
    fn measure(&self, block: &Block) -> Option<f64> {
        self(block)
    }
}

/// Wrap point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapPoint {
    /// Character index where wrapping occurs (within the line)
    pub char_index: usize,
    /// Byte offset where wrapping occurs (within the line)
    pub byte_offset: usize,
}

/// Calculate visual width of a character (based on UAX #11)
///
/// Return value:
/// - 1: Narrow character (ASCII, etc.)
/// - 2: Wide character (CJK, fullwidth, etc.)
/// - 0: Zero-width character (combining characters, etc.)
pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(1)
}

/// Calculate total visual width of a string
pub fn str_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Word-wrap points for one line of plain text.
///
/// Prefers breaking after whitespace and falls back to a character break when a single word is
/// wider than the line. Double-width characters are never split.
pub fn calculate_wrap_points(text: &str, columns: usize) -> Vec<WrapPoint> {
    let columns = columns.max(1);
    let mut wrap_points = Vec::new();

    let mut segment_start_char = 0usize;
    let mut segment_start_x = 0usize;
    let mut last_break: Option<(usize, usize, usize)> = None; // (char_index, byte_offset, x)
    let mut x = 0usize;

    for (char_index, (byte_offset, ch)) in text.char_indices().enumerate() {
        let ch_width = char_width(ch);

        loop {
            let x_in_segment = x.saturating_sub(segment_start_x);
            if x_in_segment.saturating_add(ch_width) <= columns {
                break;
            }

            if let Some((break_char, break_byte, break_x)) = last_break
                && break_char > segment_start_char
            {
                wrap_points.push(WrapPoint {
                    char_index: break_char,
                    byte_offset: break_byte,
                });
                segment_start_char = break_char;
                segment_start_x = break_x;
                last_break = None;
                continue;
            }

            // Fallback: wrap at the current character.
            wrap_points.push(WrapPoint {
                char_index,
                byte_offset,
            });
            segment_start_char = char_index;
            segment_start_x = x;
            last_break = None;
            break;
        }

        x = x.saturating_add(ch_width);

        if ch.is_whitespace() {
            last_break = Some((char_index + 1, byte_offset + ch.len_utf8(), x));
        }
    }

    wrap_points
}

/// Number of visual lines `text` occupies at `columns` cells per line. Empty text still takes one
/// line; explicit newlines start new lines.
pub fn visual_line_count(text: &str, columns: usize) -> usize {
    text.split('\n')
        .map(|line| 1 + calculate_wrap_points(line, columns).len())
        .sum()
}

/// Estimating measurer for headless use.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMetrics {
    /// Body text line width, in cells.
    pub columns: usize,
    /// Line height of paragraphs, list items and quotes.
    pub line_height: f64,
    /// Line heights of heading levels 1 to 3.
    pub heading_line_heights: [f64; 3],
    /// Vertical padding added to every text block.
    pub text_padding: f64,
    /// Divider height.
    pub divider_height: f64,
    /// Height of one table row.
    pub table_row_height: f64,
    /// Embedded content height.
    pub embed_height: f64,
    /// Chart placeholder height.
    pub chart_height: f64,
    /// Cover block height.
    pub cover_height: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            columns: 90,
            line_height: 24.0,
            heading_line_heights: [44.0, 36.0, 30.0],
            text_padding: 4.0,
            divider_height: 25.0,
            table_row_height: 33.0,
            embed_height: 360.0,
            chart_height: 320.0,
            cover_height: 971.0,
        }
    }
}

impl TextMetrics {
    fn line_height_for(&self, block_type: BlockType) -> f64 {
        match block_type {
            BlockType::Heading1 => self.heading_line_heights[0],
            BlockType::Heading2 => self.heading_line_heights[1],
            BlockType::Heading3 => self.heading_line_heights[2],
            _ => self.line_height,
        }
    }

    /// Larger fonts fit fewer cells per line.
    fn columns_for(&self, block_type: BlockType) -> usize {
        let scale = self.line_height / self.line_height_for(block_type);
        ((self.columns as f64 * scale).floor() as usize).max(1)
    }

    fn text_height(&self, block_type: BlockType, markup: &str) -> f64 {
        let visible = inline::visible_text(markup);
        let lines = visual_line_count(&visible, self.columns_for(block_type));
        lines as f64 * self.line_height_for(block_type) + self.text_padding
    }
}

impl HeightMeasurer for TextMetrics {
    fn measure(&self, block: &Block) -> Option<f64> {
        let block_type = block.block_type();
        let height = match block.content() {
            BlockContent::Text(markup) => self.text_height(block_type, markup),
            BlockContent::Items(items) => items
                .iter()
                .map(|item| self.text_height(block_type, item))
                .sum::<f64>()
                .max(self.line_height + self.text_padding),
            BlockContent::Table(table) => table.rows.len().max(1) as f64 * self.table_row_height,
            BlockContent::Embed(_) => self.embed_height,
            BlockContent::Cover(_) => self.cover_height,
            BlockContent::Chart(_) => self.chart_height,
            BlockContent::Empty => match block_type {
                BlockType::Divider => self.divider_height,
                _ => 0.0,
            },
        };
        Some(height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockDraft;
    use crate::store::BlockStore;

    #[test]
    fn test_char_width() {
        assert_eq!(char_width('a'), 1);
        assert_eq!(char_width(' '), 1);
        assert_eq!(char_width('你'), 2);
        assert_eq!(char_width('🦀'), 2);
    }

    #[test]
    fn test_str_width() {
        assert_eq!(str_width("hello"), 5);
        assert_eq!(str_width("hello你好"), 9);
    }

    #[test]
    fn test_wrap_prefers_whitespace() {
        let wraps = calculate_wrap_points("hello world again", 12);
        assert_eq!(wraps.len(), 1);
        assert_eq!(wraps[0].char_index, 12);
    }

    #[test]
    fn test_wrap_exact_fit_and_fallback() {
        assert!(calculate_wrap_points("1234567890", 10).is_empty());
        let wraps = calculate_wrap_points("12345678901", 10);
        assert_eq!(wraps.len(), 1);
        assert_eq!(wraps[0].char_index, 10);
    }

    #[test]
    fn test_wrap_double_width_not_split() {
        // Four CJK characters are eight cells; width 5 fits two per line.
        let wraps = calculate_wrap_points("你好世界", 5);
        assert_eq!(
            wraps.iter().map(|w| w.char_index).collect::<Vec<_>>(),
            vec![2]
        );
    }

    #[test]
    fn test_visual_line_count_counts_newlines() {
        assert_eq!(visual_line_count("", 10), 1);
        assert_eq!(visual_line_count("a\nb", 10), 2);
        assert_eq!(visual_line_count("abcdefghijk", 10), 2);
    }

    #[test]
    fn test_text_metrics_heights() {
        let metrics = TextMetrics {
            columns: 10,
            ..TextMetrics::default()
        };
        let store = BlockStore::from_drafts([
            BlockDraft::paragraph("short"),
            BlockDraft::paragraph("wrap me now"),
            BlockDraft::text(BlockType::Heading1, "Title"),
            BlockDraft::empty(BlockType::PageBreak),
            BlockDraft::empty(BlockType::Divider),
        ]);
        let heights: Vec<f64> = store
            .iter()
            .map(|b| metrics.measure(b).unwrap())
            .collect();
        assert_eq!(heights[0], 28.0);
        assert_eq!(heights[1], 2.0 * 24.0 + 4.0);
        assert_eq!(heights[2], 44.0 + 4.0);
        assert_eq!(heights[3], 0.0);
        assert_eq!(heights[4], 25.0);
    }

    #[test]
    fn test_closure_measurer() {
        let fixed = |_: &Block| Some(10.0);
        let store = BlockStore::new();
        assert_eq!(fixed.measure(store.first()), Some(10.0));
    }
}
