//! Block type conversion rules.
//!
//! Conversion never mutates a block in place; [`plan_conversion`] computes the payload of the
//! replacement block plus any text that has to be relocated because the target type cannot hold
//! it. The [`BlockStore`](crate::BlockStore) applies the plan.

use regex::Regex;
use std::sync::LazyLock;

use crate::block::{
    Block, BlockContent, BlockType, ChartContent, CoverContent, TableContent,
};
use crate::inline;

static LIST_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\s*(?:\d+[.)]|[-•*◦▪])(?:\s+|$))+").expect("static list marker pattern")
});

/// Result of planning a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPlan {
    /// Payload for the replacement block.
    pub content: BlockContent,
    /// Text the target type cannot carry; it goes into a paragraph right after the new block.
    pub relocated: Option<String>,
}

/// Type-aware text extraction.
///
/// Legacy list containers concatenate their items; single-item lists read their one item.
/// Structural blocks expose whatever text-like field they have.
pub fn extract_content(block: &Block) -> String {
    match block.content() {
        BlockContent::Text(markup) => markup.clone(),
        BlockContent::Items(items) => items
            .iter()
            .filter(|item| !inline::is_blank(item))
            .cloned()
            .collect::<Vec<_>>()
            .join(" "),
        BlockContent::Table(table) => table
            .rows
            .iter()
            .flatten()
            .filter(|cell| !inline::is_blank(cell))
            .cloned()
            .collect::<Vec<_>>()
            .join(" "),
        BlockContent::Cover(cover) => cover.title.clone(),
        BlockContent::Chart(chart) => chart.caption.clone(),
        BlockContent::Embed(_) | BlockContent::Empty => String::new(),
    }
}

/// Remove list-marker glyphs (`1.`, `2)`, `-`, `*`, `•`) typed literally at the start of the text.
///
/// Only the markers are removed; inline markup around the remaining text is preserved.
pub fn strip_list_markers(markup: &str) -> String {
    let visible = inline::visible_text(markup);
    match LIST_MARKERS.find(&visible) {
        Some(m) if m.end() > 0 => {
            let marker_chars = visible[..m.end()].chars().count();
            inline::delete_range(markup, 0, marker_chars)
        }
        _ => markup.to_string(),
    }
}

/// Compute the payload for converting `block` into `target`.
pub fn plan_conversion(block: &Block, target: BlockType) -> ConversionPlan {
    let source = block.block_type();

    // Separators normally carry nothing, so this is empty unless stray text survived a load.
    let mut text = extract_content(block);
    if source.list_kind().is_some() {
        text = strip_list_markers(&text);
    }
    let has_text = !inline::is_blank(&text);

    match target {
        t if t.is_text_bearing() => ConversionPlan {
            content: BlockContent::Text(text),
            relocated: None,
        },
        BlockType::BulletList | BlockType::NumberList => ConversionPlan {
            content: BlockContent::Items(if has_text { vec![text] } else { Vec::new() }),
            relocated: None,
        },
        BlockType::Table => ConversionPlan {
            content: BlockContent::Table(TableContent {
                rows: if has_text { vec![vec![text]] } else { Vec::new() },
            }),
            relocated: None,
        },
        BlockType::Cover => ConversionPlan {
            content: BlockContent::Cover(CoverContent {
                title: text,
                ..CoverContent::default()
            }),
            relocated: None,
        },
        BlockType::ChartPlaceholder => ConversionPlan {
            content: BlockContent::Chart(ChartContent {
                caption: text,
                ..ChartContent::default()
            }),
            relocated: None,
        },
        _ => ConversionPlan {
            content: BlockContent::empty_for(target),
            relocated: has_text.then_some(text),
        },
    }
}
