//! Block data model.
//!
//! A document is an ordered sequence of [`Block`]s. Each block has an immutable [`BlockId`], a
//! closed [`BlockType`] and a [`BlockContent`] payload whose shape follows the type: text-bearing
//! blocks carry inline markup (see [`crate::inline`]), structural blocks carry typed fields.
//!
//! [`BlockRecord`] is the persistence shape exchanged with storage.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::inline;

/// Opaque, unique block identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Allocate a fresh id. Fresh ids are never reused.
    pub fn generate() -> Self {
        Self(format!("blk-{}", uuid::Uuid::new_v4().simple()))
    }

    /// Wrap an existing id (e.g. one read from persistence).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id can be trusted as an address: non-empty and free of whitespace.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty() && !self.0.chars().any(char::is_whitespace)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The closed set of block variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    /// Plain paragraph.
    Paragraph,
    /// Top-level heading.
    Heading1,
    /// Second-level heading.
    Heading2,
    /// Third-level heading.
    Heading3,
    /// One bulleted list item.
    Bullet,
    /// One numbered list item.
    Number,
    /// Block quote.
    Quote,
    /// Highlighted callout box.
    Callout,
    /// Horizontal rule.
    Divider,
    /// Explicit page separator; not renderable content.
    PageBreak,
    /// Table with string cells.
    Table,
    /// Report cover; always paginated onto its own page.
    Cover,
    /// Placeholder for a chart rendered by the host.
    ChartPlaceholder,
    /// Embedded external content.
    Embed,
    /// Deprecated multi-item bullet container (read-only compatibility).
    BulletList,
    /// Deprecated multi-item numbered container (read-only compatibility).
    NumberList,
}

/// List flavour shared by list items and legacy containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    /// Bulleted.
    Bullet,
    /// Numbered.
    Number,
}

impl BlockType {
    /// Canonical persisted name.
    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::Heading1 => "heading1",
            BlockType::Heading2 => "heading2",
            BlockType::Heading3 => "heading3",
            BlockType::Bullet => "bullet",
            BlockType::Number => "number",
            BlockType::Quote => "quote",
            BlockType::Callout => "callout",
            BlockType::Divider => "divider",
            BlockType::PageBreak => "page-break",
            BlockType::Table => "table",
            BlockType::Cover => "cover",
            BlockType::ChartPlaceholder => "chart-placeholder",
            BlockType::Embed => "embed",
            BlockType::BulletList => "bullet-list",
            BlockType::NumberList => "number-list",
        }
    }

    /// Blocks whose content is inline markup.
    pub fn is_text_bearing(self) -> bool {
        matches!(
            self,
            BlockType::Paragraph
                | BlockType::Heading1
                | BlockType::Heading2
                | BlockType::Heading3
                | BlockType::Bullet
                | BlockType::Number
                | BlockType::Quote
                | BlockType::Callout
        )
    }

    /// Blocks that cannot be split by a line break.
    pub fn is_atomic(self) -> bool {
        matches!(
            self,
            BlockType::Divider
                | BlockType::PageBreak
                | BlockType::Table
                | BlockType::Cover
                | BlockType::ChartPlaceholder
                | BlockType::Embed
        )
    }

    /// Divider and page-break carry no content at all.
    pub fn is_separator(self) -> bool {
        matches!(self, BlockType::Divider | BlockType::PageBreak)
    }

    /// Heading of any level.
    pub fn is_heading(self) -> bool {
        matches!(
            self,
            BlockType::Heading1 | BlockType::Heading2 | BlockType::Heading3
        )
    }

    /// Deprecated container variants.
    pub fn is_legacy_container(self) -> bool {
        matches!(self, BlockType::BulletList | BlockType::NumberList)
    }

    /// List flavour for single-item list blocks and legacy containers.
    pub fn list_kind(self) -> Option<ListKind> {
        match self {
            BlockType::Bullet | BlockType::BulletList => Some(ListKind::Bullet),
            BlockType::Number | BlockType::NumberList => Some(ListKind::Number),
            _ => None,
        }
    }

    /// Single-item list block (`bullet` / `number`).
    pub fn is_list_item(self) -> bool {
        matches!(self, BlockType::Bullet | BlockType::Number)
    }

    /// Item type a legacy container expands into.
    pub fn item_type(self) -> BlockType {
        match self {
            BlockType::BulletList => BlockType::Bullet,
            BlockType::NumberList => BlockType::Number,
            other => other,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Table payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableContent {
    /// Rows of cell markup; the first row is the header row.
    pub rows: Vec<Vec<String>>,
}

/// Embed payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmbedContent {
    /// Kind of embedded object (e.g. `"chart"`, `"image"`).
    pub embed_type: String,
    /// Host-side identifier of the embedded object.
    pub source_id: String,
    /// Layout hint (e.g. `"full"`, `"half"`).
    pub layout: String,
}

/// Cover payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoverContent {
    /// Report title.
    pub title: String,
    /// Subtitle line.
    pub subtitle: String,
    /// Author line.
    pub author: String,
    /// Date line (free text).
    pub date: String,
}

/// Chart placeholder payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChartContent {
    /// Chart kind requested by the author.
    pub chart_type: String,
    /// Caption shown under the chart.
    pub caption: String,
}

/// Type-shaped block payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockContent {
    /// Inline markup for text-bearing blocks.
    Text(String),
    /// Item markup of a legacy list container.
    Items(Vec<String>),
    /// Table cells.
    Table(TableContent),
    /// Embed reference.
    Embed(EmbedContent),
    /// Cover metadata.
    Cover(CoverContent),
    /// Chart placeholder metadata.
    Chart(ChartContent),
    /// No payload (divider, page-break).
    Empty,
}

impl BlockContent {
    /// The empty payload for `block_type`.
    pub fn empty_for(block_type: BlockType) -> Self {
        match block_type {
            t if t.is_text_bearing() => BlockContent::Text(String::new()),
            BlockType::BulletList | BlockType::NumberList => BlockContent::Items(Vec::new()),
            BlockType::Table => BlockContent::Table(TableContent::default()),
            BlockType::Embed => BlockContent::Embed(EmbedContent::default()),
            BlockType::Cover => BlockContent::Cover(CoverContent::default()),
            BlockType::ChartPlaceholder => BlockContent::Chart(ChartContent::default()),
            _ => BlockContent::Empty,
        }
    }

    /// Whether the payload holds nothing the author entered: blank text or cells, an embed with
    /// no source, a cover without any field, a chart with neither kind nor caption.
    pub fn is_placeholder(&self) -> bool {
        match self {
            BlockContent::Text(markup) => inline::is_blank(markup),
            BlockContent::Items(items) => items.iter().all(|item| inline::is_blank(item)),
            BlockContent::Table(table) => table.rows.iter().flatten().all(|cell| inline::is_blank(cell)),
            BlockContent::Embed(embed) => embed.source_id.trim().is_empty(),
            BlockContent::Cover(cover) => [&cover.title, &cover.subtitle, &cover.author, &cover.date]
                .into_iter()
                .all(|field| inline::is_blank(field)),
            BlockContent::Chart(chart) => {
                chart.chart_type.trim().is_empty() && inline::is_blank(&chart.caption)
            }
            BlockContent::Empty => true,
        }
    }

    /// Whether this payload is well-shaped for `block_type`.
    pub fn fits(&self, block_type: BlockType) -> bool {
        matches!(
            (self, block_type),
            (BlockContent::Text(_), t) if t.is_text_bearing()
        ) || matches!(
            (self, block_type),
            (
                BlockContent::Items(_),
                BlockType::BulletList | BlockType::NumberList
            ) | (BlockContent::Table(_), BlockType::Table)
                | (BlockContent::Embed(_), BlockType::Embed)
                | (BlockContent::Cover(_), BlockType::Cover)
                | (BlockContent::Chart(_), BlockType::ChartPlaceholder)
                | (
                    BlockContent::Empty,
                    BlockType::Divider | BlockType::PageBreak
                )
        )
    }
}

/// A block that has not been inserted yet (no id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDraft {
    /// Target type.
    pub block_type: BlockType,
    /// Payload; reshaped on insertion if it does not fit the type.
    pub content: BlockContent,
}

impl BlockDraft {
    /// Draft with explicit payload.
    pub fn new(block_type: BlockType, content: BlockContent) -> Self {
        Self {
            block_type,
            content,
        }
    }

    /// Text-bearing draft from inline markup.
    pub fn text(block_type: BlockType, markup: impl Into<String>) -> Self {
        Self::new(block_type, BlockContent::Text(markup.into()))
    }

    /// Paragraph draft from inline markup.
    pub fn paragraph(markup: impl Into<String>) -> Self {
        Self::text(BlockType::Paragraph, markup)
    }

    /// Draft with the empty payload for `block_type`.
    pub fn empty(block_type: BlockType) -> Self {
        Self::new(block_type, BlockContent::empty_for(block_type))
    }

    /// Reshape the payload to the draft's type. Text the type has no room for (dividers,
    /// page breaks, embeds) comes back as a paragraph draft meant to follow this one.
    pub(crate) fn detach_text(self) -> (BlockDraft, Option<BlockDraft>) {
        if self.content.fits(self.block_type) {
            return (self, None);
        }
        let text = loose_text(self.content);
        match text_payload(text, self.block_type) {
            Ok(content) => (BlockDraft::new(self.block_type, content), None),
            Err(text) => {
                let spill = (!inline::is_blank(&text)).then(|| BlockDraft::paragraph(text));
                (BlockDraft::empty(self.block_type), spill)
            }
        }
    }
}

/// The atomic unit of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    id: BlockId,
    block_type: BlockType,
    content: BlockContent,
}

impl Block {
    pub(crate) fn with_id(id: BlockId, block_type: BlockType, content: BlockContent) -> Self {
        let content = if content.fits(block_type) {
            content
        } else {
            reshape(content, block_type)
        };
        Self {
            id,
            block_type,
            content,
        }
    }

    pub(crate) fn from_draft(draft: BlockDraft) -> Self {
        Self::with_id(BlockId::generate(), draft.block_type, draft.content)
    }

    /// Immutable id.
    pub fn id(&self) -> &BlockId {
        &self.id
    }

    /// Block variant.
    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    /// Payload.
    pub fn content(&self) -> &BlockContent {
        &self.content
    }

    /// Inline markup of a text-bearing block.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            BlockContent::Text(markup) => Some(markup),
            _ => None,
        }
    }

    pub(crate) fn content_mut(&mut self) -> &mut BlockContent {
        &mut self.content
    }

    pub(crate) fn set_id(&mut self, id: BlockId) {
        self.id = id;
    }

    /// Persistence record for this block.
    pub fn to_record(&self) -> BlockRecord {
        let mut record = BlockRecord {
            id: Some(self.id.as_str().to_string()),
            block_type: self.block_type,
            ..BlockRecord::default()
        };
        match &self.content {
            BlockContent::Text(markup) => record.content = Some(markup.clone()),
            BlockContent::Items(items) => record.items = Some(items.clone()),
            BlockContent::Table(table) => record.rows = Some(table.rows.clone()),
            BlockContent::Embed(embed) => {
                record.embed_type = Some(embed.embed_type.clone());
                record.source_id = Some(embed.source_id.clone());
                record.layout = Some(embed.layout.clone());
            }
            BlockContent::Cover(cover) => {
                record.title = Some(cover.title.clone());
                record.subtitle = Some(cover.subtitle.clone());
                record.author = Some(cover.author.clone());
                record.date = Some(cover.date.clone());
            }
            BlockContent::Chart(chart) => {
                record.chart_type = Some(chart.chart_type.clone());
                record.caption = Some(chart.caption.clone());
            }
            BlockContent::Empty => {}
        }
        record
    }
}

/// Whatever text a payload carries, flattened to one markup string.
fn loose_text(content: BlockContent) -> String {
    match content {
        BlockContent::Text(markup) => markup,
        BlockContent::Items(items) => items.join(" "),
        BlockContent::Table(table) => table
            .rows
            .iter()
            .map(|row| row.join(" "))
            .collect::<Vec<_>>()
            .join(" "),
        BlockContent::Cover(cover) => cover.title,
        BlockContent::Chart(chart) => chart.caption,
        BlockContent::Embed(_) | BlockContent::Empty => String::new(),
    }
}

/// Put `text` where `block_type` keeps its text. Hands the text back when the type has none.
fn text_payload(text: String, block_type: BlockType) -> Result<BlockContent, String> {
    let blank = inline::is_blank(&text);
    match BlockContent::empty_for(block_type) {
        BlockContent::Text(_) => Ok(BlockContent::Text(text)),
        BlockContent::Items(_) => Ok(BlockContent::Items(if blank { Vec::new() } else { vec![text] })),
        BlockContent::Table(_) => Ok(BlockContent::Table(TableContent {
            rows: if blank { Vec::new() } else { vec![vec![text]] },
        })),
        BlockContent::Cover(cover) => Ok(BlockContent::Cover(CoverContent {
            title: text,
            ..cover
        })),
        BlockContent::Chart(chart) => Ok(BlockContent::Chart(ChartContent {
            caption: text,
            ..chart
        })),
        BlockContent::Embed(_) | BlockContent::Empty => Err(text),
    }
}

/// Move whatever text a mismatched payload carries into the shape `block_type` expects.
///
/// Types without text drop it; [`BlockStore`](crate::BlockStore) detaches such text into a
/// paragraph before it builds the block.
fn reshape(content: BlockContent, block_type: BlockType) -> BlockContent {
    text_payload(loose_text(content), block_type)
        .unwrap_or_else(|_| BlockContent::empty_for(block_type))
}

/// Persistence record of one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    /// Stored id; missing or untrusted ids are regenerated on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Block variant.
    #[serde(rename = "type")]
    pub block_type: BlockType,
    /// Inline markup of text-bearing blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Items of a legacy list container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
    /// Table rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Vec<String>>>,
    /// Embed kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_type: Option<String>,
    /// Embed source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Embed layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    /// Cover title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Cover subtitle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Cover author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Cover date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Chart kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,
    /// Chart caption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl Default for BlockRecord {
    fn default() -> Self {
        Self {
            id: None,
            block_type: BlockType::Paragraph,
            content: None,
            items: None,
            rows: None,
            embed_type: None,
            source_id: None,
            layout: None,
            title: None,
            subtitle: None,
            author: None,
            date: None,
            chart_type: None,
            caption: None,
        }
    }
}

impl BlockRecord {
    /// Payload draft for this record. Stray text on a divider or page break is kept as a
    /// mismatched payload so the store can move it into a paragraph instead of dropping it.
    pub(crate) fn into_draft(self) -> BlockDraft {
        let block_type = self.block_type;
        let content = match block_type {
            t if t.is_text_bearing() => BlockContent::Text(
                self.content
                    .or_else(|| self.items.map(|items| items.join(" ")))
                    .unwrap_or_default(),
            ),
            BlockType::BulletList | BlockType::NumberList => BlockContent::Items(
                self.items
                    .or_else(|| self.content.map(|c| vec![c]))
                    .unwrap_or_default(),
            ),
            BlockType::Table => BlockContent::Table(TableContent {
                rows: self.rows.unwrap_or_default(),
            }),
            BlockType::Embed => BlockContent::Embed(EmbedContent {
                embed_type: self.embed_type.unwrap_or_default(),
                source_id: self.source_id.unwrap_or_default(),
                layout: self.layout.unwrap_or_default(),
            }),
            BlockType::Cover => BlockContent::Cover(CoverContent {
                title: self.title.unwrap_or_default(),
                subtitle: self.subtitle.unwrap_or_default(),
                author: self.author.unwrap_or_default(),
                date: self.date.unwrap_or_default(),
            }),
            BlockType::ChartPlaceholder => BlockContent::Chart(ChartContent {
                chart_type: self.chart_type.unwrap_or_default(),
                caption: self.caption.unwrap_or_default(),
            }),
            _ => match self
                .content
                .or_else(|| self.items.map(|items| items.join(" ")))
            {
                Some(text) if !inline::is_blank(&text) => BlockContent::Text(text),
                _ => BlockContent::Empty,
            },
        };
        BlockDraft::new(block_type, content)
    }
}
