//! Markdown → block draft conversion.
//!
//! Text services answer in loosely formatted markdown. [`normalize`] walks the pulldown-cmark
//! event stream and cuts it into block-shaped drafts:
//!
//! ```text
//! "## Findings\n\n- **fast**\n- cheap"
//!     ↓ pulldown-cmark events
//! [Heading2 "Findings", Bullet "<b>fast</b>", Bullet "cheap"]
//! ```
//!
//! Nested lists are flattened (one draft per item); ordered-list start numbers are dropped since
//! ordinals are always derived from the document.

use folio_core::inline;
use folio_core::{BlockContent, BlockDraft, BlockType, TableContent};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use tracing::trace;

/// Parse markdown-ish `text` into drafts, in document order.
///
/// ```rust
/// use folio_core::BlockType;
/// use folio_markup::normalize;
///
/// let drafts = normalize("# Title\n\nSome *emphasis*.\n\n---");
/// let types: Vec<_> = drafts.iter().map(|d| d.block_type).collect();
/// assert_eq!(types, vec![BlockType::Heading1, BlockType::Paragraph, BlockType::Divider]);
/// ```
pub fn normalize(text: &str) -> Vec<BlockDraft> {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let mut normalizer = Normalizer::default();
    for event in Parser::new_ext(text, options) {
        normalizer.event(event);
    }
    normalizer.finish()
}

#[derive(Default)]
struct Normalizer {
    drafts: Vec<BlockDraft>,
    current: Option<(BlockType, String)>,
    lists: Vec<BlockType>,
    quote_depth: usize,
    code: Option<String>,
    table: Option<Vec<Vec<String>>>,
    row: Option<Vec<String>>,
    cell: Option<String>,
}

impl Normalizer {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.flush();
                self.current = Some((heading_type(level), String::new()));
            }
            Event::End(TagEnd::Heading(_)) => self.flush(),

            Event::Start(Tag::Paragraph) => {
                // Loose list items wrap their text in paragraphs.
                if let Some((_, markup)) = self.current.as_mut() {
                    if !markup.is_empty() {
                        markup.push(' ');
                    }
                } else if self.cell.is_none() {
                    self.current = Some((self.text_type(), String::new()));
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if self.lists.is_empty() {
                    self.flush();
                }
            }

            Event::Start(Tag::List(first)) => {
                self.flush();
                self.lists.push(if first.is_some() {
                    BlockType::Number
                } else {
                    BlockType::Bullet
                });
            }
            Event::End(TagEnd::List(_)) => {
                self.flush();
                self.lists.pop();
            }
            Event::Start(Tag::Item) => {
                self.flush();
                let item = self.lists.last().copied().unwrap_or(BlockType::Bullet);
                self.current = Some((item, String::new()));
            }
            Event::End(TagEnd::Item) => self.flush(),

            Event::Start(Tag::BlockQuote(_)) => {
                self.flush();
                self.quote_depth += 1;
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }

            Event::Start(Tag::CodeBlock(_)) => {
                self.flush();
                self.code = Some(String::new());
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(code) = self.code.take() {
                    for line in code.lines().filter(|l| !l.trim().is_empty()) {
                        self.drafts.push(BlockDraft::paragraph(format!(
                            "<code>{}</code>",
                            inline::escape(line)
                        )));
                    }
                }
            }

            Event::Start(Tag::Table(_)) => {
                self.flush();
                self.table = Some(Vec::new());
            }
            Event::End(TagEnd::Table) => {
                if let Some(rows) = self.table.take() {
                    self.drafts.push(BlockDraft::new(
                        BlockType::Table,
                        BlockContent::Table(TableContent { rows }),
                    ));
                }
            }
            Event::Start(Tag::TableHead) | Event::Start(Tag::TableRow) => {
                self.row = Some(Vec::new());
            }
            Event::End(TagEnd::TableHead) | Event::End(TagEnd::TableRow) => {
                if let (Some(row), Some(table)) = (self.row.take(), self.table.as_mut()) {
                    table.push(row);
                }
            }
            Event::Start(Tag::TableCell) => self.cell = Some(String::new()),
            Event::End(TagEnd::TableCell) => {
                if let (Some(cell), Some(row)) = (self.cell.take(), self.row.as_mut()) {
                    row.push(cell.trim().to_string());
                }
            }

            Event::Start(Tag::Strong) => self.push_inline("<b>"),
            Event::End(TagEnd::Strong) => self.push_inline("</b>"),
            Event::Start(Tag::Emphasis) => self.push_inline("<i>"),
            Event::End(TagEnd::Emphasis) => self.push_inline("</i>"),
            Event::Start(Tag::Strikethrough) => self.push_inline("<s>"),
            Event::End(TagEnd::Strikethrough) => self.push_inline("</s>"),

            Event::Text(text) => {
                if let Some(code) = self.code.as_mut() {
                    code.push_str(&text);
                } else {
                    self.push_inline(&inline::escape(&text));
                }
            }
            Event::Code(code) => {
                self.push_inline(&format!("<code>{}</code>", inline::escape(&code)));
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                self.push_inline(&inline::escape(&html));
            }
            Event::SoftBreak | Event::HardBreak => self.push_inline(" "),
            Event::Rule => {
                self.flush();
                self.drafts.push(BlockDraft::empty(BlockType::Divider));
            }
            other => trace!(?other, "markdown event ignored"),
        }
    }

    fn text_type(&self) -> BlockType {
        if self.quote_depth > 0 {
            BlockType::Quote
        } else {
            BlockType::Paragraph
        }
    }

    fn push_inline(&mut self, markup: &str) {
        if let Some(cell) = self.cell.as_mut() {
            cell.push_str(markup);
            return;
        }
        let block_type = self.text_type();
        let (_, current) = self
            .current
            .get_or_insert_with(|| (block_type, String::new()));
        current.push_str(markup);
    }

    fn flush(&mut self) {
        let Some((block_type, markup)) = self.current.take() else {
            return;
        };
        let markup = markup.trim();
        if !inline::is_blank(markup) {
            self.drafts.push(BlockDraft::text(block_type, markup));
        }
    }

    fn finish(mut self) -> Vec<BlockDraft> {
        self.flush();
        self.drafts
    }
}

fn heading_type(level: HeadingLevel) -> BlockType {
    match level {
        HeadingLevel::H1 => BlockType::Heading1,
        HeadingLevel::H2 => BlockType::Heading2,
        _ => BlockType::Heading3,
    }
}
