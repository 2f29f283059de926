//! Editing state machine.
//!
//! Interprets edit intents (split, merge, delete-empty, convert-on-pattern, list continuation and
//! multi-block range edits) and applies them to a [`BlockStore`]. Each operation reports where the
//! cursor should go and whether the mutation was keystroke-level or structural; the session uses
//! that to pick between debounced and immediate snapshots and reflows.
//!
//! Operations address blocks by id. An unknown id yields [`CommandError::UnknownBlock`], which the
//! command layer downgrades to a no-op.

use tracing::debug;

use crate::CommandError;
use crate::block::{BlockContent, BlockDraft, BlockId, BlockType};
use crate::inline;
use crate::pattern::match_shortcut;
use crate::selection::{Caret, Selection};
use crate::store::BlockStore;

/// How an edit changed the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Nothing changed.
    None,
    /// Keystroke-level text change inside one block.
    Text,
    /// Blocks were created, removed, reordered or retyped.
    Structural,
}

/// Result of one edit operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// Where the cursor should be placed afterwards.
    pub focus: Option<Caret>,
    /// Mutation classification.
    pub kind: MutationKind,
}

impl EditOutcome {
    /// No change.
    pub fn unchanged() -> Self {
        Self {
            focus: None,
            kind: MutationKind::None,
        }
    }

    fn text(focus: Caret) -> Self {
        Self {
            focus: Some(focus),
            kind: MutationKind::Text,
        }
    }

    fn structural(focus: Caret) -> Self {
        Self {
            focus: Some(focus),
            kind: MutationKind::Structural,
        }
    }

    /// Whether the document changed.
    pub fn is_mutation(&self) -> bool {
        self.kind != MutationKind::None
    }
}

fn text_of(store: &BlockStore, id: &BlockId) -> Result<String, CommandError> {
    let block = store
        .get(id)
        .ok_or_else(|| CommandError::UnknownBlock(id.clone()))?;
    block
        .text()
        .map(str::to_string)
        .ok_or_else(|| CommandError::NotTextBearing {
            id: id.clone(),
            block_type: block.block_type(),
        })
}

/// The block an edit operates on, plus whether resolving it expanded a legacy list container.
fn resolve(store: &mut BlockStore, id: &BlockId) -> Result<(BlockId, bool), CommandError> {
    let expands = store
        .get(id)
        .is_some_and(|b| b.block_type().is_legacy_container());
    let resolved = store
        .touch(id)
        .ok_or_else(|| CommandError::UnknownBlock(id.clone()))?;
    Ok((resolved, expands))
}

/// Outcome of an edit that changed nothing itself. An expansion during resolve still reshaped
/// the document, so it counts as structural.
fn settled(expanded: bool, focus: Caret) -> EditOutcome {
    if expanded {
        EditOutcome::structural(focus)
    } else {
        EditOutcome::unchanged()
    }
}

fn caret_at_end(store: &BlockStore, id: &BlockId) -> Caret {
    let offset = store
        .get(id)
        .and_then(|b| b.text())
        .map(inline::visible_len)
        .unwrap_or(0);
    Caret::new(id.clone(), offset)
}

/// The editing surface reported new content for a block.
///
/// Stores the content, then runs the markdown-shortcut matcher over this block only. A match
/// strips the trigger and converts the block (a structural edit); otherwise the change is a plain
/// text edit.
pub fn text_changed(
    store: &mut BlockStore,
    block: &BlockId,
    content: &str,
    cursor: usize,
) -> Result<EditOutcome, CommandError> {
    let (id, expanded) = resolve(store, block)?;
    let changed = store.set_text(&id, content)?;
    let current_type = store
        .get(&id)
        .map(|b| b.block_type())
        .ok_or_else(|| CommandError::UnknownBlock(id.clone()))?;

    let visible = inline::visible_text(content);
    if let Some(shortcut) = match_shortcut(&visible)
        && shortcut.target != current_type
    {
        let stripped = inline::delete_range(content, 0, shortcut.trigger_len);
        store.set_text(&id, &stripped)?;
        let conversion = store
            .convert(&id, shortcut.target)
            .ok_or_else(|| CommandError::UnknownBlock(id.clone()))?;
        debug!("shortcut converted {} to {}", id, shortcut.target);

        if shortcut.target.is_separator() {
            let paragraph = store
                .insert_after(
                    &conversion.block,
                    BlockType::Paragraph,
                    BlockContent::Text(String::new()),
                )
                .ok_or_else(|| CommandError::UnknownBlock(conversion.block.clone()))?;
            return Ok(EditOutcome::structural(Caret::new(paragraph, 0)));
        }
        let offset = cursor.saturating_sub(shortcut.trigger_len);
        return Ok(EditOutcome::structural(Caret::new(conversion.block, offset)));
    }

    let focus = Caret::new(id, cursor);
    match (changed, expanded) {
        (true, false) => Ok(EditOutcome::text(focus)),
        (_, expanded) => Ok(settled(expanded, focus)),
    }
}

/// Line break at a visible offset.
///
/// Atomic blocks get an empty paragraph after them. An empty list item leaves the list. Any other
/// text block is split; the tail continues the list for list items and becomes a paragraph
/// otherwise.
pub fn line_break(
    store: &mut BlockStore,
    block: &BlockId,
    offset: usize,
) -> Result<EditOutcome, CommandError> {
    let (id, _) = resolve(store, block)?;
    let block_type = store
        .get(&id)
        .map(|b| b.block_type())
        .ok_or_else(|| CommandError::UnknownBlock(id.clone()))?;

    if block_type.is_atomic() {
        let paragraph = store
            .insert_after(&id, BlockType::Paragraph, BlockContent::Text(String::new()))
            .ok_or_else(|| CommandError::UnknownBlock(id.clone()))?;
        return Ok(EditOutcome::structural(Caret::new(paragraph, 0)));
    }

    let markup = text_of(store, &id)?;
    if block_type.is_list_item() && inline::is_blank(&markup) {
        let conversion = store
            .convert(&id, BlockType::Paragraph)
            .ok_or_else(|| CommandError::UnknownBlock(id.clone()))?;
        debug!("empty {} {} exits the list", block_type, id);
        return Ok(EditOutcome::structural(Caret::new(conversion.block, 0)));
    }

    let (before, after) = inline::split_at(&markup, offset);
    store.set_text(&id, &before)?;
    let derived = if block_type.is_list_item() {
        block_type
    } else {
        BlockType::Paragraph
    };
    let created = store
        .insert_after(&id, derived, BlockContent::Text(after))
        .ok_or_else(|| CommandError::UnknownBlock(id.clone()))?;
    debug!("split {} into {} ({})", id, created, derived);
    Ok(EditOutcome::structural(Caret::new(created, 0)))
}

/// Delete intent with the cursor at the very start of a block.
///
/// Empty blocks are removed (the last remaining block becomes an empty paragraph instead).
/// Non-empty blocks merge into the previous text block; a preceding divider or page break is
/// deleted instead. Other atomic predecessors, or no predecessor at all, leave the document as is.
/// Tables, embeds, covers and charts are only removed while they hold nothing.
pub fn delete_backward(store: &mut BlockStore, block: &BlockId) -> Result<EditOutcome, CommandError> {
    let (id, mut expanded) = resolve(store, block)?;
    let current = store
        .get(&id)
        .ok_or_else(|| CommandError::UnknownBlock(id.clone()))?;

    let Some(markup) = current.text().map(str::to_string) else {
        if current.content().is_placeholder() {
            return remove(store, &id);
        }
        debug!("{} {} holds content; not deleted", current.block_type(), id);
        return Ok(settled(expanded, Caret::new(id, 0)));
    };

    if inline::is_blank(&markup) {
        return delete_empty(store, &id);
    }

    let Some(previous) = store.previous(&id).map(|b| b.id().clone()) else {
        return Ok(settled(expanded, Caret::new(id, 0)));
    };
    // A legacy container expands in place; merge into its last item.
    expanded |= resolve(store, &previous)?.1;
    let Some(previous) = store.previous(&id).map(|b| b.id().clone()) else {
        return Ok(settled(expanded, Caret::new(id, 0)));
    };
    let previous_type = store
        .get(&previous)
        .map(|b| b.block_type())
        .ok_or_else(|| CommandError::UnknownBlock(previous.clone()))?;

    if previous_type.is_separator() {
        store.remove(&previous);
        debug!("removed {} {} ahead of {}", previous_type, previous, id);
        return Ok(EditOutcome::structural(Caret::new(id, 0)));
    }
    if !previous_type.is_text_bearing() {
        return Ok(settled(expanded, Caret::new(id, 0)));
    }

    let head = text_of(store, &previous)?;
    let boundary = inline::visible_len(&head);
    store.set_text(&previous, &inline::concat(&head, &markup))?;
    store.remove(&id);
    debug!("merged {} into {}", id, previous);
    Ok(EditOutcome::structural(Caret::new(previous, boundary)))
}

fn delete_empty(store: &mut BlockStore, id: &BlockId) -> Result<EditOutcome, CommandError> {
    if store.len() == 1 {
        let block_type = store.first().block_type();
        if block_type == BlockType::Paragraph && store.first().text() == Some("") {
            return Ok(EditOutcome::unchanged());
        }
        let conversion = store
            .convert(id, BlockType::Paragraph)
            .ok_or_else(|| CommandError::UnknownBlock(id.clone()))?;
        store.set_text(&conversion.block, "")?;
        return Ok(EditOutcome::structural(Caret::new(conversion.block, 0)));
    }
    remove(store, id)
}

/// Remove a block. Focus goes to the end of the previous block, or the start of the next one.
pub fn remove(store: &mut BlockStore, block: &BlockId) -> Result<EditOutcome, CommandError> {
    let focus = match (store.previous(block), store.next(block)) {
        (Some(previous), _) => caret_at_end(store, previous.id()),
        (None, Some(next)) => Caret::new(next.id().clone(), 0),
        (None, None) => Caret::new(block.clone(), 0),
    };
    let removed = store
        .remove(block)
        .ok_or_else(|| CommandError::UnknownBlock(block.clone()))?;
    debug!("removed {} {}", removed.block_type(), block);

    // The only block was replaced by a fresh paragraph.
    let focus = if store.contains(&focus.block) {
        focus
    } else {
        Caret::new(store.first().id().clone(), 0)
    };
    Ok(EditOutcome::structural(focus))
}

/// Convert a block to another type.
pub fn convert(
    store: &mut BlockStore,
    block: &BlockId,
    to: BlockType,
) -> Result<EditOutcome, CommandError> {
    let (id, expanded) = resolve(store, block)?;
    let current = store
        .get(&id)
        .map(|b| b.block_type())
        .ok_or_else(|| CommandError::UnknownBlock(id.clone()))?;
    if current == to.item_type() {
        return Ok(settled(expanded, caret_at_end(store, &id)));
    }
    let conversion = store
        .convert(&id, to)
        .ok_or_else(|| CommandError::UnknownBlock(id.clone()))?;
    let focus = match conversion.relocated {
        Some(relocated) => caret_at_end(store, &relocated),
        None => caret_at_end(store, &conversion.block),
    };
    Ok(EditOutcome::structural(focus))
}

/// Insert a new block after `anchor`.
pub fn insert_after(
    store: &mut BlockStore,
    anchor: &BlockId,
    block_type: BlockType,
    content: BlockContent,
) -> Result<EditOutcome, CommandError> {
    let created = store
        .insert_after(anchor, block_type, content)
        .ok_or_else(|| CommandError::UnknownBlock(anchor.clone()))?;
    Ok(EditOutcome::structural(caret_at_end(store, &created)))
}

/// Insert normalized drafts (paste, generated text) after `anchor`.
pub fn insert_drafts(
    store: &mut BlockStore,
    anchor: &BlockId,
    drafts: Vec<BlockDraft>,
) -> Result<EditOutcome, CommandError> {
    if !store.contains(anchor) {
        return Err(CommandError::UnknownBlock(anchor.clone()));
    }
    if drafts.is_empty() {
        return Ok(EditOutcome::unchanged());
    }
    let ids = store
        .insert_drafts_after(anchor, drafts)
        .ok_or_else(|| CommandError::UnknownBlock(anchor.clone()))?;
    match ids.last() {
        Some(last) => Ok(EditOutcome::structural(caret_at_end(store, last))),
        None => Ok(EditOutcome::unchanged()),
    }
}

/// Replace a selection inside one block with drafts.
///
/// The block keeps the text before the selection, the drafts follow it, and the text after the
/// selection moves into a block of the original type after the drafts. A block left without text
/// is dropped.
pub fn replace_selection_with_drafts(
    store: &mut BlockStore,
    selection: &Selection,
    drafts: Vec<BlockDraft>,
) -> Result<EditOutcome, CommandError> {
    if drafts.is_empty() {
        let start = Caret::new(selection.block.clone(), selection.start);
        let end = Caret::new(selection.block.clone(), selection.end);
        return replace_range(store, &start, &end, "");
    }

    let (id, expanded) = resolve(store, &selection.block)?;
    let markup = text_of(store, &id)?;
    let block_type = store
        .get(&id)
        .map(|b| b.block_type())
        .ok_or_else(|| CommandError::UnknownBlock(id.clone()))?;
    let len = inline::visible_len(&markup);
    let (start, end) = (
        selection.start.min(selection.end).min(len),
        selection.start.max(selection.end).min(len),
    );

    let head = inline::slice(&markup, 0, start);
    let tail = inline::slice(&markup, end, len);
    store.set_text(&id, &head)?;

    let mut ids = store
        .insert_drafts_after(&id, drafts)
        .ok_or_else(|| CommandError::UnknownBlock(id.clone()))?;
    let Some(last) = ids.last().cloned() else {
        return Ok(settled(expanded, Caret::new(id, start)));
    };
    let focus = caret_at_end(store, &last);

    if !inline::is_blank(&tail) {
        let rest = store
            .insert_after(&last, block_type, BlockContent::Text(tail))
            .ok_or_else(|| CommandError::UnknownBlock(last.clone()))?;
        ids.push(rest);
    }
    if inline::is_blank(&head) {
        store.remove(&id);
    }

    debug!("replaced selection in {} with {} blocks", id, ids.len());
    Ok(EditOutcome::structural(focus))
}

/// Replace the span between two carets with plain text.
///
/// Inside one block this is a text edit. Across blocks the span is resolved atomically: the
/// boundary blocks keep their outer parts, which merge into the first text-bearing boundary block,
/// and every block in between is removed. Boundary blocks without text count as enclosed.
pub fn replace_range(
    store: &mut BlockStore,
    start: &Caret,
    end: &Caret,
    text: &str,
) -> Result<EditOutcome, CommandError> {
    let (first_id, mut expanded) = resolve(store, &start.block)?;
    let last_id = if end.block == start.block {
        first_id.clone()
    } else {
        let (id, end_expanded) = resolve(store, &end.block)?;
        expanded |= end_expanded;
        id
    };
    let first_index = store
        .index_of(&first_id)
        .ok_or_else(|| CommandError::UnknownBlock(first_id.clone()))?;
    let last_index = store
        .index_of(&last_id)
        .ok_or_else(|| CommandError::UnknownBlock(last_id.clone()))?;

    let (start, end, first_index, last_index) = if first_index <= last_index {
        (
            Caret::new(first_id, start.offset),
            Caret::new(last_id, end.offset),
            first_index,
            last_index,
        )
    } else {
        (
            Caret::new(last_id, end.offset),
            Caret::new(first_id, start.offset),
            last_index,
            first_index,
        )
    };

    if first_index == last_index {
        return replace_within(store, &start.block, start.offset, end.offset, text, expanded);
    }

    let head = store
        .get(&start.block)
        .and_then(|b| b.text())
        .map(|markup| inline::slice(markup, 0, start.offset))
        .unwrap_or_default();
    let tail = store
        .get(&end.block)
        .and_then(|b| b.text())
        .map(|markup| inline::slice(markup, end.offset, inline::visible_len(markup)))
        .unwrap_or_default();

    let head_len = inline::visible_len(&head);
    let joined = inline::concat(&inline::insert_text(&head, head_len, text), &tail);
    let focus_offset = head_len + text.chars().count();

    let enclosed: Vec<BlockId> = store.blocks()[first_index..=last_index]
        .iter()
        .map(|b| b.id().clone())
        .collect();
    let survivor = [&start.block, &end.block]
        .into_iter()
        .find(|id| store.get(id).is_some_and(|b| b.block_type().is_text_bearing()))
        .cloned();
    let survivor = match survivor {
        Some(id) => id,
        None => store
            .insert_before(&start.block, BlockType::Paragraph, BlockContent::Text(String::new()))
            .ok_or_else(|| CommandError::UnknownBlock(start.block.clone()))?,
    };

    store.set_text(&survivor, &joined)?;
    for id in enclosed.iter().filter(|id| **id != survivor) {
        store.remove(id);
    }

    debug!(
        "range edit removed {} blocks, kept {}",
        enclosed.len() - usize::from(enclosed.contains(&survivor)),
        survivor
    );
    Ok(EditOutcome::structural(Caret::new(survivor, focus_offset)))
}

/// Delete the span between two carets.
pub fn delete_range(
    store: &mut BlockStore,
    start: &Caret,
    end: &Caret,
) -> Result<EditOutcome, CommandError> {
    replace_range(store, start, end, "")
}

fn replace_within(
    store: &mut BlockStore,
    id: &BlockId,
    start: usize,
    end: usize,
    text: &str,
    expanded: bool,
) -> Result<EditOutcome, CommandError> {
    let markup = text_of(store, id)?;
    let len = inline::visible_len(&markup);
    let (start, end) = (start.min(end).min(len), start.max(end).min(len));
    if start == end && text.is_empty() {
        return Ok(settled(expanded, Caret::new(id.clone(), start)));
    }
    let replaced = inline::insert_text(&inline::delete_range(&markup, start, end), start, text);
    let changed = store.set_text(id, &replaced)?;
    let focus = Caret::new(id.clone(), start + text.chars().count());
    match (changed, expanded) {
        (true, false) => Ok(EditOutcome::text(focus)),
        (_, expanded) => Ok(settled(expanded, focus)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn types(store: &BlockStore) -> Vec<BlockType> {
        store.iter().map(|b| b.block_type()).collect()
    }

    fn texts(store: &BlockStore) -> Vec<String> {
        store
            .iter()
            .map(|b| b.text().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_split_heading_tail_becomes_paragraph() {
        let mut store = BlockStore::from_drafts([BlockDraft::text(BlockType::Heading2, "Intro text")]);
        let id = store.first().id().clone();
        let outcome = line_break(&mut store, &id, 5).unwrap();
        assert_eq!(outcome.kind, MutationKind::Structural);
        assert_eq!(types(&store), vec![BlockType::Heading2, BlockType::Paragraph]);
        assert_eq!(texts(&store), vec!["Intro", " text"]);
        assert_eq!(outcome.focus.unwrap().block, *store.at(1).unwrap().id());
    }

    #[test]
    fn test_split_then_merge_restores_markup() {
        let original = "one <b>two three</b> four";
        let mut store = BlockStore::from_drafts([BlockDraft::paragraph(original)]);
        let id = store.first().id().clone();
        line_break(&mut store, &id, 8).unwrap();
        let second = store.at(1).unwrap().id().clone();
        let outcome = delete_backward(&mut store, &second).unwrap();
        assert_eq!(texts(&store), vec![original]);
        assert_eq!(outcome.focus, Some(Caret::new(id, 8)));
    }

    #[test]
    fn test_enter_on_empty_list_item_exits_list() {
        let mut store = BlockStore::from_drafts([
            BlockDraft::text(BlockType::Bullet, "one"),
            BlockDraft::text(BlockType::Bullet, ""),
        ]);
        let empty = store.at(1).unwrap().id().clone();
        line_break(&mut store, &empty, 0).unwrap();
        assert_eq!(types(&store), vec![BlockType::Bullet, BlockType::Paragraph]);
        assert_ne!(store.at(1).unwrap().id(), &empty);
    }

    #[test]
    fn test_line_break_after_atomic_block() {
        let mut store = BlockStore::from_drafts([BlockDraft::empty(BlockType::Divider)]);
        let id = store.first().id().clone();
        line_break(&mut store, &id, 0).unwrap();
        assert_eq!(types(&store), vec![BlockType::Divider, BlockType::Paragraph]);
    }

    #[test]
    fn test_merge_into_divider_removes_divider() {
        let mut store = BlockStore::from_drafts([
            BlockDraft::paragraph("above"),
            BlockDraft::empty(BlockType::Divider),
            BlockDraft::paragraph("below"),
        ]);
        let below = store.at(2).unwrap().id().clone();
        delete_backward(&mut store, &below).unwrap();
        assert_eq!(texts(&store), vec!["above", "below"]);
    }

    #[test]
    fn test_merge_without_previous_is_noop() {
        let mut store = BlockStore::from_drafts([BlockDraft::paragraph("only")]);
        let id = store.first().id().clone();
        assert!(!delete_backward(&mut store, &id).unwrap().is_mutation());
    }

    #[test]
    fn test_backspace_keeps_table_with_cells() {
        let mut store = BlockStore::from_drafts([
            BlockDraft::paragraph("above"),
            BlockDraft::new(
                BlockType::Table,
                BlockContent::Table(crate::block::TableContent {
                    rows: vec![vec!["Q1".into(), "12".into()]],
                }),
            ),
        ]);
        let table = store.at(1).unwrap().id().clone();
        assert!(!delete_backward(&mut store, &table).unwrap().is_mutation());
        assert_eq!(types(&store), vec![BlockType::Paragraph, BlockType::Table]);
    }

    #[test]
    fn test_backspace_removes_unset_embed() {
        let mut store = BlockStore::from_drafts([
            BlockDraft::paragraph("above"),
            BlockDraft::empty(BlockType::Embed),
        ]);
        let embed = store.at(1).unwrap().id().clone();
        let outcome = delete_backward(&mut store, &embed).unwrap();
        assert_eq!(outcome.kind, MutationKind::Structural);
        assert_eq!(types(&store), vec![BlockType::Paragraph]);
        assert_eq!(outcome.focus.map(|c| c.offset), Some(5));
    }

    #[test]
    fn test_same_type_convert_of_legacy_container_reports_expansion() {
        let mut store =
            BlockStore::from_json(r#"[{"type":"bullet-list","items":["alpha","beta"]}]"#).unwrap();
        let container = store.first().id().clone();

        let outcome = convert(&mut store, &container, BlockType::Bullet).unwrap();
        assert_eq!(outcome.kind, MutationKind::Structural);
        assert_eq!(types(&store), vec![BlockType::Bullet, BlockType::Bullet]);
        assert_eq!(texts(&store), vec!["alpha", "beta"]);
        assert!(!store.contains(&container));
    }

    #[test]
    fn test_delete_empty_focuses_previous_end() {
        let mut store = BlockStore::from_drafts([
            BlockDraft::paragraph("keep"),
            BlockDraft::paragraph(""),
        ]);
        let first = store.first().id().clone();
        let empty = store.at(1).unwrap().id().clone();
        let outcome = delete_backward(&mut store, &empty).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(outcome.focus, Some(Caret::new(first, 4)));
    }

    #[test]
    fn test_delete_last_empty_heading_becomes_paragraph() {
        let mut store = BlockStore::from_drafts([BlockDraft::text(BlockType::Heading1, "")]);
        let id = store.first().id().clone();
        delete_backward(&mut store, &id).unwrap();
        assert_eq!(types(&store), vec![BlockType::Paragraph]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_shortcut_converts_only_active_block() {
        let mut store = BlockStore::from_drafts([
            BlockDraft::paragraph("# not me"),
            BlockDraft::paragraph(""),
        ]);
        let target = store.at(1).unwrap().id().clone();
        let outcome = text_changed(&mut store, &target, "## Title", 8).unwrap();
        assert_eq!(types(&store), vec![BlockType::Paragraph, BlockType::Heading2]);
        assert_eq!(texts(&store), vec!["# not me", "Title"]);
        assert_eq!(outcome.focus.unwrap().offset, 5);
    }

    #[test]
    fn test_divider_shortcut_adds_paragraph() {
        let mut store = BlockStore::new();
        let id = store.first().id().clone();
        let outcome = text_changed(&mut store, &id, "---", 3).unwrap();
        assert_eq!(types(&store), vec![BlockType::Divider, BlockType::Paragraph]);
        assert_eq!(outcome.focus.unwrap().block, *store.at(1).unwrap().id());
    }

    #[test]
    fn test_plain_typing_is_text_mutation() {
        let mut store = BlockStore::new();
        let id = store.first().id().clone();
        let outcome = text_changed(&mut store, &id, "hello", 5).unwrap();
        assert_eq!(outcome.kind, MutationKind::Text);
        assert_eq!(
            text_changed(&mut store, &id, "hello", 5).unwrap().kind,
            MutationKind::None
        );
    }

    #[test]
    fn test_range_delete_across_blocks() {
        let mut store = BlockStore::from_drafts([
            BlockDraft::paragraph("alpha"),
            BlockDraft::text(BlockType::Heading1, "middle"),
            BlockDraft::empty(BlockType::Divider),
            BlockDraft::paragraph("omega"),
        ]);
        let first = store.first().id().clone();
        let last = store.at(3).unwrap().id().clone();
        let outcome =
            replace_range(&mut store, &Caret::new(first.clone(), 2), &Caret::new(last, 3), "X")
                .unwrap();
        assert_eq!(texts(&store), vec!["alXga"]);
        assert_eq!(outcome.focus, Some(Caret::new(first, 3)));
    }

    #[test]
    fn test_range_with_atomic_start_uses_end_block() {
        let mut store = BlockStore::from_drafts([
            BlockDraft::empty(BlockType::Divider),
            BlockDraft::paragraph("tail text"),
        ]);
        let divider = store.first().id().clone();
        let para = store.at(1).unwrap().id().clone();
        delete_range(&mut store, &Caret::new(divider, 0), &Caret::new(para.clone(), 4)).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.first().id(), &para);
        assert_eq!(texts(&store), vec![" text"]);
    }

    #[test]
    fn test_replace_selection_with_drafts_keeps_tail() {
        let mut store = BlockStore::from_drafts([BlockDraft::paragraph("before SEL after")]);
        let id = store.first().id().clone();
        let selection = Selection::capture(&store, &id, 7, 10).unwrap();
        replace_selection_with_drafts(
            &mut store,
            &selection,
            vec![
                BlockDraft::text(BlockType::Heading2, "New"),
                BlockDraft::paragraph("Body"),
            ],
        )
        .unwrap();
        assert_eq!(
            types(&store),
            vec![
                BlockType::Paragraph,
                BlockType::Heading2,
                BlockType::Paragraph,
                BlockType::Paragraph
            ]
        );
        assert_eq!(texts(&store), vec!["before ", "New", "Body", " after"]);
    }

    #[test]
    fn test_unknown_block_is_reported() {
        let mut store = BlockStore::new();
        let err = line_break(&mut store, &BlockId::new("missing"), 0).unwrap_err();
        assert!(matches!(err, CommandError::UnknownBlock(_)));
    }
}
