//! Block Store
//!
//! Owns the canonical ordered list of blocks. Every other component reads the document through
//! the store; pages, list ordinals and history snapshots are projections of its linear order.
//!
//! # Invariants
//!
//! - The store is never empty: removing the last block leaves an empty paragraph behind.
//! - No two blocks share an id. Conversion allocates a fresh id instead of retyping in place.
//!
//! # Example
//!
//! ```rust
//! use folio_core::{BlockContent, BlockStore, BlockType};
//!
//! let mut store = BlockStore::new();
//! let first = store.first().id().clone();
//! let heading = store
//!     .insert_after(&first, BlockType::Heading1, BlockContent::Text("Summary".into()))
//!     .unwrap();
//! let converted = store.convert(&heading, BlockType::Paragraph).unwrap();
//! assert_ne!(converted.block, heading);
//! assert_eq!(store.len(), 2);
//! ```

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::CommandError;
use crate::block::{Block, BlockContent, BlockDraft, BlockId, BlockRecord, BlockType};
use crate::convert::{extract_content, plan_conversion};
use crate::inline;

/// Outcome of [`BlockStore::convert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// Id of the replacement block (equal to the source id only when the type did not change).
    pub block: BlockId,
    /// Paragraph created to hold text the target type could not carry.
    pub relocated: Option<BlockId>,
}

/// Canonical ordered block list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockStore {
    blocks: Vec<Block>,
}

impl Default for BlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore {
    /// A document holding a single empty paragraph.
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::from_draft(BlockDraft::empty(BlockType::Paragraph))],
        }
    }

    /// Build a store from drafts (fresh ids are allocated).
    pub fn from_drafts(drafts: impl IntoIterator<Item = BlockDraft>) -> Self {
        let mut store = Self { blocks: Vec::new() };
        for draft in drafts {
            store.place(store.blocks.len(), draft);
        }
        store.ensure_not_empty();
        store
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always `false`; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All blocks in document order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Iterate blocks in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// The first block.
    pub fn first(&self) -> &Block {
        // ensure_not_empty runs after every removal
        &self.blocks[0]
    }

    /// Look a block up by id.
    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id() == id)
    }

    pub(crate) fn get_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id() == id)
    }

    /// Whether `id` is present.
    pub fn contains(&self, id: &BlockId) -> bool {
        self.index_of(id).is_some()
    }

    /// Position of a block in document order.
    pub fn index_of(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id() == id)
    }

    /// Block at `index`.
    pub fn at(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Previous sibling.
    pub fn previous(&self, id: &BlockId) -> Option<&Block> {
        let index = self.index_of(id)?;
        index.checked_sub(1).and_then(|i| self.blocks.get(i))
    }

    /// Next sibling.
    pub fn next(&self, id: &BlockId) -> Option<&Block> {
        let index = self.index_of(id)?;
        self.blocks.get(index + 1)
    }

    /// Append a new block at the end of the document.
    pub fn create(&mut self, block_type: BlockType, content: BlockContent) -> BlockId {
        let (id, _) = self.place(self.blocks.len(), BlockDraft::new(block_type, content));
        id
    }

    /// Insert a new block right after `anchor`. Returns `None` when the anchor is unknown.
    pub fn insert_after(
        &mut self,
        anchor: &BlockId,
        block_type: BlockType,
        content: BlockContent,
    ) -> Option<BlockId> {
        let index = self.index_of(anchor)?;
        Some(self.insert_at(index + 1, BlockDraft::new(block_type, content)))
    }

    /// Insert a new block right before `anchor`. Returns `None` when the anchor is unknown.
    pub fn insert_before(
        &mut self,
        anchor: &BlockId,
        block_type: BlockType,
        content: BlockContent,
    ) -> Option<BlockId> {
        let index = self.index_of(anchor)?;
        Some(self.insert_at(index, BlockDraft::new(block_type, content)))
    }

    /// Insert drafts, in order, right after `anchor`.
    pub fn insert_drafts_after(
        &mut self,
        anchor: &BlockId,
        drafts: impl IntoIterator<Item = BlockDraft>,
    ) -> Option<Vec<BlockId>> {
        let mut index = self.index_of(anchor)? + 1;
        let mut ids = Vec::new();
        for draft in drafts {
            let (id, spilled) = self.place(index, draft);
            ids.push(id);
            index += 1;
            if let Some(spilled) = spilled {
                ids.push(spilled);
                index += 1;
            }
        }
        Some(ids)
    }

    /// Insert a draft at a position (clamped to the end).
    ///
    /// Text the draft's type cannot hold lands in a paragraph right after the new block.
    pub fn insert_at(&mut self, index: usize, draft: BlockDraft) -> BlockId {
        let (id, _) = self.place(index, draft);
        id
    }

    fn place(&mut self, index: usize, draft: BlockDraft) -> (BlockId, Option<BlockId>) {
        let index = index.min(self.blocks.len());
        let (draft, spill) =
            BlockDraft::new(draft.block_type.item_type(), draft.content).detach_text();
        let block = Block::from_draft(draft);
        let id = block.id().clone();
        self.blocks.insert(index, block);

        let spilled = spill.map(|paragraph| {
            let block = Block::from_draft(paragraph);
            let spilled = block.id().clone();
            debug!("text of {} moved into paragraph {}", id, spilled);
            self.blocks.insert(index + 1, block);
            spilled
        });
        (id, spilled)
    }

    /// Remove a block. Removing the only block leaves an empty paragraph in its place.
    pub fn remove(&mut self, id: &BlockId) -> Option<Block> {
        let index = self.index_of(id)?;
        let removed = self.blocks.remove(index);
        self.ensure_not_empty();
        Some(removed)
    }

    /// Type-aware text of a block (see [`extract_content`]).
    pub fn extract_content(&self, id: &BlockId) -> Option<String> {
        self.get(id).map(extract_content)
    }

    /// Replace the markup of a text-bearing block. Returns whether anything changed.
    pub fn set_text(&mut self, id: &BlockId, markup: &str) -> Result<bool, CommandError> {
        let block = self
            .get_mut(id)
            .ok_or_else(|| CommandError::UnknownBlock(id.clone()))?;
        let block_type = block.block_type();
        match block.content_mut() {
            BlockContent::Text(current) => {
                if current == markup {
                    return Ok(false);
                }
                *current = markup.to_string();
                Ok(true)
            }
            _ => Err(CommandError::NotTextBearing {
                id: id.clone(),
                block_type,
            }),
        }
    }

    /// Replace the payload of a block, reshaping it to the block's type if necessary.
    pub fn set_content(&mut self, id: &BlockId, content: BlockContent) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let old = &self.blocks[index];
        let (draft, spill) = BlockDraft::new(old.block_type(), content).detach_text();
        let replacement = Block::with_id(old.id().clone(), draft.block_type, draft.content);
        let mut changed = replacement != *old;
        self.blocks[index] = replacement;

        if let Some(paragraph) = spill {
            let block = Block::from_draft(paragraph);
            debug!("text of {} moved into paragraph {}", id, block.id());
            self.blocks.insert(index + 1, block);
            changed = true;
        }
        changed
    }

    /// Convert a block to another type.
    ///
    /// The replacement gets a fresh id so that selections and snapshots holding the old id can
    /// never address a block of a different type. Text the target cannot hold (dividers,
    /// page breaks, embeds) is moved into a new paragraph right after the replacement.
    pub fn convert(&mut self, id: &BlockId, target: BlockType) -> Option<Conversion> {
        let index = self.index_of(id)?;
        let target = target.item_type();
        let source = &self.blocks[index];

        if source.block_type() == target {
            return Some(Conversion {
                block: id.clone(),
                relocated: None,
            });
        }

        let plan = plan_conversion(source, target);
        debug!(
            from = %source.block_type(),
            to = %target,
            relocated = plan.relocated.is_some(),
            "converting block {}",
            id
        );

        let replacement = Block::from_draft(BlockDraft::new(target, plan.content));
        let new_id = replacement.id().clone();
        self.blocks[index] = replacement;

        let relocated = plan
            .relocated
            .map(|text| self.insert_at(index + 1, BlockDraft::paragraph(text)));

        Some(Conversion {
            block: new_id,
            relocated,
        })
    }

    /// Normalize a legacy `bullet-list` / `number-list` container into one block per item.
    ///
    /// Returns the id callers should operate on: the first item for legacy containers, the
    /// unchanged id otherwise. `None` when the id is unknown.
    pub fn touch(&mut self, id: &BlockId) -> Option<BlockId> {
        let index = self.index_of(id)?;
        let block = &self.blocks[index];
        if !block.block_type().is_legacy_container() {
            return Some(id.clone());
        }

        let item_type = block.block_type().item_type();
        let mut items = match block.content() {
            BlockContent::Items(items) => items.clone(),
            _ => Vec::new(),
        };
        if items.is_empty() {
            items.push(String::new());
        }
        debug!(
            "expanding legacy {} {} into {} items",
            block.block_type(),
            id,
            items.len()
        );

        let expanded: Vec<Block> = items
            .into_iter()
            .map(|item| Block::from_draft(BlockDraft::text(item_type, item)))
            .collect();
        let first = expanded[0].id().clone();
        self.blocks.splice(index..=index, expanded);
        Some(first)
    }

    /// Expand every legacy container in the document.
    pub fn normalize_legacy(&mut self) -> usize {
        let legacy: Vec<BlockId> = self
            .blocks
            .iter()
            .filter(|b| b.block_type().is_legacy_container())
            .map(|b| b.id().clone())
            .collect();
        for id in &legacy {
            self.touch(id);
        }
        legacy.len()
    }

    /// Deep copy of the document with transient selection-lock markers removed.
    pub fn snapshot_blocks(&self) -> Vec<Block> {
        self.blocks
            .iter()
            .map(|block| match block.content() {
                BlockContent::Text(markup) if inline::has_lock_markers(markup) => {
                    let mut clean = block.clone();
                    *clean.content_mut() = BlockContent::Text(inline::strip_lock_markers(markup));
                    clean
                }
                _ => block.clone(),
            })
            .collect()
    }

    /// Replace the whole document (used by history restore).
    pub fn restore(&mut self, blocks: Vec<Block>) {
        self.blocks = blocks;
        self.ensure_not_empty();
        self.ensure_unique_ids();
    }

    /// Ordered persistence records.
    pub fn serialize(&self) -> Vec<BlockRecord> {
        self.snapshot_blocks().iter().map(Block::to_record).collect()
    }

    /// Rehydrate a store from records, regenerating missing, malformed or duplicate ids.
    pub fn deserialize(records: impl IntoIterator<Item = BlockRecord>) -> Self {
        let mut seen: HashSet<String> = HashSet::new();
        let mut blocks = Vec::new();

        for mut record in records {
            let stored = record.id.take().map(BlockId::new);
            let id = match stored {
                Some(id) if id.is_well_formed() && !seen.contains(id.as_str()) => id,
                other => {
                    let fresh = BlockId::generate();
                    warn!(
                        "regenerating block id {:?} -> {}",
                        other.as_ref().map(BlockId::as_str),
                        fresh
                    );
                    fresh
                }
            };
            seen.insert(id.as_str().to_string());

            let (draft, spill) = record.into_draft().detach_text();
            if let Some(paragraph) = spill {
                let moved = Block::from_draft(paragraph);
                warn!(
                    "{} {} carried text; moved into paragraph {}",
                    draft.block_type,
                    id,
                    moved.id()
                );
                seen.insert(moved.id().as_str().to_string());
                blocks.push(Block::with_id(id, draft.block_type, draft.content));
                blocks.push(moved);
            } else {
                blocks.push(Block::with_id(id, draft.block_type, draft.content));
            }
        }

        let mut store = Self { blocks };
        store.ensure_not_empty();
        store
    }

    /// Serialize to a JSON array.
    pub fn to_json(&self) -> Result<String, CommandError> {
        Ok(serde_json::to_string(&self.serialize())?)
    }

    /// Deserialize from a JSON array.
    pub fn from_json(json: &str) -> Result<Self, CommandError> {
        let records: Vec<BlockRecord> = serde_json::from_str(json)?;
        Ok(Self::deserialize(records))
    }

    /// Give every block that shares an id with an earlier block a fresh id.
    ///
    /// Returns the number of ids regenerated.
    pub fn ensure_unique_ids(&mut self) -> usize {
        let mut seen: HashSet<BlockId> = HashSet::with_capacity(self.blocks.len());
        let mut regenerated = 0usize;
        for block in &mut self.blocks {
            if !block.id().is_well_formed() || seen.contains(block.id()) {
                let fresh = BlockId::generate();
                warn!("duplicate block id {} replaced by {}", block.id(), fresh);
                block.set_id(fresh);
                regenerated += 1;
            }
            seen.insert(block.id().clone());
        }
        regenerated
    }

    fn ensure_not_empty(&mut self) {
        if self.blocks.is_empty() {
            self.blocks
                .push(Block::from_draft(BlockDraft::empty(BlockType::Paragraph)));
        }
    }
}
