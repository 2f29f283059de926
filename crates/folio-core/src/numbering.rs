//! List numbering resolver.
//!
//! Ordinals are derived, never stored: every call rescans the document. A *group* is a run of
//! consecutive blocks of the same list kind; any other block (or a change of kind) ends it and the
//! next group restarts at 1.

use std::collections::HashMap;

use crate::block::{Block, BlockContent, BlockId, ListKind};

/// A run of consecutive list blocks of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListGroup {
    /// Flavour shared by all members.
    pub kind: ListKind,
    /// Index of the first member in document order.
    pub start: usize,
    /// Members, in order.
    pub members: Vec<BlockId>,
}

/// Resolved numbering for one document state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListNumbering {
    ordinals: HashMap<BlockId, usize>,
    groups: Vec<ListGroup>,
}

impl ListNumbering {
    /// Display ordinal of a numbered block. Legacy containers report the ordinal of their first
    /// item.
    pub fn ordinal(&self, id: &BlockId) -> Option<usize> {
        self.ordinals.get(id).copied()
    }

    /// All groups in document order.
    pub fn groups(&self) -> &[ListGroup] {
        &self.groups
    }

    /// Group containing `id`, if it is a list block.
    pub fn group_of(&self, id: &BlockId) -> Option<&ListGroup> {
        self.groups.iter().find(|g| g.members.contains(id))
    }
}

/// Resolve ordinals for every numbered block.
///
/// ```rust
/// use folio_core::{BlockDraft, BlockStore, BlockType, numbering::resolve};
///
/// let store = BlockStore::from_drafts([
///     BlockDraft::text(BlockType::Number, "a"),
///     BlockDraft::text(BlockType::Number, "b"),
///     BlockDraft::paragraph("break"),
///     BlockDraft::text(BlockType::Number, "c"),
/// ]);
/// let numbering = resolve(store.blocks());
/// let ordinals: Vec<_> = store.iter().map(|b| numbering.ordinal(b.id())).collect();
/// assert_eq!(ordinals, vec![Some(1), Some(2), None, Some(1)]);
/// ```
pub fn resolve(blocks: &[Block]) -> ListNumbering {
    let mut numbering = ListNumbering::default();
    let mut current: Option<ListGroup> = None;
    let mut counter = 0usize;

    for (index, block) in blocks.iter().enumerate() {
        let Some(kind) = block.block_type().list_kind() else {
            if let Some(group) = current.take() {
                numbering.groups.push(group);
            }
            counter = 0;
            continue;
        };

        let continues = current.as_ref().is_some_and(|g| g.kind == kind);
        if !continues {
            if let Some(group) = current.take() {
                numbering.groups.push(group);
            }
            counter = 0;
            current = Some(ListGroup {
                kind,
                start: index,
                members: Vec::new(),
            });
        }

        if let Some(group) = current.as_mut() {
            group.members.push(block.id().clone());
        }

        // Legacy containers advance the counter by their item count.
        let items = match block.content() {
            BlockContent::Items(items) => items.len().max(1),
            _ => 1,
        };
        if kind == ListKind::Number {
            numbering.ordinals.insert(block.id().clone(), counter + 1);
        }
        counter += items;
    }

    if let Some(group) = current.take() {
        numbering.groups.push(group);
    }
    numbering
}
