//! Selection model and selection lock.
//!
//! A [`Selection`] addresses a span of visible characters inside one block, independent of any
//! view. A *locked* selection is additionally written into the block content as zero-width lock
//! markers so it stays identifiable after the editing surface loses focus (for example while an
//! auxiliary panel is open). Releasing the lock removes exactly the inserted markers.

use tracing::{debug, warn};

use crate::block::{BlockContent, BlockId};
use crate::inline;
use crate::store::BlockStore;

/// Cursor position: a visible character offset inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Caret {
    /// Block holding the cursor.
    pub block: BlockId,
    /// Visible character offset.
    pub offset: usize,
}

impl Caret {
    /// Create a caret.
    pub fn new(block: BlockId, offset: usize) -> Self {
        Self { block, offset }
    }
}

/// A span of content inside one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Anchor block.
    pub block: BlockId,
    /// Start offset (visible chars, inclusive).
    pub start: usize,
    /// End offset (visible chars, exclusive).
    pub end: usize,
    /// Selected visible text at capture time.
    pub text: String,
}

impl Selection {
    /// Capture a selection from the current store content. Offsets are ordered and clamped;
    /// returns `None` when the block is unknown or not text-bearing.
    pub fn capture(store: &BlockStore, block: &BlockId, start: usize, end: usize) -> Option<Self> {
        let markup = store.get(block)?.text()?;
        let visible = inline::visible_text(markup);
        let len = visible.chars().count();
        let (start, end) = (start.min(end).min(len), start.max(end).min(len));
        let text = visible.chars().skip(start).take(end - start).collect();
        Some(Self {
            block: block.clone(),
            start,
            end,
            text,
        })
    }

    /// Whether the selection spans no characters.
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Current and locked selection state of a session.
#[derive(Debug, Clone, Default)]
pub struct SelectionModel {
    current: Option<Selection>,
    locked: Option<Selection>,
}

impl SelectionModel {
    /// Empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Live selection reported by the editing surface.
    pub fn current(&self) -> Option<&Selection> {
        self.current.as_ref()
    }

    /// Locked selection, if any.
    pub fn locked(&self) -> Option<&Selection> {
        self.locked.as_ref()
    }

    /// Whether a lock is held.
    pub fn is_locked(&self) -> bool {
        self.locked.is_some()
    }

    /// Replace the live selection.
    pub fn set(&mut self, selection: Selection) {
        self.current = Some(selection);
    }

    /// Forget the live selection (e.g. focus moved away). A lock survives this.
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Lock a selection by writing lock markers into its block.
    ///
    /// An existing lock is released first. Returns `false` (and changes nothing) for collapsed
    /// selections or blocks that cannot carry markers.
    pub fn lock(&mut self, store: &mut BlockStore, selection: Selection) -> bool {
        self.release(store);

        let Some(markup) = store.get(&selection.block).and_then(|b| b.text()) else {
            return false;
        };
        let Some(locked) = inline::insert_lock_markers(markup, selection.start, selection.end)
        else {
            return false;
        };
        if store.set_text(&selection.block, &locked).is_err() {
            return false;
        }

        debug!(
            "locked selection {}..{} in {}",
            selection.start, selection.end, selection.block
        );
        self.locked = Some(selection);
        true
    }

    /// Release the lock, restoring the content byte-for-byte (minus any edits made meanwhile).
    ///
    /// Returns the released selection. If the locked block was replaced in the meantime, markers
    /// are stripped from whichever block carries them.
    pub fn release(&mut self, store: &mut BlockStore) -> Option<Selection> {
        let locked = self.locked.take()?;

        let carriers: Vec<(BlockId, String)> = store
            .iter()
            .filter_map(|b| match b.content() {
                BlockContent::Text(markup) if inline::has_lock_markers(markup) => {
                    Some((b.id().clone(), inline::strip_lock_markers(markup)))
                }
                _ => None,
            })
            .collect();
        for (id, clean) in carriers {
            if let Err(err) = store.set_text(&id, &clean) {
                warn!("could not strip lock markers from {}: {}", id, err);
            }
        }

        debug!("released selection lock in {}", locked.block);
        Some(locked)
    }

    /// Drop state that refers to blocks no longer present (after undo/redo or deletion).
    pub fn retain_valid(&mut self, store: &BlockStore) {
        if self
            .current
            .as_ref()
            .is_some_and(|s| !store.contains(&s.block))
        {
            self.current = None;
        }
        let lock_alive = store
            .iter()
            .any(|b| b.text().is_some_and(inline::has_lock_markers));
        if !lock_alive {
            self.locked = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockDraft, BlockType};

    #[test]
    fn test_capture_orders_and_clamps() {
        let store = BlockStore::from_drafts([BlockDraft::paragraph("hello <b>world</b>")]);
        let id = store.first().id().clone();
        let sel = Selection::capture(&store, &id, 99, 6).unwrap();
        assert_eq!((sel.start, sel.end), (6, 11));
        assert_eq!(sel.text, "world");
    }

    #[test]
    fn test_lock_survives_clear_and_releases_byte_identical() {
        let original = "alpha <i>beta</i> &amp; gamma";
        let mut store = BlockStore::from_drafts([BlockDraft::paragraph(original)]);
        let id = store.first().id().clone();
        let mut model = SelectionModel::new();

        let sel = Selection::capture(&store, &id, 3, 9).unwrap();
        model.set(sel.clone());
        assert!(model.lock(&mut store, sel));
        assert_ne!(store.first().text(), Some(original));

        model.clear();
        assert!(model.current().is_none());
        assert!(model.is_locked());

        let released = model.release(&mut store).unwrap();
        assert_eq!(released.text, "ha bet");
        assert_eq!(store.first().text(), Some(original));
        assert!(!model.is_locked());
    }

    #[test]
    fn test_lock_rejects_collapsed_and_structural() {
        let mut store = BlockStore::from_drafts([
            BlockDraft::paragraph("abc"),
            BlockDraft::empty(BlockType::Divider),
        ]);
        let para = store.first().id().clone();
        let divider = store.at(1).unwrap().id().clone();
        let mut model = SelectionModel::new();

        let collapsed = Selection::capture(&store, &para, 1, 1).unwrap();
        assert!(!model.lock(&mut store, collapsed));
        assert!(Selection::capture(&store, &divider, 0, 1).is_none());
        assert!(!model.is_locked());
    }

    #[test]
    fn test_retain_valid_drops_missing_blocks() {
        let mut store = BlockStore::from_drafts([BlockDraft::paragraph("abc")]);
        let id = store.first().id().clone();
        let mut model = SelectionModel::new();
        model.set(Selection::capture(&store, &id, 0, 1).unwrap());
        store.remove(&id);
        model.retain_valid(&store);
        assert!(model.current().is_none());
    }
}
