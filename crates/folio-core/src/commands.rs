//! Command Interface Layer
//!
//! Provides a unified command interface for frontend integration.
//!
//! # Overview
//!
//! Edit intents coming from a view adapter are expressed as [`Command`] values:
//!
//! - **Edit**: text changes, line breaks, deletes, conversions, range edits, draft insertion
//! - **Selection**: set, clear, lock and release the selection
//! - **History**: undo, redo and explicit checkpoints
//! - **Layout**: reflow or rebuild the page partition
//!
//! [`CommandExecutor`] owns the document and the selection model and runs edit and selection
//! commands. History and layout commands need the timers and the pagination engine, so they are
//! handled by [`EditorSession`](crate::EditorSession), which wraps the executor.
//!
//! # Example
//!
//! ```rust
//! use folio_core::{BlockType, CommandExecutor, CommandResult, EditCommand};
//!
//! let mut executor = CommandExecutor::empty();
//! let block = executor.store().first().id().clone();
//!
//! let result = executor
//!     .execute_edit(EditCommand::TextChanged {
//!         block,
//!         content: "- groceries".to_string(),
//!         cursor: 11,
//!     })
//!     .unwrap();
//! assert!(matches!(result, CommandResult::Edited(_)));
//! assert_eq!(executor.store().first().block_type(), BlockType::Bullet);
//! ```

use tracing::{debug, warn};

use crate::block::{BlockContent, BlockDraft, BlockId, BlockType};
use crate::editing::{self, EditOutcome};
use crate::error::CommandError;
use crate::inline;
use crate::pagination::{ReflowRejected, ReflowReport};
use crate::selection::{Caret, Selection, SelectionModel};
use crate::store::BlockStore;

/// Document editing commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditCommand {
    /// The editing surface reports the new markup of a block (keystroke level).
    TextChanged {
        /// Edited block.
        block: BlockId,
        /// Full new markup of the block.
        content: String,
        /// Cursor offset after the change (visible chars).
        cursor: usize,
    },
    /// Enter pressed at a visible offset.
    LineBreak {
        /// Block holding the cursor.
        block: BlockId,
        /// Cursor offset.
        offset: usize,
    },
    /// Delete pressed with the cursor at the start of a block.
    DeleteBackward {
        /// Block holding the cursor.
        block: BlockId,
    },
    /// Change the type of a block.
    Convert {
        /// Block to convert.
        block: BlockId,
        /// Target type.
        to: BlockType,
    },
    /// Insert a new block after an anchor.
    InsertAfter {
        /// Existing block.
        anchor: BlockId,
        /// Type of the new block.
        block_type: BlockType,
        /// Payload of the new block.
        content: BlockContent,
    },
    /// Remove a block.
    Remove {
        /// Block to remove.
        block: BlockId,
    },
    /// Replace a (possibly multi-block) span with plain text.
    ReplaceRange {
        /// Span start.
        start: Caret,
        /// Span end.
        end: Caret,
        /// Replacement text.
        text: String,
    },
    /// Delete a (possibly multi-block) span.
    DeleteRange {
        /// Span start.
        start: Caret,
        /// Span end.
        end: Caret,
    },
    /// Insert block drafts (paste, generated content) after an anchor.
    InsertDrafts {
        /// Existing block.
        anchor: BlockId,
        /// Drafts in document order.
        drafts: Vec<BlockDraft>,
    },
    /// Replace a selection inside one block with block drafts.
    ReplaceSelectionWithDrafts {
        /// Selection to replace.
        selection: Selection,
        /// Drafts in document order.
        drafts: Vec<BlockDraft>,
    },
}

/// Selection commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionCommand {
    /// Report the live selection.
    Set {
        /// Anchor block.
        block: BlockId,
        /// Start offset (visible chars).
        start: usize,
        /// End offset (visible chars).
        end: usize,
    },
    /// The editing surface lost its selection. A lock survives this.
    Clear,
    /// Lock the live selection.
    Lock,
    /// Release the lock.
    Release,
}

/// History commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryCommand {
    /// Undo the last edit.
    Undo,
    /// Redo the last undone edit.
    Redo,
    /// Commit a pending typing snapshot now instead of waiting for the debounce.
    Checkpoint,
}

/// Layout commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutCommand {
    /// Reflow the current pages now.
    Reflow,
    /// Paginate from scratch.
    Rebuild,
}

/// Unified command enum
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Document editing commands
    Edit(EditCommand),
    /// Selection commands
    Selection(SelectionCommand),
    /// History commands
    History(HistoryCommand),
    /// Layout commands
    Layout(LayoutCommand),
}

/// Command execution result
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Success, no return value
    Success,
    /// An edit changed the document.
    Edited(EditOutcome),
    /// The selection state after a selection command.
    Selection(Option<Selection>),
    /// A reflow ran.
    Reflowed(ReflowReport),
    /// A reflow was requested but could not run this time; it is retried on a later tick.
    ReflowSkipped(ReflowRejected),
    /// A snapshot was restored by undo or redo.
    Restored,
    /// The command addressed something that does not exist (or changed nothing).
    Noop,
    /// Undo requested with an empty undo stack.
    NothingToUndo,
    /// Redo requested with an empty redo stack.
    NothingToRedo,
}

/// Command executor
///
/// Owns the [`BlockStore`] and [`SelectionModel`] and applies edit and selection commands to
/// them. Commands addressing unknown blocks are logged and resolve to [`CommandResult::Noop`].
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    store: BlockStore,
    selection: SelectionModel,
    last_outcome: Option<EditOutcome>,
}

impl CommandExecutor {
    /// Create an executor over an existing document.
    pub fn new(store: BlockStore) -> Self {
        Self {
            store,
            selection: SelectionModel::new(),
            last_outcome: None,
        }
    }

    /// Create an executor over a document holding one empty paragraph.
    pub fn empty() -> Self {
        Self::new(BlockStore::new())
    }

    /// The document.
    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    /// Selection state.
    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    /// Outcome of the most recent edit command, if it changed anything.
    pub fn last_outcome(&self) -> Option<&EditOutcome> {
        self.last_outcome.as_ref()
    }

    /// Replace the whole document (load, history restore).
    pub(crate) fn replace_blocks(&mut self, store: BlockStore) {
        self.store = store;
        self.selection.retain_valid(&self.store);
    }

    /// Execute an edit command.
    pub fn execute_edit(&mut self, command: EditCommand) -> Result<CommandResult, CommandError> {
        self.last_outcome = None;
        debug!(?command, "edit");

        let result = match command {
            EditCommand::TextChanged {
                block,
                content,
                cursor,
            } => editing::text_changed(&mut self.store, &block, &content, cursor),
            EditCommand::LineBreak { block, offset } => {
                editing::line_break(&mut self.store, &block, offset)
            }
            EditCommand::DeleteBackward { block } => {
                editing::delete_backward(&mut self.store, &block)
            }
            EditCommand::Convert { block, to } => editing::convert(&mut self.store, &block, to),
            EditCommand::InsertAfter {
                anchor,
                block_type,
                content,
            } => editing::insert_after(&mut self.store, &anchor, block_type, content),
            EditCommand::Remove { block } => editing::remove(&mut self.store, &block),
            EditCommand::ReplaceRange { start, end, text } => {
                editing::replace_range(&mut self.store, &start, &end, &text)
            }
            EditCommand::DeleteRange { start, end } => {
                editing::delete_range(&mut self.store, &start, &end)
            }
            EditCommand::InsertDrafts { anchor, drafts } => {
                editing::insert_drafts(&mut self.store, &anchor, drafts)
            }
            EditCommand::ReplaceSelectionWithDrafts { selection, drafts } => {
                // Offsets refer to the unlocked text.
                self.selection.release(&mut self.store);
                editing::replace_selection_with_drafts(&mut self.store, &selection, drafts)
            }
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(CommandError::UnknownBlock(id)) => {
                warn!("edit addressed unknown block {}; ignored", id);
                return Ok(CommandResult::Noop);
            }
            Err(err) => return Err(err),
        };

        self.selection.retain_valid(&self.store);
        if !outcome.is_mutation() {
            return Ok(CommandResult::Noop);
        }
        if let Some(focus) = &outcome.focus
            && let Some(caret) =
                Selection::capture(&self.store, &focus.block, focus.offset, focus.offset)
        {
            self.selection.set(caret);
        }
        self.last_outcome = Some(outcome.clone());
        Ok(CommandResult::Edited(outcome))
    }

    /// Execute a selection command.
    pub fn execute_selection(
        &mut self,
        command: SelectionCommand,
    ) -> Result<CommandResult, CommandError> {
        match command {
            SelectionCommand::Set { block, start, end } => {
                let Some(markup) = self.store.get(&block).map(|b| b.text()) else {
                    warn!("selection addressed unknown block {}; ignored", block);
                    return Ok(CommandResult::Noop);
                };
                let len = markup.map(inline::visible_len).unwrap_or(0);
                if start.max(end) > len {
                    return Err(CommandError::InvalidRange {
                        id: block,
                        start,
                        end,
                    });
                }
                match Selection::capture(&self.store, &block, start, end) {
                    Some(selection) => {
                        self.selection.set(selection.clone());
                        Ok(CommandResult::Selection(Some(selection)))
                    }
                    None => Ok(CommandResult::Noop),
                }
            }
            SelectionCommand::Clear => {
                self.selection.clear();
                Ok(CommandResult::Selection(None))
            }
            SelectionCommand::Lock => {
                let Some(current) = self.selection.current().cloned() else {
                    return Ok(CommandResult::Noop);
                };
                if self.selection.lock(&mut self.store, current.clone()) {
                    Ok(CommandResult::Selection(Some(current)))
                } else {
                    Ok(CommandResult::Noop)
                }
            }
            SelectionCommand::Release => match self.selection.release(&mut self.store) {
                Some(released) => Ok(CommandResult::Selection(Some(released))),
                None => Ok(CommandResult::Noop),
            },
        }
    }
}
