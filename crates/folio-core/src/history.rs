//! Snapshot-based undo/redo.
//!
//! # Overview
//!
//! Every undo entry is a deep copy of the document as it was *before* an edit. Structural edits
//! push their pre-edit state immediately. Typing is coalesced: the first keystroke of a burst
//! [stages](HistoryManager::stage) the pre-burst state, and the session commits it when the
//! snapshot debounce fires, so a burst of typing undoes in one step.
//!
//! While a snapshot is being restored the manager refuses to record anything; restoring must not
//! itself become an undoable edit.

use std::collections::VecDeque;

use tracing::debug;

use crate::block::Block;
use crate::config::{DEFAULT_HISTORY_CAPACITY, HistoryConfig};

/// A document snapshot.
pub type Snapshot = Vec<Block>;

/// Proof that a restore is in progress. Hand it back to
/// [`HistoryManager::end_restore`] once the store holds the restored snapshot.
#[derive(Debug)]
#[must_use = "a restore must be ended with HistoryManager::end_restore"]
pub struct RestoreToken {
    _private: (),
}

/// Undo/redo stacks with a capacity cap.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: Vec<Snapshot>,
    staged: Option<Snapshot>,
    capacity: usize,
    restoring: bool,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryManager {
    /// Create a manager keeping at most `capacity` undo entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            staged: None,
            capacity: capacity.max(1),
            restoring: false,
        }
    }

    /// Create a manager from configuration.
    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Record the state before a structural edit. Clears the redo stack.
    ///
    /// Any staged typing snapshot is committed first so the burst keeps its own undo step.
    /// Returns whether a new entry was pushed.
    pub fn save_state(&mut self, snapshot: Snapshot) -> bool {
        if self.restoring {
            return false;
        }
        self.commit_staged();
        self.redo_stack.clear();
        self.push_undo(snapshot)
    }

    /// Remember the pre-burst state on the first keystroke of a typing burst. Later calls while a
    /// snapshot is staged are ignored.
    pub fn stage(&mut self, snapshot: Snapshot) -> bool {
        if self.restoring || self.staged.is_some() {
            return false;
        }
        self.redo_stack.clear();
        self.staged = Some(snapshot);
        true
    }

    /// Whether a typing snapshot is waiting for commit.
    pub fn has_staged(&self) -> bool {
        self.staged.is_some()
    }

    /// Push the staged snapshot onto the undo stack.
    pub fn commit_staged(&mut self) -> bool {
        match self.staged.take() {
            Some(snapshot) => self.push_undo(snapshot),
            None => false,
        }
    }

    /// Forget the staged snapshot without recording it.
    pub fn discard_staged(&mut self) {
        self.staged = None;
    }

    fn push_undo(&mut self, snapshot: Snapshot) -> bool {
        if self.undo_stack.back() == Some(&snapshot) {
            return false;
        }
        self.undo_stack.push_back(snapshot);
        while self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
        }
        debug!(depth = self.undo_stack.len(), "history snapshot pushed");
        true
    }

    /// Pop the most recent snapshot that differs from `current`; `current` moves onto the redo
    /// stack.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        self.commit_staged();
        while let Some(previous) = self.undo_stack.pop_back() {
            if previous == current {
                continue;
            }
            self.redo_stack.push(current);
            debug!(
                undo = self.undo_stack.len(),
                redo = self.redo_stack.len(),
                "undo"
            );
            return Some(previous);
        }
        None
    }

    /// Mirror of [`undo`](Self::undo).
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        self.discard_staged();
        let next = self.redo_stack.pop()?;
        self.undo_stack.push_back(current);
        while self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
        }
        debug!(
            undo = self.undo_stack.len(),
            redo = self.redo_stack.len(),
            "redo"
        );
        Some(next)
    }

    /// Enter restore mode. Returns `None` if a restore is already running.
    pub fn begin_restore(&mut self) -> Option<RestoreToken> {
        if self.restoring {
            return None;
        }
        self.restoring = true;
        Some(RestoreToken { _private: () })
    }

    /// Leave restore mode.
    pub fn end_restore(&mut self, token: RestoreToken) {
        let RestoreToken { _private: () } = token;
        self.restoring = false;
    }

    /// Whether a restore is in progress.
    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    /// Check if can undo
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() || self.staged.is_some()
    }

    /// Check if can redo
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undo entries (a staged snapshot counts once).
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len() + usize::from(self.staged.is_some())
    }

    /// Number of redo entries.
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Maximum number of undo entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.staged = None;
    }
}
