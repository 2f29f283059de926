//! Editing session and state notifications.
//!
//! # Overview
//!
//! [`EditorSession`] is the single owner of everything a document needs while it is being edited:
//! the command executor (block store + selection), the history manager, the pagination engine,
//! the debounce scheduler, a clock and a height measurer. There is no global state; a host can
//! run as many sessions as it likes.
//!
//! The data flow for every edit is the same:
//!
//! 1. The host executes a [`Command`].
//! 2. The executor mutates the block store and reports whether the change was keystroke-level or
//!    structural.
//! 3. List numbering is recomputed.
//! 4. Keystroke-level changes stage a history snapshot and arm the snapshot and reflow timers;
//!    structural changes record a snapshot and reflow immediately.
//! 5. The version is bumped and subscribers are notified.
//!
//! # Example
//!
//! ```rust
//! use folio_core::{Command, EditCommand, EditorConfig, EditorSession};
//!
//! let mut session = EditorSession::new(EditorConfig::default());
//! session.subscribe(|change| {
//!     println!("Version {} -> {}: {:?}", change.old_version, change.new_version, change.change_type);
//! });
//!
//! let block = session.store().first().id().clone();
//! session
//!     .execute(Command::Edit(EditCommand::LineBreak { block, offset: 0 }))
//!     .unwrap();
//! assert_eq!(session.store().len(), 2);
//! assert!(session.version() > 0);
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::block::{Block, BlockId, BlockRecord};
use crate::commands::{
    Command, CommandExecutor, CommandResult, HistoryCommand, LayoutCommand,
};
use crate::config::EditorConfig;
use crate::editing::MutationKind;
use crate::error::CommandError;
use crate::history::{HistoryManager, Snapshot};
use crate::layout::{HeightMeasurer, TextMetrics};
use crate::numbering::{self, ListNumbering};
use crate::pagination::{Page, PageKind, PaginationEngine, ReflowRejected, ReflowReport};
use crate::scheduler::{Clock, Scheduler, SystemClock, TimerKind};
use crate::selection::SelectionModel;
use crate::store::BlockStore;

/// State change type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChangeType {
    /// Document content modified
    DocumentModified,
    /// Selection changed or a lock was taken/released
    SelectionChanged,
    /// The page partition changed
    PagesReflowed,
    /// Undo or redo replaced the document
    HistoryRestored,
}

/// State change record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    /// Change type
    pub change_type: StateChangeType,
    /// Old version number
    pub old_version: u64,
    /// New version number
    pub new_version: u64,
    /// Block the change is about, when there is one
    pub block: Option<BlockId>,
}

impl StateChange {
    /// Create a new state change record without a block.
    pub fn new(change_type: StateChangeType, old_version: u64, new_version: u64) -> Self {
        Self {
            change_type,
            old_version,
            new_version,
            block: None,
        }
    }

    /// Attach the affected block.
    pub fn with_block(mut self, block: BlockId) -> Self {
        self.block = Some(block);
        self
    }
}

/// State change callback function type
pub type StateChangeCallback = Box<dyn FnMut(&StateChange) + Send>;

/// One page of a static export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedPage {
    /// 1-based page number.
    pub number: usize,
    /// Cover or content.
    pub kind: PageKind,
    /// Blocks on the page, with selection-lock markers removed.
    pub blocks: Vec<Block>,
    /// List ordinal of each block (`None` for blocks that are not numbered).
    pub ordinals: Vec<Option<usize>>,
}

/// Editing session
pub struct EditorSession {
    executor: CommandExecutor,
    history: HistoryManager,
    pagination: PaginationEngine,
    scheduler: Scheduler,
    clock: Box<dyn Clock + Send>,
    measurer: Box<dyn HeightMeasurer + Send>,
    config: EditorConfig,
    numbering: ListNumbering,
    state_version: u64,
    callbacks: Vec<StateChangeCallback>,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("blocks", &self.executor.store().len())
            .field("pages", &self.pagination.page_count())
            .field("version", &self.state_version)
            .field("undo_depth", &self.history.undo_depth())
            .field("redo_depth", &self.history.redo_depth())
            .finish()
    }
}

impl EditorSession {
    /// Session over a document holding one empty paragraph.
    pub fn new(config: EditorConfig) -> Self {
        Self::with_store(BlockStore::new(), config)
    }

    /// Session over an existing document, using the wall clock and [`TextMetrics`].
    pub fn with_store(store: BlockStore, config: EditorConfig) -> Self {
        let numbering = numbering::resolve(store.blocks());
        let mut session = Self {
            executor: CommandExecutor::new(store),
            history: HistoryManager::from_config(&config.history),
            pagination: PaginationEngine::new(config.page.clone()),
            scheduler: Scheduler::new(),
            clock: Box::new(SystemClock),
            measurer: Box::new(TextMetrics::default()),
            config,
            numbering,
            state_version: 0,
            callbacks: Vec::new(),
        };
        session.repaginate();
        session
    }

    /// Replace the clock (tests use a [`ManualClock`](crate::scheduler::ManualClock)).
    pub fn with_clock(mut self, clock: impl Clock + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self.scheduler.cancel_all();
        self.repaginate();
        self
    }

    /// Replace the height measurer and repaginate.
    pub fn with_measurer(mut self, measurer: impl HeightMeasurer + Send + 'static) -> Self {
        self.set_measurer(measurer);
        self
    }

    /// Replace the height measurer (e.g. after the view adapter materialized its containers).
    pub fn set_measurer(&mut self, measurer: impl HeightMeasurer + Send + 'static) {
        self.measurer = Box::new(measurer);
        self.repaginate();
    }

    fn repaginate(&mut self) {
        let now = self.clock.now();
        let result = self
            .pagination
            .rebuild(self.executor.store(), self.measurer.as_ref(), now);
        self.settle_reflow(&result, now);
    }

    /// Configuration in effect.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The document.
    pub fn store(&self) -> &BlockStore {
        self.executor.store()
    }

    /// Selection state.
    pub fn selection(&self) -> &SelectionModel {
        self.executor.selection()
    }

    /// History state.
    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    /// Pending timers.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Current page partition.
    pub fn pages(&self) -> &[Page] {
        self.pagination.pages()
    }

    /// Pagination engine (read-only).
    pub fn pagination(&self) -> &PaginationEngine {
        &self.pagination
    }

    /// List ordinals for the current document.
    pub fn list_numbering(&self) -> &ListNumbering {
        &self.numbering
    }

    /// Current version number.
    pub fn version(&self) -> u64 {
        self.state_version
    }

    /// Check if state has changed since a version
    pub fn has_changed_since(&self, version: u64) -> bool {
        self.state_version > version
    }

    /// Subscribe to state change notifications
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&StateChange) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Execute a command.
    pub fn execute(&mut self, command: Command) -> Result<CommandResult, CommandError> {
        match command {
            Command::Edit(edit) => {
                let before = self.executor.store().snapshot_blocks();
                let result = self.executor.execute_edit(edit)?;
                if let CommandResult::Edited(outcome) = &result {
                    let block = outcome.focus.as_ref().map(|c| c.block.clone());
                    self.after_edit(before, outcome.kind, block);
                }
                Ok(result)
            }
            Command::Selection(selection) => {
                let result = self.executor.execute_selection(selection)?;
                if result != CommandResult::Noop {
                    self.mark_modified(StateChangeType::SelectionChanged, None);
                }
                Ok(result)
            }
            Command::History(HistoryCommand::Undo) => Ok(self.undo()),
            Command::History(HistoryCommand::Redo) => Ok(self.redo()),
            Command::History(HistoryCommand::Checkpoint) => {
                self.scheduler.cancel(TimerKind::Snapshot);
                if self.history.commit_staged() {
                    Ok(CommandResult::Success)
                } else {
                    Ok(CommandResult::Noop)
                }
            }
            Command::Layout(LayoutCommand::Reflow) => Ok(reflow_result(self.reflow_now())),
            Command::Layout(LayoutCommand::Rebuild) => {
                let now = self.clock.now();
                let result = self
                    .pagination
                    .rebuild(self.executor.store(), self.measurer.as_ref(), now);
                self.settle_reflow(&result, now);
                Ok(reflow_result(result))
            }
        }
    }

    fn after_edit(&mut self, before: Snapshot, kind: MutationKind, block: Option<BlockId>) {
        self.numbering = numbering::resolve(self.executor.store().blocks());
        let now = self.clock.now();

        match kind {
            MutationKind::None => return,
            MutationKind::Text => {
                self.history.stage(before);
                self.scheduler.schedule(
                    TimerKind::Snapshot,
                    now,
                    Duration::from_millis(self.config.history.snapshot_debounce_ms),
                    block.clone(),
                );
                self.schedule_reflow(block.clone());
            }
            MutationKind::Structural => {
                self.scheduler.cancel(TimerKind::Snapshot);
                self.history.save_state(before);
            }
        }

        self.mark_modified(StateChangeType::DocumentModified, block);
        if kind == MutationKind::Structural {
            self.reflow_pending();
        }
    }

    fn schedule_reflow(&mut self, key: Option<BlockId>) {
        let now = self.clock.now();
        self.scheduler.schedule(
            TimerKind::Reflow,
            now,
            Duration::from_millis(self.config.scheduler.reflow_debounce_ms),
            key,
        );
    }

    /// Reflow immediately. A rejected reflow is retried after the reflow debounce.
    pub fn reflow_now(&mut self) -> Result<ReflowReport, ReflowRejected> {
        let now = self.clock.now();
        let result = self
            .pagination
            .reflow(self.executor.store(), self.measurer.as_ref(), now);
        self.settle_reflow(&result, now);
        result
    }

    /// Reflow after an edit, restore or timer. Rejections and cooldowns re-arm the reflow timer.
    fn reflow_pending(&mut self) {
        let now = self.clock.now();
        let result = self
            .pagination
            .reflow(self.executor.store(), self.measurer.as_ref(), now);
        self.settle_reflow(&result, now);
    }

    fn settle_reflow(&mut self, result: &Result<ReflowReport, ReflowRejected>, now: Instant) {
        match result {
            Ok(report) => {
                self.scheduler.cancel(TimerKind::Reflow);
                if report.deferred {
                    self.scheduler.schedule(
                        TimerKind::Reflow,
                        now,
                        self.config.page.reflow_cooldown(),
                        None,
                    );
                }
                if report.changed() {
                    self.mark_modified(StateChangeType::PagesReflowed, None);
                }
            }
            Err(rejected) => {
                debug!(%rejected, "no reflow performed this tick");
                self.schedule_reflow(None);
            }
        }
    }

    /// Run every timer whose deadline has passed. Returns the kinds that fired.
    pub fn tick(&mut self) -> Vec<TimerKind> {
        let now = self.clock.now();
        let due = self.scheduler.take_due(now);
        self.run_timers(due.into_iter().map(|t| t.kind).collect())
    }

    /// Run every pending timer now, regardless of deadline.
    pub fn flush(&mut self) -> Vec<TimerKind> {
        let pending = self.scheduler.take_all();
        self.run_timers(pending.into_iter().map(|t| t.kind).collect())
    }

    fn run_timers(&mut self, kinds: Vec<TimerKind>) -> Vec<TimerKind> {
        for kind in &kinds {
            match kind {
                TimerKind::Snapshot => {
                    self.history.commit_staged();
                }
                TimerKind::Reflow => self.reflow_pending(),
            }
        }
        kinds
    }

    /// Undo the last edit.
    pub fn undo(&mut self) -> CommandResult {
        self.scheduler.cancel(TimerKind::Snapshot);
        let current = self.executor.store().snapshot_blocks();
        match self.history.undo(current) {
            Some(snapshot) => self.restore(snapshot),
            None => {
                info!("nothing to undo");
                CommandResult::NothingToUndo
            }
        }
    }

    /// Redo the last undone edit.
    pub fn redo(&mut self) -> CommandResult {
        self.scheduler.cancel(TimerKind::Snapshot);
        let current = self.executor.store().snapshot_blocks();
        match self.history.redo(current) {
            Some(snapshot) => self.restore(snapshot),
            None => {
                info!("nothing to redo");
                CommandResult::NothingToRedo
            }
        }
    }

    fn restore(&mut self, snapshot: Snapshot) -> CommandResult {
        let Some(token) = self.history.begin_restore() else {
            return CommandResult::Noop;
        };
        let mut store = self.executor.store().clone();
        store.restore(snapshot);
        self.executor.replace_blocks(store);
        self.history.end_restore(token);

        self.numbering = numbering::resolve(self.executor.store().blocks());
        self.mark_modified(StateChangeType::HistoryRestored, None);
        self.reflow_pending();
        CommandResult::Restored
    }

    /// Ordered persistence records.
    pub fn serialize(&self) -> Vec<BlockRecord> {
        self.executor.store().serialize()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, CommandError> {
        self.executor.store().to_json()
    }

    /// Replace the document with persisted records. History and timers are reset.
    pub fn load(&mut self, records: impl IntoIterator<Item = BlockRecord>) {
        let store = BlockStore::deserialize(records);
        info!(blocks = store.len(), "document loaded");
        self.executor.replace_blocks(store);
        self.history.clear();
        self.scheduler.cancel_all();
        self.numbering = numbering::resolve(self.executor.store().blocks());
        self.repaginate();
        self.mark_modified(StateChangeType::DocumentModified, None);
    }

    /// Replace the document with a JSON array of records.
    pub fn load_json(&mut self, json: &str) -> Result<(), CommandError> {
        let records: Vec<BlockRecord> = serde_json::from_str(json)?;
        self.load(records);
        Ok(())
    }

    /// Settle pending work and return the page structure for a static rendering.
    pub fn export_pages(&mut self) -> Vec<ExportedPage> {
        self.flush();
        if !self.partition_matches_document() {
            warn!("page partition out of date at export; repaginating");
            self.repaginate();
        }
        let mut clean: HashMap<BlockId, Block> = self
            .executor
            .store()
            .snapshot_blocks()
            .into_iter()
            .map(|block| (block.id().clone(), block))
            .collect();
        self.pagination
            .pages()
            .iter()
            .map(|page| {
                let blocks: Vec<Block> = page
                    .blocks()
                    .iter()
                    .filter_map(|id| clean.remove(id))
                    .collect();
                let ordinals = blocks
                    .iter()
                    .map(|b| self.numbering.ordinal(b.id()))
                    .collect();
                ExportedPage {
                    number: page.number(),
                    kind: page.kind(),
                    blocks,
                    ordinals,
                }
            })
            .collect()
    }

    fn partition_matches_document(&self) -> bool {
        let mut paged = self.pagination.pages().iter().flat_map(|p| p.blocks());
        self.executor
            .store()
            .iter()
            .all(|block| paged.next() == Some(block.id()))
            && paged.next().is_none()
    }

    /// Mark a change and increment the version number.
    pub fn mark_modified(&mut self, change_type: StateChangeType, block: Option<BlockId>) {
        let old_version = self.state_version;
        self.state_version += 1;

        let mut change = StateChange::new(change_type, old_version, self.state_version);
        if let Some(block) = block {
            change = change.with_block(block);
        }
        for callback in &mut self.callbacks {
            callback(&change);
        }
    }
}

fn reflow_result(result: Result<ReflowReport, ReflowRejected>) -> CommandResult {
    match result {
        Ok(report) => CommandResult::Reflowed(report),
        Err(rejected) => CommandResult::ReflowSkipped(rejected),
    }
}
