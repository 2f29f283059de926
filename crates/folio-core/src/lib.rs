#![warn(missing_docs)]
//! Folio Core - Headless Block Document Engine
//!
//! # Overview
//!
//! `folio-core` is the headless kernel of a paginated rich-document editor. A document is an
//! ordered list of typed blocks (paragraphs, headings, list items, tables, embeds, charts, a
//! cover page, dividers and page breaks). The crate owns the document model and every rule that
//! keeps it consistent; it does not render anything. A view adapter above it draws the blocks,
//! reports measured heights, and forwards user input as [`Command`]s.
//!
//! # Core Features
//!
//! - **Block Store**: ordered blocks with stable ids, in-place type conversion and JSON persistence
//! - **Editing State Machine**: line breaks, backspace merges, Markdown-style shortcuts, range edits
//! - **Selection Lock**: a selection that survives focus loss, marked inline in the content
//! - **Pagination**: fixed-height pages with overflow/underflow hysteresis and orphan-heading rules
//! - **History**: snapshot undo/redo with typing bursts coalesced into one step
//! - **State Tracking**: version numbers and change notifications
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  EditorSession (commands, timers, events)   │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  History            │  Pagination Engine    │  ← Document-wide rules
//! ├─────────────────────────────────────────────┤
//! │  Editing State Machine + Selection Model    │  ← Edit semantics
//! ├─────────────────────────────────────────────┤
//! │  Block Store + Conversion + Inline markup   │  ← Document model
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## Using Command Interface
//!
//! ```rust
//! use folio_core::{BlockType, CommandExecutor, CommandResult, EditCommand};
//!
//! let mut executor = CommandExecutor::empty();
//! let block = executor.store().first().id().clone();
//!
//! let result = executor
//!     .execute_edit(EditCommand::TextChanged {
//!         block: block.clone(),
//!         content: "# ".to_string(),
//!         cursor: 2,
//!     })
//!     .unwrap();
//!
//! assert!(matches!(result, CommandResult::Edited(_)));
//! assert_eq!(executor.store().first().block_type(), BlockType::Heading1);
//! ```
//!
//! ## Using the Session
//!
//! ```rust
//! use folio_core::{EditorConfig, EditorSession, StateChangeType};
//!
//! let mut session = EditorSession::new(EditorConfig::default());
//! session.subscribe(|change| {
//!     if change.change_type == StateChangeType::PagesReflowed {
//!         println!("pages changed at version {}", change.new_version);
//!     }
//! });
//! assert_eq!(session.pages().len(), 1);
//! ```
//!
//! # Module Description
//!
//! - [`block`] - Block ids, types and content
//! - [`store`] - Ordered block store and persistence
//! - [`inline`] - Inline markup helpers (visible offsets, splitting, lock markers)
//! - [`convert`] - Content extraction for type conversion
//! - [`pattern`] - Markdown-style typing shortcuts
//! - [`editing`] - Editing state machine
//! - [`selection`] - Selection model and selection lock
//! - [`numbering`] - Ordered-list numbering
//! - [`layout`] - Height measurement and word wrapping
//! - [`pagination`] - Page partitioning
//! - [`history`] - Snapshot undo/redo
//! - [`scheduler`] - Debounce timers and clocks
//! - [`commands`] - Unified command interface
//! - [`state`] - Editing session and change notifications

pub mod block;
pub mod commands;
pub mod config;
pub mod convert;
pub mod editing;
mod error;
pub mod history;
pub mod inline;
pub mod layout;
pub mod numbering;
pub mod pagination;
pub mod pattern;
pub mod scheduler;
pub mod selection;
pub mod state;
pub mod store;

pub use block::{
    Block, BlockContent, BlockDraft, BlockId, BlockRecord, BlockType, ChartContent, CoverContent,
    EmbedContent, ListKind, TableContent,
};
pub use commands::{
    Command, CommandExecutor, CommandResult, EditCommand, HistoryCommand, LayoutCommand,
    SelectionCommand,
};
pub use config::{EditorConfig, HistoryConfig, PageConfig, SchedulerConfig};
pub use editing::{EditOutcome, MutationKind};
pub use error::CommandError;
pub use history::{HistoryManager, RestoreToken, Snapshot};
pub use layout::{HeightMeasurer, TextMetrics};
pub use numbering::{ListGroup, ListNumbering};
pub use pagination::{
    BlockMove, MoveDirection, Page, PageId, PageKind, PaginationEngine, ReflowGate,
    ReflowRejected, ReflowReport, ReflowTicket,
};
pub use scheduler::{Clock, ManualClock, Scheduler, SystemClock, Timer, TimerKind};
pub use selection::{Caret, Selection, SelectionModel};
pub use state::{EditorSession, ExportedPage, StateChange, StateChangeCallback, StateChangeType};
pub use store::{BlockStore, Conversion};
