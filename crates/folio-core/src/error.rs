use thiserror::Error;

use crate::block::{BlockId, BlockType};

#[derive(Debug, Error)]
/// Errors produced by the block engine.
///
/// Most editing paths do not fail: commands addressing a block that no longer exists resolve to
/// [`CommandResult::Noop`](crate::CommandResult::Noop). Errors are reserved for malformed input
/// handed to the engine from outside (persistence records, configuration).
pub enum CommandError {
    #[error("unknown block: {0}")]
    /// The addressed block id is not present in the store.
    UnknownBlock(BlockId),

    #[error("block {id} of type {block_type} carries no text")]
    /// A text operation targeted a structural block.
    NotTextBearing {
        /// The addressed block.
        id: BlockId,
        /// Its type.
        block_type: BlockType,
    },

    #[error("invalid range {start}..{end} in block {id}")]
    /// A range does not fit inside the addressed block.
    InvalidRange {
        /// The addressed block.
        id: BlockId,
        /// Start offset (visible chars).
        start: usize,
        /// End offset (visible chars).
        end: usize,
    },

    #[error("serialization error: {0}")]
    /// JSON encoding/decoding failed.
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    /// A configuration value is out of range.
    Config(String),
}
