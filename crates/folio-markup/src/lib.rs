#![warn(missing_docs)]
//! Folio Markup - text-service integration for `folio-core`
//!
//! Generated text arrives as markdown. This crate turns it into block drafts
//! ([`normalize`]) and applies it to an [`EditorSession`](folio_core::EditorSession) either after
//! an anchor block or in place of the (locked) selection ([`apply_generation`]).
//!
//! The core never calls a text service itself; hosts implement [`TextGenerator`] (any
//! `FnMut(&str, &str) -> Result<String, GenerationError>` closure also works).

pub mod generation;
pub mod normalize;

pub use generation::{GenerationError, GenerationTarget, TextGenerator, apply_generation};
pub use normalize::normalize;
