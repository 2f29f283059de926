//! Applying text-service output to a session.

use folio_core::{
    BlockId, Command, CommandError, CommandResult, EditCommand, EditorSession,
};
use thiserror::Error;
use tracing::info;

use crate::normalize::normalize;

/// Text generation failures.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The service reported a failure.
    #[error("text service failed: {0}")]
    Service(String),
    /// The service answered with nothing usable.
    #[error("text service returned no content")]
    Empty,
    /// A selection replacement was requested with no selection.
    #[error("no selection to replace")]
    NoSelection,
    /// Applying the generated blocks failed.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// An external text service.
pub trait TextGenerator {
    /// Produce markdown-ish text for `prompt`. `context` is the text the result relates to.
    fn generate(&mut self, prompt: &str, context: &str) -> Result<String, GenerationError>;
}

impl<F> TextGenerator for F
where
    F: FnMut(&str, &str) -> Result<String, GenerationError>,
{
    fn generate(&mut self, prompt: &str, context: &str) -> Result<String, GenerationError> {
        self(prompt, context)
    }
}

/// Where generated blocks go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationTarget {
    /// Insert after a block.
    After(BlockId),
    /// Replace the locked selection, or the live one if nothing is locked.
    ReplaceSelection,
}

/// Generate text, normalize it into drafts and apply it to `session` as one structural edit.
pub fn apply_generation<G>(
    session: &mut EditorSession,
    generator: &mut G,
    prompt: &str,
    target: GenerationTarget,
) -> Result<CommandResult, GenerationError>
where
    G: TextGenerator + ?Sized,
{
    let command = match target {
        GenerationTarget::After(anchor) => {
            let context = session.store().extract_content(&anchor).unwrap_or_default();
            let drafts = normalize(&generator.generate(prompt, &context)?);
            if drafts.is_empty() {
                return Err(GenerationError::Empty);
            }
            info!(blocks = drafts.len(), "inserting generated blocks after {}", anchor);
            EditCommand::InsertDrafts { anchor, drafts }
        }
        GenerationTarget::ReplaceSelection => {
            let selection = session
                .selection()
                .locked()
                .or_else(|| session.selection().current())
                .filter(|s| !s.is_collapsed())
                .cloned()
                .ok_or(GenerationError::NoSelection)?;
            let drafts = normalize(&generator.generate(prompt, &selection.text)?);
            if drafts.is_empty() {
                return Err(GenerationError::Empty);
            }
            info!(
                blocks = drafts.len(),
                "replacing selection in {} with generated blocks", selection.block
            );
            EditCommand::ReplaceSelectionWithDrafts { selection, drafts }
        }
    };

    Ok(session.execute(Command::Edit(command))?)
}
