use folio_core::{
    BlockDraft, BlockStore, BlockType, Command, CommandResult, EditCommand, EditorConfig,
    EditorSession, Selection, SelectionCommand, SelectionModel, StateChangeType,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

fn session(markup: &str) -> EditorSession {
    EditorSession::with_store(
        BlockStore::from_drafts([BlockDraft::paragraph(markup)]),
        EditorConfig::default(),
    )
}

#[test]
fn test_lock_release_restores_identical_markup() {
    let original = "mixed <i>style</i> &amp; <b>bold</b> text";
    let mut store = BlockStore::from_drafts([BlockDraft::paragraph(original)]);
    let id = store.first().id().clone();
    let mut model = SelectionModel::new();

    let selection = Selection::capture(&store, &id, 2, 15).unwrap();
    assert!(model.lock(&mut store, selection.clone()));
    assert_eq!(model.locked(), Some(&selection));

    let released = model.release(&mut store);
    assert_eq!(released, Some(selection));
    assert_eq!(store.first().text(), Some(original));
}

#[test]
fn test_collapsed_selection_cannot_be_locked() {
    let mut store = BlockStore::from_drafts([BlockDraft::paragraph("abc")]);
    let id = store.first().id().clone();
    let mut model = SelectionModel::new();
    let caret = Selection::capture(&store, &id, 1, 1).unwrap();
    assert!(caret.is_collapsed());
    assert!(!model.lock(&mut store, caret));
    assert_eq!(store.first().text(), Some("abc"));
}

#[test]
fn test_lock_survives_focus_loss() {
    let mut session = session("the quick brown fox");
    let block = session.store().first().id().clone();

    session
        .execute(Command::Selection(SelectionCommand::Set {
            block: block.clone(),
            start: 4,
            end: 9,
        }))
        .unwrap();
    let locked = session
        .execute(Command::Selection(SelectionCommand::Lock))
        .unwrap();
    let CommandResult::Selection(Some(selection)) = locked else {
        panic!("expected a locked selection, got {locked:?}");
    };
    assert_eq!(selection.text, "quick");

    session
        .execute(Command::Selection(SelectionCommand::Clear))
        .unwrap();
    assert!(session.selection().current().is_none());
    assert_eq!(session.selection().locked(), Some(&selection));

    session
        .execute(Command::Selection(SelectionCommand::Release))
        .unwrap();
    assert!(!session.selection().is_locked());
    assert_eq!(session.store().first().text(), Some("the quick brown fox"));
}

#[test]
fn test_generated_blocks_replace_the_locked_span() {
    let mut session = session("keep REPLACE keep");
    let block = session.store().first().id().clone();
    session
        .execute(Command::Selection(SelectionCommand::Set {
            block,
            start: 5,
            end: 12,
        }))
        .unwrap();
    session
        .execute(Command::Selection(SelectionCommand::Lock))
        .unwrap();
    let selection = session.selection().locked().cloned().unwrap();

    session
        .execute(Command::Edit(EditCommand::ReplaceSelectionWithDrafts {
            selection,
            drafts: vec![
                BlockDraft::text(BlockType::Heading2, "Generated"),
                BlockDraft::paragraph("Body"),
            ],
        }))
        .unwrap();

    let texts: Vec<_> = session
        .store()
        .iter()
        .map(|b| (b.block_type(), b.text().unwrap_or_default().to_string()))
        .collect();
    assert_eq!(
        texts,
        vec![
            (BlockType::Paragraph, "keep ".to_string()),
            (BlockType::Heading2, "Generated".to_string()),
            (BlockType::Paragraph, "Body".to_string()),
            (BlockType::Paragraph, " keep".to_string()),
        ]
    );
    assert!(!session.selection().is_locked());
}

#[test]
fn test_lock_is_not_an_undo_step() {
    let mut session = session("some text");
    let block = session.store().first().id().clone();
    session
        .execute(Command::Selection(SelectionCommand::Set {
            block,
            start: 0,
            end: 4,
        }))
        .unwrap();
    session
        .execute(Command::Selection(SelectionCommand::Lock))
        .unwrap();

    assert!(!session.history().can_undo());
    assert_eq!(session.undo(), CommandResult::NothingToUndo);
    assert!(
        session.serialize()[0]
            .content
            .as_deref()
            .is_some_and(|c| !c.contains("<lock>"))
    );
}

#[test]
fn test_selection_commands_notify_subscribers() {
    let mut session = session("abc");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    session.subscribe(move |change| {
        if let Ok(mut seen) = sink.lock() {
            seen.push(change.change_type);
        }
    });

    let block = session.store().first().id().clone();
    session
        .execute(Command::Selection(SelectionCommand::Set {
            block,
            start: 0,
            end: 2,
        }))
        .unwrap();
    // Nothing is locked, so releasing changes nothing.
    session
        .execute(Command::Selection(SelectionCommand::Release))
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![StateChangeType::SelectionChanged]);
}

#[test]
fn test_selection_past_block_end_is_rejected() {
    let mut session = session("abc");
    let block = session.store().first().id().clone();
    let result = session.execute(Command::Selection(SelectionCommand::Set {
        block,
        start: 1,
        end: 9,
    }));
    assert!(result.is_err());
}
