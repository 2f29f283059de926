use folio_core::{
    BlockId, Command, CommandResult, EditCommand, EditorConfig, EditorSession, HistoryCommand,
    ManualClock, TimerKind,
};
use pretty_assertions::assert_eq;

fn session() -> (EditorSession, ManualClock) {
    let clock = ManualClock::new();
    let session = EditorSession::new(EditorConfig::default()).with_clock(clock.clone());
    (session, clock)
}

fn type_text(session: &mut EditorSession, block: &BlockId, text: &str) {
    session
        .execute(Command::Edit(EditCommand::TextChanged {
            block: block.clone(),
            content: text.to_string(),
            cursor: text.chars().count(),
        }))
        .unwrap();
}

fn first_text(session: &EditorSession) -> String {
    session.store().first().text().unwrap_or_default().to_string()
}

#[test]
fn test_pause_splits_typing_into_two_steps() {
    let (mut session, clock) = session();
    let block = session.store().first().id().clone();

    type_text(&mut session, &block, "one");
    clock.advance_ms(300);
    session.tick();
    type_text(&mut session, &block, "one two");
    clock.advance_ms(300);
    session.tick();

    assert_eq!(session.history().undo_depth(), 2);
    session.undo();
    assert_eq!(first_text(&session), "one");
    session.undo();
    assert_eq!(first_text(&session), "");
}

#[test]
fn test_structural_edit_commits_pending_typing() {
    let (mut session, _clock) = session();
    let block = session.store().first().id().clone();

    type_text(&mut session, &block, "typed");
    assert!(session.scheduler().is_pending(TimerKind::Snapshot));
    session
        .execute(Command::Edit(EditCommand::LineBreak {
            block: block.clone(),
            offset: 5,
        }))
        .unwrap();
    assert!(!session.scheduler().is_pending(TimerKind::Snapshot));

    session.undo();
    assert_eq!(session.store().len(), 1);
    assert_eq!(first_text(&session), "typed");
    session.undo();
    assert_eq!(first_text(&session), "");
}

#[test]
fn test_new_edit_discards_redo() {
    let (mut session, _clock) = session();
    let block = session.store().first().id().clone();
    session
        .execute(Command::Edit(EditCommand::LineBreak {
            block: block.clone(),
            offset: 0,
        }))
        .unwrap();
    session.undo();
    assert!(session.history().can_redo());

    session
        .execute(Command::Edit(EditCommand::LineBreak { block, offset: 0 }))
        .unwrap();
    assert!(!session.history().can_redo());
    assert_eq!(session.redo(), CommandResult::NothingToRedo);
}

#[test]
fn test_checkpoint_commits_without_waiting() {
    let (mut session, _clock) = session();
    let block = session.store().first().id().clone();
    type_text(&mut session, &block, "draft");

    assert_eq!(
        session
            .execute(Command::History(HistoryCommand::Checkpoint))
            .unwrap(),
        CommandResult::Success
    );
    assert!(!session.history().has_staged());
    assert_eq!(
        session
            .execute(Command::History(HistoryCommand::Checkpoint))
            .unwrap(),
        CommandResult::Noop
    );
}

#[test]
fn test_undo_restores_converted_block_identity() {
    let (mut session, _clock) = session();
    let original = session.store().first().id().clone();
    type_text(&mut session, &original, "# Title");
    assert_ne!(session.store().first().id(), &original);

    session.undo();
    assert_eq!(session.store().first().id(), &original);
    assert_eq!(session.undo(), CommandResult::NothingToUndo);
}

#[test]
fn test_restore_does_not_record_history() {
    let (mut session, _clock) = session();
    let block = session.store().first().id().clone();
    session
        .execute(Command::Edit(EditCommand::LineBreak { block, offset: 0 }))
        .unwrap();

    session.undo();
    assert_eq!(session.history().undo_depth(), 0);
    assert_eq!(session.history().redo_depth(), 1);
    assert!(!session.history().is_restoring());
}
