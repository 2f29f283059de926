use folio_core::{
    BlockContent, BlockDraft, BlockStore, BlockType, Caret, CommandError, CommandExecutor,
    CommandResult, EditCommand, MutationKind,
};
use pretty_assertions::assert_eq;

fn executor(drafts: Vec<BlockDraft>) -> CommandExecutor {
    CommandExecutor::new(BlockStore::from_drafts(drafts))
}

fn texts(executor: &CommandExecutor) -> Vec<String> {
    executor
        .store()
        .iter()
        .map(|b| b.text().unwrap_or_default().to_string())
        .collect()
}

fn types(executor: &CommandExecutor) -> Vec<BlockType> {
    executor.store().iter().map(|b| b.block_type()).collect()
}

fn id_at(executor: &CommandExecutor, index: usize) -> folio_core::BlockId {
    executor.store().at(index).unwrap().id().clone()
}

#[test]
fn test_plain_typing_is_a_text_mutation() {
    let mut executor = CommandExecutor::empty();
    let block = id_at(&executor, 0);

    let result = executor
        .execute_edit(EditCommand::TextChanged {
            block: block.clone(),
            content: "hello".to_string(),
            cursor: 5,
        })
        .unwrap();

    let CommandResult::Edited(outcome) = result else {
        panic!("expected an edit, got {result:?}");
    };
    assert_eq!(outcome.kind, MutationKind::Text);
    assert_eq!(outcome.focus, Some(Caret::new(block, 5)));
    assert_eq!(executor.selection().current().map(|s| s.start), Some(5));
}

#[test]
fn test_reporting_identical_content_is_noop() {
    let mut executor = executor(vec![BlockDraft::paragraph("same")]);
    let block = id_at(&executor, 0);
    let result = executor
        .execute_edit(EditCommand::TextChanged {
            block,
            content: "same".to_string(),
            cursor: 4,
        })
        .unwrap();
    assert_eq!(result, CommandResult::Noop);
}

#[test]
fn test_heading_shortcuts_convert_only_the_edited_block() {
    let mut executor = executor(vec![
        BlockDraft::paragraph("## not me"),
        BlockDraft::paragraph(""),
    ]);
    let block = id_at(&executor, 1);
    executor
        .execute_edit(EditCommand::TextChanged {
            block,
            content: "## Results".to_string(),
            cursor: 10,
        })
        .unwrap();

    assert_eq!(types(&executor), vec![BlockType::Paragraph, BlockType::Heading2]);
    assert_eq!(texts(&executor), vec!["## not me", "Results"]);
}

#[test]
fn test_divider_shortcut_adds_paragraph_for_the_cursor() {
    let mut executor = CommandExecutor::empty();
    let block = id_at(&executor, 0);
    let result = executor
        .execute_edit(EditCommand::TextChanged {
            block,
            content: "---".to_string(),
            cursor: 3,
        })
        .unwrap();

    assert_eq!(types(&executor), vec![BlockType::Divider, BlockType::Paragraph]);
    let CommandResult::Edited(outcome) = result else {
        panic!("expected an edit");
    };
    assert_eq!(outcome.kind, MutationKind::Structural);
    assert_eq!(outcome.focus.map(|c| c.block), Some(id_at(&executor, 1)));
}

#[test]
fn test_enter_splits_preserving_inline_styles() {
    let mut executor = executor(vec![BlockDraft::text(BlockType::Quote, "ab<b>cd</b>")]);
    let block = id_at(&executor, 0);
    executor
        .execute_edit(EditCommand::LineBreak { block, offset: 3 })
        .unwrap();

    assert_eq!(types(&executor), vec![BlockType::Quote, BlockType::Paragraph]);
    assert_eq!(texts(&executor), vec!["ab<b>c</b>", "<b>d</b>"]);
}

#[test]
fn test_enter_on_atomic_block_appends_paragraph() {
    let mut executor = executor(vec![BlockDraft::empty(BlockType::Table)]);
    let block = id_at(&executor, 0);
    executor
        .execute_edit(EditCommand::LineBreak { block, offset: 0 })
        .unwrap();
    assert_eq!(types(&executor), vec![BlockType::Table, BlockType::Paragraph]);
}

#[test]
fn test_backspace_merges_into_previous_text_block() {
    let mut executor = executor(vec![
        BlockDraft::text(BlockType::Heading1, "Title"),
        BlockDraft::paragraph(" body"),
    ]);
    let block = id_at(&executor, 1);
    let result = executor
        .execute_edit(EditCommand::DeleteBackward { block })
        .unwrap();

    assert_eq!(texts(&executor), vec!["Title body"]);
    assert_eq!(types(&executor), vec![BlockType::Heading1]);
    let CommandResult::Edited(outcome) = result else {
        panic!("expected an edit");
    };
    assert_eq!(outcome.focus.map(|c| c.offset), Some(5));
}

#[test]
fn test_backspace_after_divider_removes_divider() {
    let mut executor = executor(vec![
        BlockDraft::paragraph("above"),
        BlockDraft::empty(BlockType::Divider),
        BlockDraft::paragraph("below"),
    ]);
    let block = id_at(&executor, 2);
    executor
        .execute_edit(EditCommand::DeleteBackward { block })
        .unwrap();
    assert_eq!(types(&executor), vec![BlockType::Paragraph, BlockType::Paragraph]);
    assert_eq!(texts(&executor), vec!["above", "below"]);
}

#[test]
fn test_backspace_in_last_empty_block_keeps_document_non_empty() {
    let mut executor = executor(vec![BlockDraft::text(BlockType::Bullet, "")]);
    let block = id_at(&executor, 0);
    executor
        .execute_edit(EditCommand::DeleteBackward { block })
        .unwrap();
    assert_eq!(types(&executor), vec![BlockType::Paragraph]);

    let block = id_at(&executor, 0);
    let result = executor
        .execute_edit(EditCommand::DeleteBackward { block })
        .unwrap();
    assert_eq!(result, CommandResult::Noop);
    assert_eq!(executor.store().len(), 1);
}

#[test]
fn test_convert_to_divider_relocates_text() {
    let mut executor = executor(vec![BlockDraft::paragraph("keep me")]);
    let block = id_at(&executor, 0);
    executor
        .execute_edit(EditCommand::Convert {
            block,
            to: BlockType::Divider,
        })
        .unwrap();
    assert_eq!(types(&executor), vec![BlockType::Divider, BlockType::Paragraph]);
    assert_eq!(executor.store().at(1).unwrap().text(), Some("keep me"));
}

#[test]
fn test_convert_list_to_paragraph_strips_typed_markers() {
    let mut executor = executor(vec![BlockDraft::text(BlockType::Number, "1. first")]);
    let block = id_at(&executor, 0);
    executor
        .execute_edit(EditCommand::Convert {
            block,
            to: BlockType::Paragraph,
        })
        .unwrap();
    assert_eq!(texts(&executor), vec!["first"]);
}

#[test]
fn test_cross_block_delete_keeps_outer_parts() {
    let mut executor = executor(vec![
        BlockDraft::paragraph("keep this"),
        BlockDraft::paragraph("gone"),
        BlockDraft::empty(BlockType::Divider),
        BlockDraft::paragraph("and that"),
    ]);
    let start = Caret::new(id_at(&executor, 0), 4);
    let end = Caret::new(id_at(&executor, 3), 3);
    executor
        .execute_edit(EditCommand::DeleteRange { start, end })
        .unwrap();

    assert_eq!(texts(&executor), vec!["keep that"]);
}

#[test]
fn test_unknown_block_is_ignored() {
    let mut executor = executor(vec![BlockDraft::paragraph("x")]);
    let before = executor.store().clone();
    let result = executor
        .execute_edit(EditCommand::LineBreak {
            block: folio_core::BlockId::new("blk-missing"),
            offset: 0,
        })
        .unwrap();
    assert_eq!(result, CommandResult::Noop);
    assert_eq!(executor.store(), &before);
}

#[test]
fn test_text_for_structural_block_is_rejected() {
    let mut executor = executor(vec![BlockDraft::empty(BlockType::Divider)]);
    let block = id_at(&executor, 0);
    let result = executor.execute_edit(EditCommand::TextChanged {
        block,
        content: "text".to_string(),
        cursor: 4,
    });
    assert!(matches!(result, Err(CommandError::NotTextBearing { .. })));
}

#[test]
fn test_insert_after_creates_block_of_requested_type() {
    let mut executor = executor(vec![BlockDraft::paragraph("anchor")]);
    let anchor = id_at(&executor, 0);
    executor
        .execute_edit(EditCommand::InsertAfter {
            anchor,
            block_type: BlockType::ChartPlaceholder,
            content: BlockContent::empty_for(BlockType::ChartPlaceholder),
        })
        .unwrap();
    assert_eq!(
        types(&executor),
        vec![BlockType::Paragraph, BlockType::ChartPlaceholder]
    );
}
