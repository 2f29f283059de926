//! Randomized edit sequences checked against the document and pagination invariants.

use folio_core::{
    Block, BlockContent, BlockDraft, BlockId, BlockType, Caret, Command, CommandError,
    CommandResult, EditCommand, EditorConfig, EditorSession, ManualClock, PageConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

const H_MAX: f64 = 100.0;

fn height_from_text(block: &Block) -> Option<f64> {
    Some(
        block
            .text()
            .and_then(|t| t.parse::<f64>().ok())
            .unwrap_or(10.0),
    )
}

fn session() -> (EditorSession, ManualClock) {
    let config = EditorConfig {
        page: PageConfig {
            content_height: H_MAX,
            block_margin: 0.0,
            overflow_buffer: 10.0,
            ..PageConfig::default()
        },
        ..EditorConfig::default()
    };
    let clock = ManualClock::new();
    let session = EditorSession::new(config)
        .with_clock(clock.clone())
        .with_measurer(height_from_text);
    (session, clock)
}

const SEEDED: &str = r#"[
    {"type": "paragraph", "content": "30"},
    {"type": "bullet-list", "items": ["20", "15"]},
    {"type": "divider"},
    {"type": "heading2", "content": "12"},
    {"type": "number-list", "items": ["25", "40", "10"]},
    {"type": "table", "rows": [["a", "b"]]},
    {"type": "paragraph", "content": "45"}
]"#;

fn random_block(session: &EditorSession, rng: &mut StdRng) -> BlockId {
    let index = rng.gen_range(0..session.store().len());
    session.store().at(index).unwrap().id().clone()
}

fn random_caret(session: &EditorSession, rng: &mut StdRng, from: usize) -> (usize, Caret) {
    let index = rng.gen_range(from..session.store().len());
    let block = session.store().at(index).unwrap();
    let len = block.text().map_or(0, |t| t.chars().count());
    (index, Caret::new(block.id().clone(), rng.gen_range(0..=len)))
}

fn number(rng: &mut StdRng, range: std::ops::RangeInclusive<u32>) -> String {
    rng.gen_range(range).to_string()
}

fn random_edit(session: &EditorSession, rng: &mut StdRng) -> EditCommand {
    let block = random_block(session, rng);
    match rng.gen_range(0..12) {
        0 | 1 => EditCommand::InsertAfter {
            anchor: block,
            block_type: BlockType::Paragraph,
            content: BlockContent::Text(number(rng, 10..=50)),
        },
        2 => EditCommand::InsertAfter {
            anchor: block,
            block_type: BlockType::Heading2,
            content: BlockContent::Text(number(rng, 10..=20)),
        },
        3 => EditCommand::TextChanged {
            block,
            content: number(rng, 10..=50),
            cursor: 2,
        },
        4 => EditCommand::Remove { block },
        5 => EditCommand::Convert {
            block,
            to: [
                BlockType::Paragraph,
                BlockType::Bullet,
                BlockType::Number,
                BlockType::Heading1,
                BlockType::Divider,
                BlockType::Table,
                BlockType::Embed,
            ][rng.gen_range(0..7)],
        },
        6 => {
            let (_, caret) = random_caret(session, rng, 0);
            EditCommand::LineBreak {
                block: caret.block,
                offset: caret.offset,
            }
        }
        7 => EditCommand::DeleteBackward { block },
        8 | 9 => {
            let (index, start) = random_caret(session, rng, 0);
            let (_, mut end) = random_caret(session, rng, index);
            if end.block == start.block && end.offset < start.offset {
                end.offset = start.offset;
            }
            if rng.gen_bool(0.5) {
                EditCommand::ReplaceRange {
                    start,
                    end,
                    text: number(rng, 1..=9),
                }
            } else {
                EditCommand::DeleteRange { start, end }
            }
        }
        _ => EditCommand::InsertDrafts {
            anchor: block,
            drafts: vec![
                BlockDraft::text(BlockType::Heading3, number(rng, 10..=20)),
                BlockDraft::empty(BlockType::Divider),
                BlockDraft::paragraph(number(rng, 10..=40)),
            ],
        },
    }
}

/// Apply an edit. Text edits aimed at blocks without text are refused and leave the document alone.
fn apply(session: &mut EditorSession, edit: EditCommand) {
    match session.execute(Command::Edit(edit)) {
        Ok(_)
        | Err(CommandError::NotTextBearing { .. })
        | Err(CommandError::InvalidRange { .. }) => {}
        Err(err) => panic!("edit failed: {err}"),
    }
}

/// Whether a heading, the headings right after it and the block they introduce overflow a page.
fn introduced_run_overflows(ordered: &[&Block], position: usize) -> bool {
    let mut run = 0.0;
    for block in &ordered[position..] {
        run += height_from_text(block).unwrap_or(0.0);
        if !block.block_type().is_heading() {
            return run > H_MAX;
        }
    }
    true
}

fn assert_invariants(session: &EditorSession) {
    let store = session.store();
    assert!(!store.is_empty(), "document must never be empty");

    let ids: HashSet<_> = store.iter().map(|b| b.id().clone()).collect();
    assert_eq!(ids.len(), store.len(), "block ids must be unique");

    let paged: Vec<_> = session
        .pages()
        .iter()
        .flat_map(|p| p.blocks().iter().cloned())
        .collect();
    let ordered: Vec<_> = store.iter().map(|b| b.id().clone()).collect();
    assert_eq!(paged, ordered, "pages must partition the document in order");

    let in_order: Vec<&Block> = store.iter().collect();
    let pages = session.pages();
    for (index, page) in pages.iter().enumerate() {
        assert!(!page.blocks().is_empty(), "no empty pages");
        assert_eq!(page.number(), index + 1);

        let blocks: Vec<&Block> = page.blocks().iter().filter_map(|id| store.get(id)).collect();
        let used: f64 = blocks.iter().filter_map(|b| height_from_text(b)).sum();
        assert!(
            used <= H_MAX || blocks.len() == 1,
            "page {} holds {used} units",
            page.number()
        );

        let is_last = index + 1 == pages.len();
        let Some(last) = blocks.last().filter(|b| b.block_type().is_heading()) else {
            continue;
        };
        let position = store.index_of(last.id()).unwrap();
        assert!(
            is_last || introduced_run_overflows(&in_order, position),
            "page {} ends with an orphaned heading",
            page.number()
        );
    }
}

fn assert_export_follows_document(session: &mut EditorSession) {
    let exported: Vec<BlockId> = session
        .export_pages()
        .into_iter()
        .flat_map(|page| page.blocks)
        .map(|block| block.id().clone())
        .collect();
    let ordered: Vec<BlockId> = session.store().iter().map(|b| b.id().clone()).collect();
    assert_eq!(exported, ordered, "export must carry every block in document order");
}

#[test]
fn test_random_edit_sequences_keep_invariants() {
    for seed in 0..20u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let (mut session, clock) = session();
        if seed % 2 == 1 {
            session.load_json(SEEDED).unwrap();
        }

        for _ in 0..60 {
            let edit = random_edit(&session, &mut rng);
            apply(&mut session, edit);
            clock.advance_ms(rng.gen_range(0..500));
            session.tick();
            session.flush();
            assert_invariants(&session);
            assert_export_follows_document(&mut session);
        }
    }
}

#[test]
fn test_edits_on_a_loaded_document_export_every_block() {
    let (mut session, _clock) = session();
    session.load_json(SEEDED).unwrap();
    let container = session.store().at(1).unwrap().id().clone();

    apply(
        &mut session,
        EditCommand::Convert {
            block: container,
            to: BlockType::Bullet,
        },
    );
    assert_export_follows_document(&mut session);
    assert_eq!(session.store().len(), 8);
}

#[test]
fn test_undo_then_redo_restores_the_same_document() {
    let mut rng = StdRng::seed_from_u64(7);
    let (mut session, clock) = session();

    for _ in 0..50 {
        let edit = random_edit(&session, &mut rng);
        apply(&mut session, edit);
        clock.advance_ms(350);
        session.tick();
    }

    for _ in 0..20 {
        let before: Vec<Block> = session.store().blocks().to_vec();
        if session.undo() != CommandResult::Restored {
            break;
        }
        assert_eq!(session.redo(), CommandResult::Restored);
        assert_eq!(session.store().blocks(), before.as_slice());
        assert_invariants(&session);

        session.undo();
        assert_invariants(&session);
    }
}

#[test]
fn test_history_is_capped() {
    let (mut session, _clock) = session();
    for _ in 0..80 {
        let anchor = session.store().first().id().clone();
        session
            .execute(Command::Edit(EditCommand::InsertAfter {
                anchor,
                block_type: BlockType::Paragraph,
                content: BlockContent::Text("10".to_string()),
            }))
            .unwrap();
    }
    assert_eq!(session.history().undo_depth(), 50);

    let mut undone = 0;
    while session.undo() == CommandResult::Restored {
        undone += 1;
    }
    assert_eq!(undone, 50);
    assert_eq!(session.store().len(), 31);
}
