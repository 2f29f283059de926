//! Markdown-style typing shortcuts.
//!
//! A pure matcher over the visible text of the block being edited. The first matching rule in
//! [`SHORTCUTS`] order wins; the session strips the trigger and converts only that block.

use regex::Regex;
use std::sync::LazyLock;

use crate::block::BlockType;

/// A recognized shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortcutMatch {
    /// Type the block converts to.
    pub target: BlockType,
    /// Number of leading visible characters that form the trigger.
    pub trigger_len: usize,
}

struct Shortcut {
    pattern: &'static str,
    target: BlockType,
}

/// Ordered shortcut table. Longer heading prefixes come first so `## ` never reads as `# `.
const SHORTCUTS: [Shortcut; 7] = [
    Shortcut {
        pattern: r"^### ",
        target: BlockType::Heading3,
    },
    Shortcut {
        pattern: r"^## ",
        target: BlockType::Heading2,
    },
    Shortcut {
        pattern: r"^# ",
        target: BlockType::Heading1,
    },
    Shortcut {
        pattern: r"^[-*] ",
        target: BlockType::Bullet,
    },
    Shortcut {
        pattern: r"^\d+\. ",
        target: BlockType::Number,
    },
    Shortcut {
        pattern: r"^> ",
        target: BlockType::Quote,
    },
    Shortcut {
        pattern: r"^(?:---|\*\*\*)$",
        target: BlockType::Divider,
    },
];

static COMPILED: LazyLock<Vec<(Regex, BlockType)>> = LazyLock::new(|| {
    SHORTCUTS
        .iter()
        .map(|s| {
            (
                Regex::new(s.pattern).expect("static shortcut pattern"),
                s.target,
            )
        })
        .collect()
});

/// Match the visible text of a block against the shortcut table.
///
/// ```rust
/// use folio_core::{BlockType, pattern::match_shortcut};
///
/// let m = match_shortcut("## Results").unwrap();
/// assert_eq!(m.target, BlockType::Heading2);
/// assert_eq!(m.trigger_len, 3);
/// assert!(match_shortcut("#hashtag").is_none());
/// ```
pub fn match_shortcut(visible: &str) -> Option<ShortcutMatch> {
    COMPILED.iter().find_map(|(regex, target)| {
        regex.find(visible).map(|m| ShortcutMatch {
            target: *target,
            trigger_len: visible[..m.end()].chars().count(),
        })
    })
}
