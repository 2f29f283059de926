//! Inline markup helpers.
//!
//! Text-bearing blocks store a small markup dialect: visible text with HTML entity escaping
//! (`&amp;`, `&lt;`, `&gt;`, `&quot;`, `&#39;`) plus the emphasis tags `<b>`, `<i>`, `<u>`,
//! `<s>`, `<code>` and the zero-width selection-lock markers `<lock>` / `</lock>`.
//!
//! All offsets in this module are **visible character offsets** (Unicode scalar values of the
//! decoded text). Split points snap back to the nearest grapheme cluster boundary.
//!
//! ```rust
//! use folio_core::inline;
//!
//! let (before, after) = inline::split_at("ab<b>cd</b>", 3);
//! assert_eq!(before, "ab<b>c</b>");
//! assert_eq!(after, "<b>d</b>");
//! assert_eq!(inline::concat(&before, &after), "ab<b>cd</b>");
//! ```

use unicode_segmentation::UnicodeSegmentation;

/// Opening lock marker.
pub const LOCK_OPEN: &str = "<lock>";
/// Closing lock marker.
pub const LOCK_CLOSE: &str = "</lock>";

/// Inline emphasis styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// `<b>`
    Bold,
    /// `<i>`
    Italic,
    /// `<u>`
    Underline,
    /// `<s>`
    Strike,
    /// `<code>`
    Code,
}

impl Style {
    const ALL: [Style; 5] = [
        Style::Bold,
        Style::Italic,
        Style::Underline,
        Style::Strike,
        Style::Code,
    ];

    /// Tag name without brackets.
    pub fn tag(self) -> &'static str {
        match self {
            Style::Bold => "b",
            Style::Italic => "i",
            Style::Underline => "u",
            Style::Strike => "s",
            Style::Code => "code",
        }
    }

    /// `<tag>`
    pub fn open_tag(self) -> String {
        format!("<{}>", self.tag())
    }

    /// `</tag>`
    pub fn close_tag(self) -> String {
        format!("</{}>", self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Char(char),
    Open(Style),
    Close(Style),
    LockOpen,
    LockClose,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

const ENTITIES: [(&str, char); 5] = [
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&#39;", '\''),
];

fn tokenize(markup: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(markup.len());
    let mut pos = 0usize;

    while pos < markup.len() {
        let rest = &markup[pos..];

        if rest.starts_with('<') {
            if let Some((kind, len)) = match_tag(rest) {
                tokens.push(Token {
                    kind,
                    start: pos,
                    end: pos + len,
                });
                pos += len;
                continue;
            }
        } else if rest.starts_with('&') {
            if let Some((entity, ch)) = ENTITIES.iter().find(|(e, _)| rest.starts_with(e)) {
                tokens.push(Token {
                    kind: TokenKind::Char(*ch),
                    start: pos,
                    end: pos + entity.len(),
                });
                pos += entity.len();
                continue;
            }
        }

        // Malformed markup degrades to literal characters.
        let Some(ch) = rest.chars().next() else {
            break;
        };
        tokens.push(Token {
            kind: TokenKind::Char(ch),
            start: pos,
            end: pos + ch.len_utf8(),
        });
        pos += ch.len_utf8();
    }

    tokens
}

fn match_tag(rest: &str) -> Option<(TokenKind, usize)> {
    if rest.starts_with(LOCK_OPEN) {
        return Some((TokenKind::LockOpen, LOCK_OPEN.len()));
    }
    if rest.starts_with(LOCK_CLOSE) {
        return Some((TokenKind::LockClose, LOCK_CLOSE.len()));
    }
    for style in Style::ALL {
        let open = style.open_tag();
        if rest.starts_with(&open) {
            return Some((TokenKind::Open(style), open.len()));
        }
        let close = style.close_tag();
        if rest.starts_with(&close) {
            return Some((TokenKind::Close(style), close.len()));
        }
    }
    None
}

/// Escape plain text for inclusion in markup.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Decoded visible text (tags removed, entities decoded).
pub fn visible_text(markup: &str) -> String {
    tokenize(markup)
        .into_iter()
        .filter_map(|t| match t.kind {
            TokenKind::Char(ch) => Some(ch),
            _ => None,
        })
        .collect()
}

/// Number of visible characters.
pub fn visible_len(markup: &str) -> usize {
    tokenize(markup)
        .iter()
        .filter(|t| matches!(t.kind, TokenKind::Char(_)))
        .count()
}

/// Whether the markup has no visible text.
pub fn is_blank(markup: &str) -> bool {
    visible_text(markup).trim().is_empty()
}

/// Snap a visible offset down to a grapheme cluster boundary and clamp it to the text length.
pub fn snap_to_grapheme(visible: &str, offset: usize) -> usize {
    let mut snapped = 0usize;
    let mut chars_seen = 0usize;
    for grapheme in visible.graphemes(true) {
        if chars_seen >= offset {
            break;
        }
        let len = grapheme.chars().count();
        if chars_seen + len > offset {
            break;
        }
        chars_seen += len;
        snapped = chars_seen;
    }
    snapped
}

/// Split markup at a visible offset, keeping inline styles balanced on both sides.
///
/// Styles open at the split point are closed at the end of `before` and reopened at the start of
/// `after`. Closing tags sitting exactly at the split stay in `before`; opening tags stay in
/// `after`.
pub fn split_at(markup: &str, offset: usize) -> (String, String) {
    let tokens = tokenize(markup);
    let visible: String = tokens
        .iter()
        .filter_map(|t| match t.kind {
            TokenKind::Char(ch) => Some(ch),
            _ => None,
        })
        .collect();
    let offset = snap_to_grapheme(&visible, offset);

    let mut seen = 0usize;
    let mut stack: Vec<Style> = Vec::new();
    let mut split_byte = markup.len();

    for token in &tokens {
        let at_boundary = seen == offset;
        match token.kind {
            TokenKind::Char(_) | TokenKind::Open(_) | TokenKind::LockOpen if at_boundary => {
                split_byte = token.start;
                break;
            }
            TokenKind::Char(_) => seen += 1,
            TokenKind::Open(style) => stack.push(style),
            TokenKind::Close(style) => {
                if let Some(pos) = stack.iter().rposition(|s| *s == style) {
                    stack.remove(pos);
                }
            }
            TokenKind::LockOpen | TokenKind::LockClose => {}
        }
    }

    let mut before = markup[..split_byte].to_string();
    for style in stack.iter().rev() {
        before.push_str(&style.close_tag());
    }
    let mut after = String::new();
    for style in &stack {
        after.push_str(&style.open_tag());
    }
    after.push_str(&markup[split_byte..]);

    (drop_empty_pairs(&before), drop_empty_pairs(&after))
}

fn drop_empty_pairs(markup: &str) -> String {
    let mut out = markup.to_string();
    loop {
        let mut changed = false;
        for style in Style::ALL {
            let empty = format!("{}{}", style.open_tag(), style.close_tag());
            if out.contains(&empty) {
                out = out.replace(&empty, "");
                changed = true;
            }
        }
        if !changed {
            return out;
        }
    }
}

/// Append `b` to `a`, fusing style runs that were cut at the junction.
///
/// This is the inverse of [`split_at`] for markup without redundant adjacent runs.
pub fn concat(a: &str, b: &str) -> String {
    let mut left = a;
    let mut right = b;
    'fuse: loop {
        for style in Style::ALL {
            let close = style.close_tag();
            let open = style.open_tag();
            if left.ends_with(&close) && right.starts_with(&open) {
                left = &left[..left.len() - close.len()];
                right = &right[open.len()..];
                continue 'fuse;
            }
        }
        break;
    }
    let mut out = String::with_capacity(left.len() + right.len());
    out.push_str(left);
    out.push_str(right);
    out
}

/// Remove the visible range `start..end`.
pub fn delete_range(markup: &str, start: usize, end: usize) -> String {
    let (start, end) = (start.min(end), start.max(end));
    let (before, rest) = split_at(markup, start);
    let (_, after) = split_at(&rest, end - start);
    concat(&before, &after)
}

/// Byte position right after the `offset`-th visible character (0 means the very start).
fn raw_position_after(tokens: &[Token], offset: usize) -> usize {
    if offset == 0 {
        return 0;
    }
    let mut seen = 0usize;
    for token in tokens {
        if let TokenKind::Char(_) = token.kind {
            seen += 1;
            if seen == offset {
                return token.end;
            }
        }
    }
    tokens.last().map(|t| t.end).unwrap_or(0)
}

/// Byte position right before the visible character at `offset`.
fn raw_position_before(tokens: &[Token], offset: usize, total_len: usize) -> usize {
    let mut seen = 0usize;
    for token in tokens {
        if let TokenKind::Char(_) = token.kind {
            if seen == offset {
                return token.start;
            }
            seen += 1;
        }
    }
    total_len
}

/// Insert plain text at a visible offset; the text inherits the style of the preceding character.
pub fn insert_text(markup: &str, offset: usize, text: &str) -> String {
    let tokens = tokenize(markup);
    let pos = raw_position_after(&tokens, offset);
    let mut out = String::with_capacity(markup.len() + text.len());
    out.push_str(&markup[..pos]);
    out.push_str(&escape(text));
    out.push_str(&markup[pos..]);
    out
}

/// Markup of the visible range `start..end`, with styles balanced.
pub fn slice(markup: &str, start: usize, end: usize) -> String {
    let (start, end) = (start.min(end), start.max(end));
    let (_, rest) = split_at(markup, start);
    let (middle, _) = split_at(&rest, end - start);
    middle
}

/// Whether the markup already carries lock markers.
pub fn has_lock_markers(markup: &str) -> bool {
    markup.contains(LOCK_OPEN) || markup.contains(LOCK_CLOSE)
}

/// Wrap the visible range `start..end` in lock markers without touching any other byte.
///
/// Returns `None` for an empty range or when markers are already present.
pub fn insert_lock_markers(markup: &str, start: usize, end: usize) -> Option<String> {
    let (start, end) = (start.min(end), start.max(end));
    if start == end || has_lock_markers(markup) {
        return None;
    }
    let tokens = tokenize(markup);
    let len = tokens
        .iter()
        .filter(|t| matches!(t.kind, TokenKind::Char(_)))
        .count();
    if end > len {
        return None;
    }

    let open_at = raw_position_before(&tokens, start, markup.len());
    let close_at = raw_position_after(&tokens, end);

    let mut out = String::with_capacity(markup.len() + LOCK_OPEN.len() + LOCK_CLOSE.len());
    out.push_str(&markup[..open_at]);
    out.push_str(LOCK_OPEN);
    out.push_str(&markup[open_at..close_at]);
    out.push_str(LOCK_CLOSE);
    out.push_str(&markup[close_at..]);
    Some(out)
}

/// Remove every lock marker.
pub fn strip_lock_markers(markup: &str) -> String {
    markup.replace(LOCK_OPEN, "").replace(LOCK_CLOSE, "")
}

/// Visible range currently wrapped by lock markers.
pub fn locked_range(markup: &str) -> Option<(usize, usize)> {
    let mut seen = 0usize;
    let mut start = None;
    for token in tokenize(markup) {
        match token.kind {
            TokenKind::Char(_) => seen += 1,
            TokenKind::LockOpen => start = Some(seen),
            TokenKind::LockClose => return start.map(|s| (s, seen)),
            _ => {}
        }
    }
    None
}
