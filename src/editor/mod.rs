//! The editor surface the player drives.
//!
//! [`Editor`] is the collaborator contract: a handful of required
//! capabilities (text, cursor, selections, named commands) and a set of
//! provided helpers built on top of them that an embedding may override
//! with something faster. [`EditorBuffer`] is the rope-backed
//! implementation used by the terminal front end and the tests.

mod buffer;

pub use buffer::{Direction, EditorBuffer};

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::error::CommandError;

/// Height of one rendered line, in the units of [`Coords`].
pub const LINE_HEIGHT: f64 = 18.0;
/// Width of one narrow character cell, in the units of [`Coords`].
pub const CHAR_WIDTH: f64 = 7.0;

/// A document position: zero-based line and character column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub line: usize,
    pub ch: usize,
}

impl Pos {
    pub const fn new(line: usize, ch: usize) -> Self {
        Self { line, ch }
    }
}

/// A selection range. `head` is where the caret sits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub anchor: Pos,
    pub head: Pos,
}

impl Range {
    pub const fn new(anchor: Pos, head: Pos) -> Self {
        Self { anchor, head }
    }

    /// An empty range (a bare caret) at `pos`.
    pub const fn caret(pos: Pos) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    pub fn from(&self) -> Pos {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> Pos {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }
}

/// Screen coordinates of a document position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub x: f64,
    pub y: f64,
}

/// Capabilities the player needs from an editor widget.
pub trait Editor {
    /// Full document text.
    fn text(&self) -> String;

    /// Replace the whole document. The caret moves to the start.
    fn set_text(&mut self, text: &str);

    /// Position of the primary caret.
    fn cursor(&self) -> Pos;

    /// Collapse all selections into a caret at `pos` (clamped).
    fn set_cursor(&mut self, pos: Pos);

    /// Current selection ranges; the first one is primary.
    fn selections(&self) -> Vec<Range>;

    /// Replace the selection set. An empty slice leaves it untouched.
    fn set_selections(&mut self, ranges: &[Range]);

    /// Run a named editor command.
    ///
    /// # Errors
    /// Returns an error if the command is unknown or cannot be applied.
    fn run_command(&mut self, name: &str) -> Result<(), CommandError>;

    /// Number of characters in the document.
    fn len_chars(&self) -> usize {
        self.text().chars().count()
    }

    /// Convert a character offset into a position, clamping past the end.
    fn pos_from_index(&self, index: usize) -> Pos {
        let mut pos = Pos::default();
        for ch in self.text().chars().take(index) {
            if ch == '\n' {
                pos.line += 1;
                pos.ch = 0;
            } else {
                pos.ch += 1;
            }
        }
        pos
    }

    /// Convert a position into a character offset, clamping line and column.
    fn index_from_pos(&self, pos: Pos) -> usize {
        let text = self.text();
        let mut offset = 0;
        let mut lines = text.split('\n').peekable();
        let mut line = 0;
        while let Some(content) = lines.next() {
            let len = content.chars().count();
            if line == pos.line || lines.peek().is_none() {
                return offset + pos.ch.min(len);
            }
            offset += len + 1;
            line += 1;
        }
        offset
    }

    /// Move `delta` characters away from `pos`, stopping at document edges.
    fn find_text_offset(&self, pos: Pos, delta: isize) -> Pos {
        let index = self.index_from_pos(pos);
        let target = index.saturating_add_signed(delta).min(self.len_chars());
        self.pos_from_index(target)
    }

    /// Find the bracket matching the one just before `pos` (or at `pos`).
    ///
    /// Returns the position of the matching bracket character.
    fn find_matching_delimiter(&self, pos: Pos) -> Option<Pos> {
        let chars: Vec<char> = self.text().chars().collect();
        let index = self.index_from_pos(pos);
        let at = index
            .checked_sub(1)
            .filter(|&i| chars.get(i).is_some_and(|&c| is_bracket(c)))
            .or_else(|| Some(index).filter(|&i| chars.get(i).is_some_and(|&c| is_bracket(c))))?;
        scan_for_bracket(&chars, at).map(|found| self.pos_from_index(found))
    }

    /// Screen coordinates of `pos`, derived from line height and cell width.
    fn coords_of(&self, pos: Pos) -> Coords {
        let text = self.text();
        let line = text.split('\n').nth(pos.line).unwrap_or_default();
        let prefix: String = line.chars().take(pos.ch).collect();
        #[allow(clippy::cast_precision_loss)]
        Coords {
            x: prefix.width() as f64 * CHAR_WIDTH,
            y: pos.line as f64 * LINE_HEIGHT,
        }
    }

    /// Replace every selection with `text`, leaving a caret after each insert.
    fn replace_selection(&mut self, text: &str) {
        let selections = self.selections();
        let chars: Vec<char> = self.text().chars().collect();
        let mut spans: Vec<(usize, usize, usize)> = selections
            .iter()
            .enumerate()
            .map(|(i, range)| {
                (
                    i,
                    self.index_from_pos(range.from()),
                    self.index_from_pos(range.to()),
                )
            })
            .collect();
        spans.sort_by_key(|&(_, from, _)| from);

        let inserted = text.chars().count();
        let mut out = String::with_capacity(chars.len() + inserted * spans.len());
        let mut carets = vec![0; selections.len()];
        let mut written = 0;
        let mut last = 0;
        for (i, from, to) in spans {
            let from = from.max(last);
            let to = to.max(from);
            out.extend(&chars[last..from]);
            out.push_str(text);
            written += (from - last) + inserted;
            carets[i] = written;
            last = to;
        }
        out.extend(&chars[last..]);

        self.set_text(&out);
        let ranges: Vec<Range> = carets
            .into_iter()
            .map(|offset| Range::caret(self.pos_from_index(offset)))
            .collect();
        self.set_selections(&ranges);
    }

    /// Add a range to the selection set.
    fn add_selection(&mut self, range: Range) {
        let mut ranges = self.selections();
        ranges.push(range);
        self.set_selections(&ranges);
    }

    /// Text covered by the primary selection.
    fn selected_text(&self) -> String {
        let Some(primary) = self.selections().first().copied() else {
            return String::new();
        };
        let from = self.index_from_pos(primary.from());
        let to = self.index_from_pos(primary.to());
        self.text().chars().skip(from).take(to - from).collect()
    }
}

const fn is_bracket(ch: char) -> bool {
    matches!(ch, '(' | ')' | '[' | ']' | '{' | '}')
}

const fn is_opening(ch: char) -> bool {
    matches!(ch, '(' | '[' | '{')
}

/// Walk away from the bracket at `at` until the nesting depth returns to zero.
///
/// Nested brackets of any kind are counted; the kind of the bracket that
/// closes the scan is not checked.
pub(crate) fn scan_for_bracket(chars: &[char], at: usize) -> Option<usize> {
    let forward = is_opening(*chars.get(at)?);
    let mut depth = 0usize;
    let mut i = at;
    loop {
        if forward {
            i += 1;
            if i >= chars.len() {
                return None;
            }
        } else {
            i = i.checked_sub(1)?;
        }
        let ch = chars[i];
        if !is_bracket(ch) {
            continue;
        }
        if is_opening(ch) == forward {
            depth += 1;
        } else if depth == 0 {
            return Some(i);
        } else {
            depth -= 1;
        }
    }
}
