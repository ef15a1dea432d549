use std::collections::BTreeSet;

use ropey::Rope;

use super::{Editor, Pos, Range};
use crate::error::CommandError;

const TAB_SIZE: usize = 4;
const INDENT_UNIT: usize = 2;

/// Direction for caret movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// A text buffer backed by a rope data structure.
///
/// Columns are character offsets within a line. The buffer always holds at
/// least one selection range; the first one is primary and its head is the
/// caret reported by [`Editor::cursor`].
pub struct EditorBuffer {
    rope: Rope,
    selections: Vec<Range>,
    /// Remembered column for vertical movement (sticky column).
    goal_column: Option<usize>,
}

impl EditorBuffer {
    /// Create a new buffer from a string, caret at the start.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            selections: vec![Range::default()],
            goal_column: None,
        }
    }

    /// Create an empty buffer.
    pub fn empty() -> Self {
        Self::from_text("")
    }

    /// Total number of lines in the buffer.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Get the content of a line (without trailing newline).
    pub fn line_at(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.rope.len_lines() {
            return None;
        }
        let s = self.rope.line(line_idx).to_string();
        Some(s.trim_end_matches('\n').trim_end_matches('\r').to_string())
    }

    /// Length of a line in characters (without trailing newline).
    pub fn line_len(&self, line_idx: usize) -> usize {
        self.line_at(line_idx).map_or(0, |s| s.chars().count())
    }

    /// Move every caret one step in the given direction.
    pub fn move_cursor(&mut self, direction: Direction) {
        match direction {
            Direction::Left => self.map_heads(|buf, head| buf.left_of(head)),
            Direction::Right => self.map_heads(|buf, head| buf.right_of(head)),
            Direction::Up | Direction::Down => self.move_vertical(direction),
        }
    }

    /// Delete the character before each caret, or the selected text (Backspace).
    ///
    /// Returns `true` if anything was deleted.
    pub fn delete_back(&mut self) -> bool {
        let spans = self.deletion_spans(|index, _| (index.saturating_sub(1), index));
        self.delete_spans(spans)
    }

    /// Delete the character after each caret, or the selected text (Delete).
    ///
    /// Returns `true` if anything was deleted.
    pub fn delete_forward(&mut self) -> bool {
        let spans = self.deletion_spans(|index, len| (index, (index + 1).min(len)));
        self.delete_spans(spans)
    }

    /// Break the line at each caret, carrying the line's indentation over.
    pub fn newline_and_indent(&mut self) {
        let head = self.primary().from();
        let indent: String = self
            .line_at(head.line)
            .unwrap_or_default()
            .chars()
            .take(head.ch)
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();
        self.replace_selection(&format!("\n{indent}"));
    }

    /// Shift every selected line by one indentation level.
    ///
    /// # Errors
    /// Returns [`CommandError::NotApplicable`] when de-indenting lines that
    /// carry no indentation at all.
    pub fn indent_lines(&mut self, more: bool) -> Result<(), CommandError> {
        let lines: BTreeSet<usize> = self
            .selections
            .iter()
            .flat_map(|range| range.from().line..=range.to().line)
            .collect();

        let mut changed = false;
        let mut shifts = Vec::with_capacity(lines.len());
        for &line in &lines {
            let content = self.line_at(line).unwrap_or_default();
            let leading = content
                .chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .count();
            let width = content.chars().take(leading).fold(0, |col, c| {
                if c == '\t' {
                    col + TAB_SIZE - col % TAB_SIZE
                } else {
                    col + 1
                }
            });
            let target = if more {
                width + INDENT_UNIT
            } else {
                width.saturating_sub(INDENT_UNIT)
            };
            if target == width && leading == width {
                shifts.push((line, 0isize));
                continue;
            }
            let start = self.rope.line_to_char(line);
            self.rope.remove(start..start + leading);
            self.rope.insert(start, &" ".repeat(target));
            changed = true;
            #[allow(clippy::cast_possible_wrap)]
            shifts.push((line, target as isize - leading as isize));
        }

        let shift_pos = |pos: Pos| {
            shifts
                .iter()
                .find(|(line, _)| *line == pos.line)
                .map_or(pos, |&(_, delta)| {
                    Pos::new(pos.line, pos.ch.saturating_add_signed(delta))
                })
        };
        let ranges: Vec<Range> = self
            .selections
            .iter()
            .map(|range| Range::new(shift_pos(range.anchor), shift_pos(range.head)))
            .collect();
        self.set_selections(&ranges);

        if !more && !changed {
            return Err(CommandError::NotApplicable("indentLess"));
        }
        Ok(())
    }

    /// Select the whole document.
    pub fn select_all(&mut self) {
        let end = self.pos_from_index(self.rope.len_chars());
        self.selections = vec![Range::new(Pos::default(), end)];
    }

    // --- Private helpers ---

    fn primary(&self) -> Range {
        self.selections.first().copied().unwrap_or_default()
    }

    fn clamp(&self, pos: Pos) -> Pos {
        let line = pos.line.min(self.line_count().saturating_sub(1));
        Pos::new(line, pos.ch.min(self.line_len(line)))
    }

    fn map_heads(&mut self, step: impl Fn(&Self, Pos) -> Pos) {
        self.goal_column = None;
        let ranges: Vec<Range> = self
            .selections
            .iter()
            .map(|range| Range::caret(step(self, range.head)))
            .collect();
        self.selections = ranges;
    }

    fn left_of(&self, head: Pos) -> Pos {
        if head.ch > 0 {
            Pos::new(head.line, head.ch - 1)
        } else if head.line > 0 {
            Pos::new(head.line - 1, self.line_len(head.line - 1))
        } else {
            head
        }
    }

    fn right_of(&self, head: Pos) -> Pos {
        if head.ch < self.line_len(head.line) {
            Pos::new(head.line, head.ch + 1)
        } else if head.line + 1 < self.line_count() {
            Pos::new(head.line + 1, 0)
        } else {
            head
        }
    }

    fn move_vertical(&mut self, direction: Direction) {
        let goal = self.goal_column.unwrap_or(self.primary().head.ch);
        let last = self.line_count().saturating_sub(1);
        let ranges: Vec<Range> = self
            .selections
            .iter()
            .map(|range| {
                let head = range.head;
                let line = match direction {
                    Direction::Up => head.line.saturating_sub(1),
                    _ => (head.line + 1).min(last),
                };
                if line == head.line {
                    return Range::caret(head);
                }
                Range::caret(Pos::new(line, goal.min(self.line_len(line))))
            })
            .collect();
        self.selections = ranges;
        self.goal_column = Some(goal);
    }

    fn word_left_of(&self, head: Pos) -> Pos {
        if head.ch == 0 {
            return self.left_of(head);
        }
        let line: Vec<char> = self.line_at(head.line).unwrap_or_default().chars().collect();
        let mut col = head.ch;
        while col > 0 && !is_word_char(line[col - 1]) {
            col -= 1;
        }
        while col > 0 && is_word_char(line[col - 1]) {
            col -= 1;
        }
        Pos::new(head.line, col)
    }

    fn word_right_of(&self, head: Pos) -> Pos {
        let line: Vec<char> = self.line_at(head.line).unwrap_or_default().chars().collect();
        if head.ch >= line.len() {
            return self.right_of(head);
        }
        let mut col = head.ch;
        while col < line.len() && !is_word_char(line[col]) {
            col += 1;
        }
        while col < line.len() && is_word_char(line[col]) {
            col += 1;
        }
        Pos::new(head.line, col)
    }

    fn deletion_spans(&self, around: impl Fn(usize, usize) -> (usize, usize)) -> Vec<(usize, usize)> {
        let len = self.rope.len_chars();
        self.selections
            .iter()
            .map(|range| {
                let from = self.index_from_pos(range.from());
                if range.is_empty() {
                    around(from, len)
                } else {
                    (from, self.index_from_pos(range.to()))
                }
            })
            .collect()
    }

    fn delete_spans(&mut self, spans: Vec<(usize, usize)>) -> bool {
        let mut order: Vec<usize> = (0..spans.len()).collect();
        order.sort_by_key(|&i| spans[i].0);

        let mut carets = vec![0; spans.len()];
        let mut merged: Vec<(usize, usize)> = Vec::new();
        let mut removed = 0;
        let mut last = 0;
        for i in order {
            let (start, end) = spans[i];
            let start = start.max(last);
            let end = end.max(start);
            carets[i] = start - removed;
            removed += end - start;
            last = end;
            if end > start {
                merged.push((start, end));
            }
        }

        self.goal_column = None;
        let deleted = !merged.is_empty();
        for &(start, end) in merged.iter().rev() {
            self.rope.remove(start..end);
        }
        self.selections = carets
            .into_iter()
            .map(|offset| Range::caret(self.pos_from_index(offset)))
            .collect();
        deleted
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl Editor for EditorBuffer {
    fn text(&self) -> String {
        self.rope.to_string()
    }

    fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.selections = vec![Range::default()];
        self.goal_column = None;
    }

    fn cursor(&self) -> Pos {
        self.primary().head
    }

    fn set_cursor(&mut self, pos: Pos) {
        self.goal_column = None;
        self.selections = vec![Range::caret(self.clamp(pos))];
    }

    fn selections(&self) -> Vec<Range> {
        self.selections.clone()
    }

    fn set_selections(&mut self, ranges: &[Range]) {
        if ranges.is_empty() {
            return;
        }
        self.goal_column = None;
        self.selections = ranges
            .iter()
            .map(|range| Range::new(self.clamp(range.anchor), self.clamp(range.head)))
            .collect();
    }

    fn run_command(&mut self, name: &str) -> Result<(), CommandError> {
        match name {
            "delCharBefore" => {
                self.delete_back();
            }
            "delCharAfter" => {
                self.delete_forward();
            }
            "goCharLeft" => self.move_cursor(Direction::Left),
            "goCharRight" => self.move_cursor(Direction::Right),
            "goLineUp" => self.move_cursor(Direction::Up),
            "goLineDown" => self.move_cursor(Direction::Down),
            "goLineStart" => self.map_heads(|_, head| Pos::new(head.line, 0)),
            "goLineEnd" => self.map_heads(|buf, head| Pos::new(head.line, buf.line_len(head.line))),
            "goDocStart" => self.set_cursor(Pos::default()),
            "goDocEnd" => {
                let end = self.pos_from_index(self.rope.len_chars());
                self.set_cursor(end);
            }
            "goWordLeft" | "goGroupLeft" => self.map_heads(Self::word_left_of),
            "goWordRight" | "goGroupRight" => self.map_heads(Self::word_right_of),
            "newlineAndIndent" => self.newline_and_indent(),
            "indentMore" => self.indent_lines(true)?,
            "indentLess" => self.indent_lines(false)?,
            "selectAll" => self.select_all(),
            "singleSelection" => {
                let primary = self.primary();
                self.selections = vec![primary];
            }
            other => return Err(CommandError::Unknown(other.to_string())),
        }
        Ok(())
    }

    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn pos_from_index(&self, index: usize) -> Pos {
        let index = index.min(self.rope.len_chars());
        let line = self.rope.char_to_line(index);
        Pos::new(line, index - self.rope.line_to_char(line))
    }

    fn index_from_pos(&self, pos: Pos) -> usize {
        let pos = self.clamp(pos);
        self.rope.line_to_char(pos.line) + pos.ch
    }
}

impl std::fmt::Debug for EditorBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorBuffer")
            .field(
                "rope",
                &format_args!("Rope({} lines)", self.rope.len_lines()),
            )
            .field("selections", &self.selections)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_at(text: &str, line: usize, ch: usize) -> EditorBuffer {
        let mut buf = EditorBuffer::from_text(text);
        buf.set_cursor(Pos::new(line, ch));
        buf
    }

    // --- Construction and basic queries ---

    #[test]
    fn test_empty_buffer_has_one_line() {
        let buf = EditorBuffer::empty();
        assert_eq!(buf.line_count(), 1);
        assert_eq!(buf.line_at(0), Some(String::new()));
    }

    #[test]
    fn test_from_text_trailing_newline() {
        let buf = EditorBuffer::from_text("hello\n");
        assert_eq!(buf.line_count(), 2);
        assert_eq!(buf.line_at(1), Some(String::new()));
    }

    #[test]
    fn test_line_len_counts_chars() {
        let buf = EditorBuffer::from_text("héllo\nhi");
        assert_eq!(buf.line_len(0), 5);
        assert_eq!(buf.line_len(1), 2);
    }

    #[test]
    fn test_cursor_starts_at_origin() {
        let buf = EditorBuffer::from_text("hello\nworld");
        assert_eq!(buf.cursor(), Pos::new(0, 0));
    }

    // --- Offsets ---

    #[test]
    fn test_index_and_pos_agree_with_default_impl() {
        let buf = EditorBuffer::from_text("ab\ncdé\n\nf");
        for index in 0..=buf.len_chars() {
            let pos = buf.pos_from_index(index);
            assert_eq!(buf.index_from_pos(pos), index);
        }
        assert_eq!(buf.pos_from_index(5), Pos::new(1, 2));
        assert_eq!(buf.pos_from_index(99), Pos::new(3, 1));
        assert_eq!(buf.index_from_pos(Pos::new(0, 40)), 2);
    }

    #[test]
    fn test_set_cursor_clamps() {
        let mut buf = EditorBuffer::from_text("ab\ncd");
        buf.set_cursor(Pos::new(7, 7));
        assert_eq!(buf.cursor(), Pos::new(1, 2));
    }

    // --- Editing through the trait ---

    #[test]
    fn test_replace_selection_inserts_at_every_caret() {
        let mut buf = EditorBuffer::from_text("a b");
        buf.set_selections(&[
            Range::caret(Pos::new(0, 1)),
            Range::caret(Pos::new(0, 3)),
        ]);
        buf.replace_selection("!");
        assert_eq!(buf.text(), "a! b!");
        assert_eq!(
            buf.selections(),
            vec![Range::caret(Pos::new(0, 2)), Range::caret(Pos::new(0, 5))]
        );
    }

    #[test]
    fn test_replace_selection_replaces_range() {
        let mut buf = EditorBuffer::from_text("hello world");
        buf.set_selections(&[Range::new(Pos::new(0, 6), Pos::new(0, 11))]);
        buf.replace_selection("there\nfriend");
        assert_eq!(buf.text(), "hello there\nfriend");
        assert_eq!(buf.cursor(), Pos::new(1, 6));
    }

    #[test]
    fn test_selected_text_reads_primary_range() {
        let mut buf = EditorBuffer::from_text("one\ntwo");
        buf.set_selections(&[Range::new(Pos::new(1, 3), Pos::new(0, 2))]);
        assert_eq!(buf.selected_text(), "e\ntwo");
    }

    // --- Deletion ---

    #[test]
    fn test_del_char_before_at_start_is_noop() {
        let mut buf = EditorBuffer::from_text("hello");
        assert!(!buf.delete_back());
        assert_eq!(buf.text(), "hello");
    }

    #[test]
    fn test_del_char_before_joins_lines() {
        let mut buf = buffer_at("hello\nworld", 1, 0);
        buf.run_command("delCharBefore").unwrap();
        assert_eq!(buf.text(), "helloworld");
        assert_eq!(buf.cursor(), Pos::new(0, 5));
    }

    #[test]
    fn test_del_char_before_multibyte() {
        let mut buf = buffer_at("café", 0, 4);
        buf.run_command("delCharBefore").unwrap();
        assert_eq!(buf.text(), "caf");
        assert_eq!(buf.cursor(), Pos::new(0, 3));
    }

    #[test]
    fn test_del_char_after_removes_char() {
        let mut buf = buffer_at("hello", 0, 1);
        buf.run_command("delCharAfter").unwrap();
        assert_eq!(buf.text(), "hllo");
        assert_eq!(buf.cursor(), Pos::new(0, 1));
    }

    #[test]
    fn test_del_char_after_at_end_is_noop() {
        let mut buf = buffer_at("hello", 0, 5);
        assert!(!buf.delete_forward());
    }

    #[test]
    fn test_delete_removes_selected_text() {
        let mut buf = EditorBuffer::from_text("hello world");
        buf.set_selections(&[Range::new(Pos::new(0, 5), Pos::new(0, 11))]);
        buf.run_command("delCharBefore").unwrap();
        assert_eq!(buf.text(), "hello");
        assert_eq!(buf.cursor(), Pos::new(0, 5));
    }

    #[test]
    fn test_delete_back_with_several_carets() {
        let mut buf = EditorBuffer::from_text("ab cd");
        buf.set_selections(&[
            Range::caret(Pos::new(0, 2)),
            Range::caret(Pos::new(0, 5)),
        ]);
        buf.run_command("delCharBefore").unwrap();
        assert_eq!(buf.text(), "a c");
        assert_eq!(
            buf.selections(),
            vec![Range::caret(Pos::new(0, 1)), Range::caret(Pos::new(0, 3))]
        );
    }

    // --- Movement ---

    #[test]
    fn test_go_char_left_wraps_to_prev_line() {
        let mut buf = buffer_at("hello\nworld", 1, 0);
        buf.run_command("goCharLeft").unwrap();
        assert_eq!(buf.cursor(), Pos::new(0, 5));
    }

    #[test]
    fn test_go_char_right_wraps_to_next_line() {
        let mut buf = buffer_at("hello\nworld", 0, 5);
        buf.run_command("goCharRight").unwrap();
        assert_eq!(buf.cursor(), Pos::new(1, 0));
    }

    #[test]
    fn test_go_char_right_at_end_is_noop() {
        let mut buf = buffer_at("hi", 0, 2);
        buf.run_command("goCharRight").unwrap();
        assert_eq!(buf.cursor(), Pos::new(0, 2));
    }

    #[test]
    fn test_column_memory_across_short_line() {
        let mut buf = buffer_at("long line\nab\nanother long", 0, 7);
        buf.run_command("goLineDown").unwrap();
        assert_eq!(buf.cursor(), Pos::new(1, 2));
        buf.run_command("goLineDown").unwrap();
        assert_eq!(buf.cursor(), Pos::new(2, 7));
    }

    #[test]
    fn test_go_line_up_at_first_line_is_noop() {
        let mut buf = buffer_at("hello\nworld", 0, 3);
        buf.run_command("goLineUp").unwrap();
        assert_eq!(buf.cursor(), Pos::new(0, 3));
    }

    #[test]
    fn test_line_start_and_end() {
        let mut buf = buffer_at("hello", 0, 2);
        buf.run_command("goLineEnd").unwrap();
        assert_eq!(buf.cursor(), Pos::new(0, 5));
        buf.run_command("goLineStart").unwrap();
        assert_eq!(buf.cursor(), Pos::new(0, 0));
    }

    #[test]
    fn test_doc_start_and_end() {
        let mut buf = buffer_at("ab\ncde", 0, 1);
        buf.run_command("goDocEnd").unwrap();
        assert_eq!(buf.cursor(), Pos::new(1, 3));
        buf.run_command("goDocStart").unwrap();
        assert_eq!(buf.cursor(), Pos::new(0, 0));
    }

    #[test]
    fn test_word_movement() {
        let mut buf = buffer_at("hello big_world!", 0, 8);
        buf.run_command("goWordLeft").unwrap();
        assert_eq!(buf.cursor(), Pos::new(0, 6));
        buf.run_command("goWordRight").unwrap();
        assert_eq!(buf.cursor(), Pos::new(0, 15));
    }

    #[test]
    fn test_word_left_at_start_of_line_wraps() {
        let mut buf = buffer_at("hello\nworld", 1, 0);
        buf.run_command("goWordLeft").unwrap();
        assert_eq!(buf.cursor(), Pos::new(0, 5));
    }

    // --- Structural commands ---

    #[test]
    fn test_newline_and_indent_keeps_indentation() {
        let mut buf = buffer_at("    foo();", 0, 10);
        buf.run_command("newlineAndIndent").unwrap();
        assert_eq!(buf.text(), "    foo();\n    ");
        assert_eq!(buf.cursor(), Pos::new(1, 4));
    }

    #[test]
    fn test_indent_more_and_less_shift_caret() {
        let mut buf = buffer_at("a\nb", 1, 1);
        buf.run_command("indentMore").unwrap();
        assert_eq!(buf.text(), "a\n  b");
        assert_eq!(buf.cursor(), Pos::new(1, 3));
        buf.run_command("indentLess").unwrap();
        assert_eq!(buf.text(), "a\nb");
        assert_eq!(buf.cursor(), Pos::new(1, 1));
    }

    #[test]
    fn test_indent_covers_every_selected_line() {
        let mut buf = EditorBuffer::from_text("a\nb\nc");
        buf.set_selections(&[Range::new(Pos::new(0, 0), Pos::new(1, 1))]);
        buf.run_command("indentMore").unwrap();
        assert_eq!(buf.text(), "  a\n  b\nc");
    }

    #[test]
    fn test_indent_less_without_indentation_fails() {
        let mut buf = buffer_at("abc", 0, 1);
        assert_eq!(
            buf.run_command("indentLess"),
            Err(CommandError::NotApplicable("indentLess"))
        );
        assert_eq!(buf.text(), "abc");
    }

    #[test]
    fn test_indent_levels_are_two_spaces() {
        let mut buf = buffer_at("x", 0, 0);
        buf.run_command("indentMore").unwrap();
        buf.run_command("indentMore").unwrap();
        assert_eq!(buf.text(), "    x");
        buf.run_command("indentLess").unwrap();
        assert_eq!(buf.text(), "  x");
    }

    #[test]
    fn test_indent_less_normalizes_tabs() {
        let mut buf = buffer_at("\tx", 0, 1);
        buf.run_command("indentLess").unwrap();
        assert_eq!(buf.text(), "  x");
    }

    #[test]
    fn test_select_all_and_single_selection() {
        let mut buf = EditorBuffer::from_text("ab\ncd");
        buf.run_command("selectAll").unwrap();
        assert_eq!(buf.selected_text(), "ab\ncd");
        buf.add_selection(Range::caret(Pos::new(0, 1)));
        assert_eq!(buf.selections().len(), 2);
        buf.run_command("singleSelection").unwrap();
        assert_eq!(buf.selections().len(), 1);
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        let mut buf = EditorBuffer::from_text("x");
        assert_eq!(
            buf.run_command("transposeChars"),
            Err(CommandError::Unknown("transposeChars".to_string()))
        );
    }

    // --- Trait helpers ---

    #[test]
    fn test_find_matching_delimiter_prefers_char_before() {
        let buf = EditorBuffer::from_text("f(a) {\n  b();\n}");
        assert_eq!(buf.find_matching_delimiter(Pos::new(0, 2)), Some(Pos::new(0, 3)));
        assert_eq!(buf.find_matching_delimiter(Pos::new(0, 5)), Some(Pos::new(2, 0)));
        assert_eq!(buf.find_matching_delimiter(Pos::new(2, 1)), Some(Pos::new(0, 5)));
        assert_eq!(buf.find_matching_delimiter(Pos::new(1, 0)), None);
    }

    #[test]
    fn test_find_text_offset_clamps() {
        let buf = EditorBuffer::from_text("ab\ncd");
        assert_eq!(buf.find_text_offset(Pos::new(0, 1), 2), Pos::new(1, 0));
        assert_eq!(buf.find_text_offset(Pos::new(0, 1), -5), Pos::new(0, 0));
        assert_eq!(buf.find_text_offset(Pos::new(1, 1), 10), Pos::new(1, 2));
    }

    #[test]
    fn test_coords_of_uses_display_width() {
        let buf = EditorBuffer::from_text("ab\n日本x");
        let coords = buf.coords_of(Pos::new(1, 2));
        assert!((coords.x - 28.0).abs() < f64::EPSILON);
        assert!((coords.y - 18.0).abs() < f64::EPSILON);
    }
}
