use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::Model;
use crate::editor::{CHAR_WIDTH, Coords, LINE_HEIGHT, Pos, Range};

use super::{GUTTER_PADDING, overlays, status, style};

/// Screen areas of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Areas {
    /// Empty when the scenario has no roadmap.
    pub roadmap: Rect,
    pub code: Rect,
    /// Empty unless a toast is showing.
    pub toast: Rect,
    pub status: Rect,
}

pub fn areas(model: &Model, area: Rect) -> Areas {
    let roadmap_rows = u16::from(!model.player.stage().roadmap.is_empty());
    let toast_rows = u16::from(model.active_toast().is_some());
    let [roadmap, code, toast, status] = Layout::vertical([
        Constraint::Length(roadmap_rows),
        Constraint::Min(0),
        Constraint::Length(toast_rows),
        Constraint::Length(1),
    ])
    .areas(area);
    Areas {
        roadmap,
        code,
        toast,
        status,
    }
}

/// Render the complete UI.
pub fn render(model: &mut Model, frame: &mut Frame) {
    let areas = areas(model, frame.area());
    let cursor = model.player.editor().cursor();
    model.keep_line_visible(cursor.line, usize::from(areas.code.height));

    status::render_roadmap(model, frame, areas.roadmap);
    render_code(model, frame, areas.code);
    overlays::render_annotations(model, frame, &areas);
    if areas.toast.height > 0 {
        status::render_toast_bar(model, frame, areas.toast);
    }
    status::render_status_bar(model, frame, areas.status);

    if model.help_visible {
        overlays::render_help_overlay(model, frame, frame.area());
    }
}

fn render_code(model: &Model, frame: &mut Frame, area: Rect) {
    let editor = model.player.editor();
    let text = editor.text();
    let lines: Vec<&str> = text.split('\n').collect();
    let gutter = usize::from(line_number_width(lines.len()));
    let cursor = editor.cursor();
    let selections: Vec<Range> = editor
        .selections()
        .into_iter()
        .filter(|range| !range.is_empty())
        .collect();

    let content: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(model.scroll_offset)
        .take(usize::from(area.height))
        .map(|(idx, line)| {
            let number = format!("{:>gutter$}{}", idx + 1, " ".repeat(usize::from(GUTTER_PADDING)));
            let mut spans = vec![Span::styled(number, style::gutter())];
            spans.extend(code_spans(line, idx, cursor, &selections));
            Line::from(spans)
        })
        .collect();
    frame.render_widget(Paragraph::new(content), area);
}

/// Spans of one code line, cursor and selections applied.
fn code_spans(line: &str, line_idx: usize, cursor: Pos, selections: &[Range]) -> Vec<Span<'static>> {
    let cell_style = |ch: usize| {
        let pos = Pos::new(line_idx, ch);
        if pos == cursor {
            style::cursor()
        } else if selections.iter().any(|range| range.from() <= pos && pos < range.to()) {
            style::selection()
        } else {
            Style::default()
        }
    };

    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut run = String::new();
    let mut run_style = Style::default();
    for (ch, c) in line.chars().enumerate() {
        let current = cell_style(ch);
        if current != run_style && !run.is_empty() {
            spans.push(Span::styled(std::mem::take(&mut run), run_style));
        }
        run_style = current;
        run.push(c);
    }
    if !run.is_empty() {
        spans.push(Span::styled(run, run_style));
    }
    if cursor.line == line_idx && cursor.ch >= line.chars().count() {
        spans.push(Span::styled(" ", style::cursor()));
    }
    spans
}

/// Screen cell of editor coordinates, if the line is visible.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn code_cell(coords: Coords, code: Rect, gutter: u16, scroll_offset: usize) -> Option<Position> {
    let column = (coords.x / CHAR_WIDTH).round().max(0.0) as u16;
    let line = (coords.y / LINE_HEIGHT).round().max(0.0) as usize;
    let row = line.checked_sub(scroll_offset)?;
    if row >= usize::from(code.height) {
        return None;
    }
    let x = code.x + gutter + GUTTER_PADDING + column;
    Some(Position::new(x.min(code.right().saturating_sub(1)), code.y + row as u16))
}

/// Calculate the width needed for line numbers.
pub const fn line_number_width(total_lines: usize) -> u16 {
    if total_lines < 10 {
        1
    } else if total_lines < 100 {
        2
    } else if total_lines < 1_000 {
        3
    } else if total_lines < 10_000 {
        4
    } else if total_lines < 100_000 {
        5
    } else {
        6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_spans_mark_cursor_and_selection() {
        let selection = [Range::new(Pos::new(0, 1), Pos::new(0, 3))];
        let spans = code_spans("abcd", 0, Pos::new(0, 3), &selection);
        let parts: Vec<&str> = spans.iter().map(|span| span.content.as_ref()).collect();
        assert_eq!(parts, vec!["a", "bc", "d"]);
        assert_eq!(spans[1].style, style::selection());
        assert_eq!(spans[2].style, style::cursor());
    }

    #[test]
    fn test_cursor_at_line_end_gets_a_cell() {
        let spans = code_spans("ab", 0, Pos::new(0, 2), &[]);
        assert_eq!(spans.last().map(|span| span.content.as_ref()), Some(" "));
    }

    #[test]
    fn test_code_cell_respects_scroll() {
        let code = Rect::new(0, 1, 40, 5);
        let coords = Coords {
            x: 3.0 * CHAR_WIDTH,
            y: 4.0 * LINE_HEIGHT,
        };
        assert_eq!(code_cell(coords, code, 2, 0), Some(Position::new(6, 5)));
        assert_eq!(code_cell(coords, code, 2, 5), None);
        assert_eq!(code_cell(Coords { x: 0.0, y: 9.0 * LINE_HEIGHT }, code, 2, 0), None);
    }
}
