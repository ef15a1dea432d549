use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::app::Model;
use crate::stage::{Annotation, AnnotationAnchor, COMPILE_BUTTON, Placement};
use crate::texts::{BACK, NEXT, PLAY};

use super::render::{Areas, code_cell, line_number_width};
use super::{status, style};

/// Widest text column of a message bubble.
const MAX_BUBBLE_TEXT: u16 = 44;

pub fn render_annotations(model: &Model, frame: &mut Frame, areas: &Areas) {
    let stage_area = Rect {
        height: areas.code.bottom().saturating_sub(areas.roadmap.y),
        ..areas.roadmap
    };
    let gutter = line_number_width(model.player.editor().text().split('\n').count());
    for annotation in model.player.stage().annotations() {
        let Some(anchor) = anchor_point(model, annotation, areas, gutter) else {
            continue;
        };
        let lines = wrap(&annotation.text, MAX_BUBBLE_TEXT.min(stage_area.width.saturating_sub(2)));
        let bubble = bubble_rect(&lines, anchor, annotation.placement, stage_area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(style::annotation(&annotation.class));
        let text: Vec<Line> = lines.into_iter().map(Line::raw).collect();
        frame.render_widget(Clear, bubble);
        frame.render_widget(Paragraph::new(text).block(block), bubble);
    }
}

/// The cell a bubble points at.
fn anchor_point(model: &Model, annotation: &Annotation, areas: &Areas, gutter: u16) -> Option<Position> {
    match &annotation.anchor {
        AnnotationAnchor::Code(coords) => code_cell(*coords, areas.code, gutter, model.scroll_offset),
        AnnotationAnchor::Element(selector) if selector.as_str() == COMPILE_BUTTON => {
            let button = status::compile_button_rect(model, areas.status)?;
            Some(Position::new(button.x, areas.code.bottom()))
        }
        // Other page elements have no place on screen; point at the code corner.
        AnnotationAnchor::Element(_) => Some(Position::new(
            areas.code.right().saturating_sub(1),
            areas.code.bottom(),
        )),
    }
}

/// Bubble rectangle next to `anchor`, clamped into `bounds`.
pub(super) fn bubble_rect(lines: &[String], anchor: Position, placement: Placement, bounds: Rect) -> Rect {
    let text_width = lines
        .iter()
        .map(|line| u16::try_from(line.width()).unwrap_or(u16::MAX))
        .max()
        .unwrap_or(0);
    let width = (text_width + 2).min(bounds.width);
    let height = (u16::try_from(lines.len()).unwrap_or(u16::MAX).saturating_add(2)).min(bounds.height);

    let (x, y) = match placement {
        Placement::Top => (anchor.x.saturating_sub(width / 2), anchor.y.saturating_sub(height)),
        Placement::Bottom => (anchor.x.saturating_sub(width / 2), anchor.y + 1),
        Placement::Left => (anchor.x.saturating_sub(width), anchor.y.saturating_sub(height / 2)),
        Placement::Right => (anchor.x + 1, anchor.y.saturating_sub(height / 2)),
    };
    let x = x.clamp(bounds.x, bounds.right().saturating_sub(width).max(bounds.x));
    let y = y.clamp(bounds.y, bounds.bottom().saturating_sub(height).max(bounds.y));
    Rect::new(x, y, width, height)
}

/// Greedy word wrap at display `width`; newlines are kept.
pub(super) fn wrap(text: &str, width: u16) -> Vec<String> {
    let width = usize::from(width.max(1));
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if !line.is_empty() && line.width() + 1 + word.width() > width {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }
    lines
}

pub fn render_help_overlay(model: &Model, frame: &mut Frame, area: Rect) {
    let texts = model.player.texts();
    let rows = [
        ("space", format!("{} / {}", texts.get(PLAY), status::play_label(model))),
        ("n, →", texts.get(NEXT).to_string()),
        ("b, ←", texts.get(BACK).to_string()),
        ("s", "Stop".to_string()),
        ("r", "Reset".to_string()),
        ("f", "Fast-forward".to_string()),
        ("Enter", "Click the message".to_string()),
        ("c", "Click the compile button".to_string()),
        ("q", "Quit".to_string()),
    ];
    let lines: Vec<Line> = rows
        .into_iter()
        .map(|(key, action)| {
            Line::from(vec![
                Span::styled(
                    format!("{key:>7}  "),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(action),
            ])
        })
        .collect();

    let height = u16::try_from(lines.len()).unwrap_or(u16::MAX) + 4;
    let popup = centered_popup_rect(44, height, area);
    let block = Block::default()
        .title("Keys")
        .borders(Borders::ALL)
        .padding(Padding::uniform(1))
        .style(Style::default().bg(Color::Black).fg(Color::White));
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn centered_popup_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w) / 2);
    let y = area.y + (area.height.saturating_sub(h) / 2);
    Rect::new(x, y, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_breaks_on_words_and_keeps_paragraphs() {
        let lines = wrap("one two three\n\nfour", 8);
        assert_eq!(lines, vec!["one two", "three", "", "four"]);
    }

    #[test]
    fn test_top_bubble_sits_above_anchor() {
        let lines = vec!["hello".to_string()];
        let bounds = Rect::new(0, 0, 80, 20);
        let rect = bubble_rect(&lines, Position::new(20, 10), Placement::Top, bounds);
        assert_eq!(rect, Rect::new(17, 7, 7, 3));
    }

    #[test]
    fn test_bubble_is_clamped_into_bounds() {
        let lines = vec!["hello".to_string()];
        let bounds = Rect::new(0, 1, 30, 10);
        let rect = bubble_rect(&lines, Position::new(29, 1), Placement::Right, bounds);
        assert_eq!(rect.right(), 30);
        assert_eq!(rect.y, 1);
    }
}
