use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthStr;

use crate::app::Model;
use crate::player::PlayerState;
use crate::stage::CompileIndicator;
use crate::texts::{BACK, COMPILE_AND_TEST, NEXT, PLAY, REPLAY, STOP};

use super::style;

pub fn render_roadmap(model: &Model, frame: &mut Frame, area: Rect) {
    if area.height == 0 {
        return;
    }
    let roadmap = &model.player.stage().roadmap;
    let mut spans = vec![Span::raw(" ")];
    for (i, label) in roadmap.labels().iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" › ", style::gutter()));
        }
        let n = i + 1;
        spans.push(Span::styled(
            format!("{n}. {label}"),
            style::roadmap_step(roadmap.status(n)),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Label of the play/pause control for the current state.
pub fn play_label(model: &Model) -> &str {
    let texts = model.player.texts();
    match model.player.state() {
        PlayerState::Playing => texts.get(STOP),
        PlayerState::Idle if model.player.index().is_some() => texts.get(REPLAY),
        PlayerState::Idle | PlayerState::Paused => texts.get(PLAY),
    }
}

/// The compile button's text, when the scenario has one.
fn compile_label(model: &Model) -> Option<String> {
    if !model.has_compile {
        return None;
    }
    let label = model.player.texts().get(COMPILE_AND_TEST);
    let mark = match model.player.stage().compile.indicator {
        CompileIndicator::Idle => ' ',
        CompileIndicator::Running => '…',
        CompileIndicator::Succeeded => '✓',
        CompileIndicator::Failed => '✗',
    };
    Some(format!("[{mark}{label} ]"))
}

/// Where the compile button sits in the status bar.
pub fn compile_button_rect(model: &Model, status: Rect) -> Option<Rect> {
    let label = compile_label(model)?;
    let width = u16::try_from(label.width()).unwrap_or(u16::MAX).min(status.width);
    Some(Rect {
        x: status.right().saturating_sub(width),
        width,
        ..status
    })
}

pub fn render_status_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let player = &model.player;
    let texts = player.texts();
    let step = match player.index() {
        Some(index) => format!("{}/{}", index + 1, player.steps().len()),
        None => format!("-/{}", player.steps().len()),
    };
    let state = match player.state() {
        PlayerState::Idle => "idle",
        PlayerState::Playing => "playing",
        PlayerState::Paused => "paused",
    };
    let fast_forward = if player.is_fast_forward() { " [ff]" } else { "" };
    let watching = if model.watch_enabled { " [watching]" } else { "" };
    let name = model.scenario_path.file_name().map_or_else(
        || "scenario".to_string(),
        |name| name.to_string_lossy().to_string(),
    );

    let status = format!(
        " {name}  {state} {step}{fast_forward}{watching}  space:{}  n:{}  b:{}  ?:help",
        play_label(model),
        texts.get(NEXT),
        texts.get(BACK),
    );
    frame.render_widget(Paragraph::new(status).style(style::status_bar()), area);

    if let (Some(label), Some(rect)) = (compile_label(model), compile_button_rect(model, area)) {
        let button = Paragraph::new(label).style(style::compile_button(player.stage().compile));
        frame.render_widget(button, rect);
    }
}

pub fn render_toast_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some((message, level)) = model.active_toast() else {
        return;
    };
    let (prefix, toast_style) = style::toast(level);
    let toast = Paragraph::new(format!("{prefix} {message}")).style(toast_style);
    frame.render_widget(toast, area);
}
