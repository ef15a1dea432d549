//! Colors of the stage elements.
//!
//! Plain ANSI colors, so the terminal palette decides the exact shades.

use ratatui::style::{Color, Modifier, Style};

use crate::app::ToastLevel;
use crate::stage::{CompileButton, CompileIndicator, StepStatus};

/// Class a message gets after a successful compile.
pub const SUCCESS_CLASS: &str = "tooltip-success";
/// Class a message gets after a failed compile.
pub const DANGER_CLASS: &str = "tooltip-danger";

pub fn gutter() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn cursor() -> Style {
    Style::default().bg(Color::White).fg(Color::Black)
}

pub fn selection() -> Style {
    Style::default().bg(Color::Blue).fg(Color::White)
}

pub fn roadmap_step(status: StepStatus) -> Style {
    match status {
        StepStatus::Pending => Style::default().fg(Color::DarkGray),
        StepStatus::Active => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        StepStatus::Completed => Style::default().fg(Color::Green),
    }
}

pub fn compile_button(button: CompileButton) -> Style {
    let style = match button.indicator {
        CompileIndicator::Idle => Style::default().bg(Color::Gray).fg(Color::Black),
        CompileIndicator::Running => Style::default().bg(Color::Yellow).fg(Color::Black),
        CompileIndicator::Succeeded => Style::default().bg(Color::Green).fg(Color::Black),
        CompileIndicator::Failed => Style::default().bg(Color::Red).fg(Color::White),
    };
    if button.blinking {
        style.add_modifier(Modifier::SLOW_BLINK | Modifier::BOLD)
    } else {
        style
    }
}

/// Border color of a message, from its classes.
pub fn annotation(class: &str) -> Style {
    let has = |name: &str| class.split_whitespace().any(|c| c == name);
    let color = if has(SUCCESS_CLASS) {
        Color::Green
    } else if has(DANGER_CLASS) {
        Color::Red
    } else {
        Color::Blue
    };
    Style::default().fg(color)
}

pub fn status_bar() -> Style {
    Style::default().bg(Color::DarkGray).fg(Color::White)
}

pub fn toast(level: ToastLevel) -> (&'static str, Style) {
    match level {
        ToastLevel::Info => ("[info]", Style::default().bg(Color::DarkGray).fg(Color::White)),
        ToastLevel::Warning => ("[warn]", Style::default().bg(Color::Yellow).fg(Color::Black)),
        ToastLevel::Error => ("[error]", Style::default().bg(Color::Red).fg(Color::White)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_color_follows_compile_outcome() {
        assert_eq!(annotation("wide tooltip-success").fg, Some(Color::Green));
        assert_eq!(annotation(DANGER_CLASS).fg, Some(Color::Red));
        assert_eq!(annotation("tooltip-successful").fg, Some(Color::Blue));
    }

    #[test]
    fn test_blinking_button_is_bold() {
        let button = CompileButton {
            indicator: CompileIndicator::Idle,
            blinking: true,
        };
        assert!(compile_button(button).add_modifier.contains(Modifier::BOLD));
    }
}
