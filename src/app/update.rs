use std::time::Duration;

use tracing::warn;

use crate::app::{Model, ToastLevel};
use crate::error::Result;
use crate::stage::{COMPILE_BUTTON, TOOLTIP};

/// All possible events and actions in the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // Playback
    /// Play, pause or resume
    Toggle,
    /// Skip to the following step
    Next,
    /// Rewind to the previous reversible step
    Back,
    /// Stop playback, keeping the document
    Stop,
    /// Back to the initial document
    Reset,
    /// Toggle instant playback
    FastForward,

    // Clicks
    /// Click the visible message
    ClickAnnotation,
    /// Click the compile button
    ClickCompile,

    // System
    /// Real time passed
    Tick(Duration),
    /// Scenario file changed externally, reload
    FileChanged,
    /// Terminal resized
    Resize(u16, u16),
    /// Toggle help overlay
    ToggleHelp,
    /// Hide help overlay
    HideHelp,
    /// Quit the application
    Quit,
}

/// Apply `msg` to the model.
pub fn update(mut model: Model, msg: Message) -> Model {
    let outcome = match msg {
        Message::Toggle => model.player.toggle(),
        Message::Next => model.player.next(),
        Message::Back => model.player.back(),
        Message::Stop => {
            model.player.stop();
            Ok(())
        }
        Message::Reset => {
            model.player.reset();
            model.scroll_offset = 0;
            Ok(())
        }
        Message::FastForward => {
            let enabled = !model.player.is_fast_forward();
            model.player.set_fast_forward(enabled);
            let label = if enabled { "Fast-forward on" } else { "Fast-forward off" };
            model.show_toast(ToastLevel::Info, label);
            Ok(())
        }
        Message::ClickAnnotation => click(&mut model, TOOLTIP),
        Message::ClickCompile => click(&mut model, COMPILE_BUTTON),
        Message::Tick(elapsed) => model.player.tick(elapsed),
        // Reloading touches the disk; see the side effects.
        Message::FileChanged => Ok(()),
        Message::Resize(width, height) => {
            model.terminal_size = (width, height);
            Ok(())
        }
        Message::ToggleHelp => {
            model.help_visible = !model.help_visible;
            Ok(())
        }
        Message::HideHelp => {
            model.help_visible = false;
            Ok(())
        }
        Message::Quit => {
            model.should_quit = true;
            Ok(())
        }
    };
    if let Err(err) = outcome {
        warn!(%err, "playback stopped");
        model.show_toast(ToastLevel::Error, format!("Playback stopped: {err}"));
    }
    model
}

fn click(model: &mut Model, target: &str) -> Result<()> {
    if !model.player.click(target)? {
        model.show_toast(ToastLevel::Info, "Nothing is waiting for that click");
    }
    Ok(())
}
