use serde::Deserialize;
use tracing::debug;

use super::{millis, ms, resolve_pos};
use crate::editor::Editor;
use crate::error::{PlayerError, Result};
use crate::locate::PosSpec;
use crate::player::{Next, Player};
use crate::registry::{ActionRegistry, ActionSpec, parse_options};

/// Typed as Backspace.
pub const BACKSPACE: char = '←';
/// Typed as Delete.
pub const DELETE: char = '→';

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeOptions {
    text: Option<String>,
    #[serde(default, deserialize_with = "millis")]
    before_delay: u64,
    #[serde(default = "default_delay", deserialize_with = "millis")]
    delay: u64,
    #[serde(default)]
    pos: Option<PosSpec>,
}

const fn default_delay() -> u64 {
    60
}

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register("type", ActionSpec::new(type_text).reversible());
}

fn type_text(player: &mut Player, options: &serde_json::Value, next: Next) -> Result<()> {
    let options: TypeOptions = parse_options("type", options)?;
    let text = options.text.ok_or(PlayerError::MissingParameter {
        action: "type",
        parameter: "text",
    })?;

    if let Some(spec) = options.pos.filter(|spec| *spec != PosSpec::Caret) {
        let pos = resolve_pos(player.editor(), &spec)?;
        player.editor_mut().set_cursor(pos);
    }

    let editor = player.editor();
    let before = (editor.text(), editor.cursor(), editor.selections());
    let finish = text.clone();
    player.add_cleanup(move |player| {
        let (value, cursor, selections) = before;
        let editor = player.editor_mut();
        editor.set_text(&value);
        editor.set_cursor(cursor);
        editor.set_selections(&selections);
        print_all(editor, &finish);
    });

    let instant = player.is_fast_forward() || options.delay == 0;
    let delay = options.delay;
    let start = move |player: &mut Player| {
        if instant {
            print_all(player.editor_mut(), &text);
            player.proceed(next);
        } else {
            let chars: Vec<char> = text.chars().collect();
            player.schedule(ms(delay), move |player| print_from(player, chars, 0, delay, next));
        }
        Ok(())
    };

    if player.is_fast_forward() || options.before_delay == 0 {
        start(player)
    } else {
        player.schedule(ms(options.before_delay), start);
        Ok(())
    }
}

/// Type `chars[at]`, then schedule the rest one keystroke per `delay`.
fn print_from(player: &mut Player, chars: Vec<char>, at: usize, delay: u64, next: Next) -> Result<()> {
    if let Some(&ch) = chars.get(at) {
        keystroke(player.editor_mut(), ch);
    }
    if at + 1 < chars.len() {
        player.schedule(ms(delay), move |player| print_from(player, chars, at + 1, delay, next));
        Ok(())
    } else {
        next.run(player)
    }
}

fn keystroke(editor: &mut dyn Editor, ch: char) {
    let command = match ch {
        BACKSPACE => "delCharBefore",
        DELETE => "delCharAfter",
        _ => {
            let mut buf = [0; 4];
            editor.replace_selection(ch.encode_utf8(&mut buf));
            return;
        }
    };
    if let Err(err) = editor.run_command(command) {
        debug!(%err, command, "keystroke ignored");
    }
}

/// Type `text` at once, inserting runs of plain characters as one word.
pub(super) fn print_all(editor: &mut dyn Editor, text: &str) {
    let mut word = String::new();
    for ch in text.chars() {
        if ch == BACKSPACE || ch == DELETE {
            if !word.is_empty() {
                editor.replace_selection(&word);
                word.clear();
            }
            keystroke(editor, ch);
        } else {
            word.push(ch);
        }
    }
    if !word.is_empty() {
        editor.replace_selection(&word);
    }
}
