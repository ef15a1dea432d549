use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{millis, ms};
use crate::editor::Editor;
use crate::error::{PlayerError, Result};
use crate::player::{Next, Player};
use crate::registry::{ActionRegistry, ActionSpec, parse_options};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunOptions {
    #[serde(default)]
    command: Option<String>,
    #[serde(default, deserialize_with = "millis")]
    before_delay: u64,
    #[serde(default = "one")]
    times: u32,
}

#[derive(Debug, Deserialize)]
struct IndentOptions {
    #[serde(default = "default_indent_delay", deserialize_with = "millis")]
    delay: u64,
    #[serde(default = "one")]
    times: u32,
}

const fn one() -> u32 {
    1
}

const fn default_indent_delay() -> u64 {
    500
}

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register("run", ActionSpec::new(run));
    registry.register("indent", ActionSpec::new(|player, options, next| {
        indent(player, options, next, "indent", "indentMore")
    }));
    registry.register("deindent", ActionSpec::new(|player, options, next| {
        indent(player, options, next, "deindent", "indentLess")
    }));
}

/// Run an editor command, logging instead of failing.
fn exec(editor: &mut dyn Editor, command: &str) {
    if let Err(err) = editor.run_command(command) {
        debug!(%err, command, "editor command failed");
    }
}

/// Run `command` every `delay`, `remaining` more times, then continue.
fn repeat(player: &mut Player, command: String, remaining: u32, delay: u64, next: Next) -> Result<()> {
    exec(player.editor_mut(), &command);
    if remaining > 1 {
        player.schedule(ms(delay), move |player| repeat(player, command, remaining - 1, delay, next));
        Ok(())
    } else {
        next.run(player)
    }
}

fn run(player: &mut Player, options: &Value, next: Next) -> Result<()> {
    let options: RunOptions = parse_options("run", options)?;
    let command = options.command.ok_or(PlayerError::MissingParameter {
        action: "run",
        parameter: "command",
    })?;
    let (times, delay) = (options.times, options.before_delay);
    player.schedule(ms(delay), move |player| repeat(player, command, times, delay, next));
    Ok(())
}

fn indent(
    player: &mut Player,
    options: &Value,
    next: Next,
    action: &str,
    command: &'static str,
) -> Result<()> {
    let options: IndentOptions = parse_options(action, options)?;
    let times = options.times;

    let editor = player.editor();
    let (text, cursor, selections) = (editor.text(), editor.cursor(), editor.selections());
    player.add_cleanup(move |player| {
        let editor = player.editor_mut();
        editor.set_text(&text);
        editor.set_cursor(cursor);
        editor.set_selections(&selections);
        for _ in 0..times {
            exec(editor, command);
        }
    });

    if player.is_fast_forward() || options.delay == 0 {
        for _ in 0..times {
            exec(player.editor_mut(), command);
        }
        player.proceed(next);
        return Ok(());
    }

    let delay = options.delay;
    player.schedule(ms(delay), move |player| {
        repeat(player, command.to_string(), times, delay, next)
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{EditorBuffer, Pos};

    #[test]
    fn test_exec_swallows_failures() {
        let mut buf = EditorBuffer::from_text("x");
        exec(&mut buf, "explode");
        exec(&mut buf, "indentLess");
        assert_eq!(buf.text(), "x");
        exec(&mut buf, "goLineEnd");
        assert_eq!(buf.cursor(), Pos::new(0, 1));
    }

    #[test]
    fn test_run_requires_command() {
        let options: RunOptions = parse_options("run", &serde_json::json!({"times": 3})).unwrap();
        assert!(options.command.is_none());
        assert_eq!(options.times, 3);
    }
}
