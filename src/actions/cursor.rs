use serde::Deserialize;
use serde_json::Value;

use super::{Address, millis, ms, resolve_pos};
use crate::editor::{Pos, Range};
use crate::error::{PlayerError, Result};
use crate::locate::{self, PosSpec};
use crate::player::{Next, Player};
use crate::registry::{ActionRegistry, ActionSpec, parse_options};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveOptions {
    #[serde(default)]
    pos: PosSpec,
    #[serde(flatten)]
    address: Address,
    #[serde(default = "default_move_delay", deserialize_with = "millis")]
    delay: u64,
    #[serde(default)]
    immediate: bool,
}

const fn default_move_delay() -> u64 {
    80
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JumpOptions {
    #[serde(default)]
    pos: Option<PosSpec>,
    #[serde(default = "default_after_delay", deserialize_with = "millis")]
    after_delay: u64,
}

const fn default_after_delay() -> u64 {
    200
}

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register("moveTo", ActionSpec::new(move_to));
    registry.register("jumpTo", ActionSpec::new(jump_to));
}

/// Walk the caret to a target one line and one column per tick.
fn move_to(player: &mut Player, options: &Value, next: Next) -> Result<()> {
    let options: MoveOptions = parse_options("moveTo", options)?;
    let target = if options.address.is_given() {
        let address = &options.address;
        let editor = player.editor();
        let region = locate::locate(editor, &address.location, &address.parent, address.place)?;
        if address.text.is_empty() {
            region.anchor
        } else {
            locate::find_text(editor, region, &address.text, &address.location)?
        }
    } else {
        resolve_pos(player.editor(), &options.pos)?
    };

    let current = player.editor().cursor();
    player.editor_mut().set_selections(&[Range::caret(current)]);

    if options.immediate || options.delay == 0 {
        player.editor_mut().set_cursor(target);
        player.proceed(next);
        return Ok(());
    }

    player.add_cleanup(move |player| player.editor_mut().set_cursor(target));
    let steps = signed_delta(target.ch, current.ch).max(signed_delta(target.line, current.line));
    let delay = options.delay;
    player.schedule(ms(delay), move |player| walk(player, target, steps, delay, next));
    Ok(())
}

fn walk(player: &mut Player, target: Pos, steps: i64, delay: u64, next: Next) -> Result<()> {
    let mut at = player.editor().cursor();
    if steps <= 0 || at == target {
        player.editor_mut().set_cursor(target);
        return next.run(player);
    }
    at.line = step_toward(at.line, target.line);
    at.ch = step_toward(at.ch, target.ch);
    player.editor_mut().set_cursor(at);
    player.schedule(ms(delay), move |player| walk(player, target, steps - 1, delay, next));
    Ok(())
}

const fn step_toward(from: usize, to: usize) -> usize {
    if from < to {
        from + 1
    } else if from > to {
        from - 1
    } else {
        from
    }
}

#[allow(clippy::cast_possible_wrap)]
const fn signed_delta(to: usize, from: usize) -> i64 {
    to as i64 - from as i64
}

fn jump_to(player: &mut Player, options: &Value, next: Next) -> Result<()> {
    let options: JumpOptions = parse_options("jumpTo", options)?;
    let spec = options.pos.ok_or(PlayerError::MissingParameter {
        action: "jumpTo",
        parameter: "position",
    })?;
    let pos = resolve_pos(player.editor(), &spec)?;
    player.editor_mut().set_cursor(pos);
    player.schedule_next(ms(options.after_delay), next);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_toward_moves_one_unit() {
        assert_eq!(step_toward(2, 5), 3);
        assert_eq!(step_toward(5, 2), 4);
        assert_eq!(step_toward(4, 4), 4);
    }

    #[test]
    fn test_steps_follow_the_larger_signed_delta() {
        let steps = signed_delta(1, 5).max(signed_delta(3, 0));
        assert_eq!(steps, 3);
        assert!(signed_delta(0, 4).max(signed_delta(0, 2)) < 0);
    }

    #[test]
    fn test_options_defaults() {
        let options: MoveOptions = parse_options("moveTo", &Value::Null).unwrap();
        assert_eq!(options.delay, 80);
        assert_eq!(options.pos, PosSpec::Caret);
        assert!(!options.address.is_given());
    }
}
