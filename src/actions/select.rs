use serde::Deserialize;
use serde_json::Value;

use super::{Address, millis, ms, resolve_pos};
use crate::editor::{Editor, Range};
use crate::error::Result;
use crate::locate::{self, Place, PosSpec};
use crate::player::{Next, Player};
use crate::registry::{ActionRegistry, ActionSpec, parse_options};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectOptions {
    #[serde(default)]
    from: Option<PosSpec>,
    #[serde(default)]
    to: Option<PosSpec>,
    #[serde(flatten)]
    address: Address,
    /// One-based occurrence of `text` to select.
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    add: bool,
    #[serde(default, deserialize_with = "millis")]
    after_delay: u64,
}

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register("select", ActionSpec::new(select));
}

fn select(player: &mut Player, options: &Value, next: Next) -> Result<()> {
    let mut options: SelectOptions = parse_options("select", options)?;
    if !options.address.location.is_empty() && options.address.place.is_none() {
        options.address.place = Some(Place::Whole);
    }

    let ranges = if options.address.is_given() {
        let address = &options.address;
        let editor = player.editor();
        let region = locate::locate(editor, &address.location, &address.parent, address.place)?;
        if address.text.is_empty() {
            vec![region]
        } else {
            locate::find_text_ranges(
                editor,
                region,
                &address.text,
                options.index,
                &address.location,
            )?
        }
    } else if let (Some(from), Some(to)) = (&options.from, &options.to) {
        let editor = player.editor();
        vec![Range::new(resolve_pos(editor, from)?, resolve_pos(editor, to)?)]
    } else {
        Vec::new()
    };

    apply(player.editor_mut(), &ranges, options.add);
    player.schedule_next(ms(options.after_delay), next);
    Ok(())
}

fn apply(editor: &mut dyn Editor, ranges: &[Range], add: bool) {
    if add {
        for range in ranges {
            editor.add_selection(*range);
        }
    } else {
        editor.set_selections(ranges);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{EditorBuffer, Pos};

    #[test]
    fn test_apply_adds_or_replaces() {
        let mut buf = EditorBuffer::from_text("one two three");
        let first = Range::new(Pos::new(0, 0), Pos::new(0, 3));
        let second = Range::new(Pos::new(0, 4), Pos::new(0, 7));
        apply(&mut buf, &[first], false);
        apply(&mut buf, &[second], true);
        assert_eq!(buf.selections(), vec![first, second]);

        apply(&mut buf, &[second], false);
        assert_eq!(buf.selections(), vec![second]);
    }

    #[test]
    fn test_empty_selection_set_is_ignored() {
        let mut buf = EditorBuffer::from_text("abc");
        buf.set_cursor(Pos::new(0, 2));
        apply(&mut buf, &[], false);
        assert_eq!(buf.cursor(), Pos::new(0, 2));
    }
}
