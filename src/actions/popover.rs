use serde::{Deserialize, Deserializer, de};
use serde_json::Value;

use super::{millis, ms};
use crate::editor::{Coords, Editor, LINE_HEIGHT};
use crate::error::Result;
use crate::locate::PosSpec;
use crate::player::{CapturedState, Next, Player, WaiterOrigin};
use crate::registry::{ActionRegistry, ActionSpec, parse_options};
use crate::stage::{AnnotationAnchor, AnnotationId, Placement, TOOLTIP};

/// Locale a message is written in unless it says otherwise.
const DEFAULT_MESSAGE_LOCALE: &str = "en";

/// How long a message stays before playback continues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) enum Wait {
    /// Until the message is clicked.
    #[default]
    Click,
    Millis(u64),
}

impl<'de> Deserialize<'de> for Wait {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.as_str() == Some("click") {
            return Ok(Self::Click);
        }
        millis(value).map(Self::Millis).map_err(de::Error::custom)
    }
}

/// When a message disappears.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(super) enum Hide {
    /// Together with the wait that releases playback.
    #[default]
    Same,
    /// When clicked, independently of the wait.
    Click,
    /// Stays until the step is interrupted by something else.
    #[serde(rename = "none")]
    Never,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Attachment {
    #[default]
    Code,
    Selection,
    Element,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PopoverOptions {
    #[serde(default)]
    text: String,
    #[serde(default)]
    wait: Wait,
    #[serde(default)]
    hide: Hide,
    #[serde(default)]
    attachment: Attachment,
    #[serde(default)]
    pos: PosSpec,
    #[serde(default)]
    selector: String,
    #[serde(default)]
    placement: Placement,
    #[serde(default)]
    class: String,
    #[serde(default)]
    hide_others: bool,
    #[serde(default)]
    locale: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HideOptions {
    #[serde(default = "default_hide_wait", deserialize_with = "millis")]
    wait: u64,
}

const fn default_hide_wait() -> u64 {
    100
}

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register(
        "popover",
        ActionSpec::new(popover)
            .reversible()
            .with_initializer(|player| player.stage_mut().hide_all_annotations())
            .with_capture(capture_annotations)
            .with_restore(restore_annotations),
    );
    registry.register("hidePopovers", ActionSpec::new(hide_popovers));
}

/// Whether a step written for `locale` plays under the player's locale.
pub(super) fn plays_in_locale(player: &Player, locale: Option<&str>) -> bool {
    player
        .locale()
        .is_none_or(|own| own == locale.unwrap_or(DEFAULT_MESSAGE_LOCALE))
}

/// Show a message and continue after its wait.
pub(super) fn popover(player: &mut Player, options: &Value, next: Next) -> Result<()> {
    let mut options: PopoverOptions = parse_options("popover", options)?;
    if !plays_in_locale(player, options.locale.as_deref()) {
        player.proceed(next);
        return Ok(());
    }

    let anchor = anchor_for(player.editor(), &options)?;
    if player.is_fast_forward() {
        options.wait = Wait::Millis(0);
        options.hide = Hide::Same;
    }
    let id = player.stage_mut().show_annotation(
        options.text,
        anchor,
        options.placement,
        options.class.trim(),
    );

    let (hide, others) = (options.hide, options.hide_others);
    if hide != Hide::Never {
        player.add_cleanup(move |player| dismiss(player, id, others));
    }

    match options.wait {
        Wait::Millis(wait) => {
            player.schedule(ms(wait), move |player| {
                if hide == Hide::Same {
                    dismiss(player, id, others);
                }
                next.run(player)
            });
            if hide == Hide::Click {
                player.wait_for_click(TOOLTIP, WaiterOrigin::Popover, move |player| {
                    dismiss(player, id, others);
                    Ok(())
                });
            }
        }
        Wait::Click => {
            player.wait_for_click(TOOLTIP, WaiterOrigin::Popover, move |player| {
                if matches!(hide, Hide::Click | Hide::Same) {
                    dismiss(player, id, others);
                }
                next.run(player)
            });
        }
    }
    Ok(())
}

fn dismiss(player: &mut Player, id: AnnotationId, others: bool) {
    let stage = player.stage_mut();
    stage.hide_annotation(id);
    if others {
        stage.hide_all_annotations();
    }
}

fn anchor_for(editor: &dyn Editor, options: &PopoverOptions) -> Result<AnnotationAnchor> {
    let selection = editor
        .selections()
        .first()
        .copied()
        .filter(|range| !range.is_empty());
    let coords = match (options.attachment, selection) {
        (Attachment::Element, _) => return Ok(AnnotationAnchor::Element(options.selector.clone())),
        (Attachment::Selection, Some(range)) => {
            let (from, to) = (editor.coords_of(range.from()), editor.coords_of(range.to()));
            match options.placement {
                Placement::Top => Coords {
                    x: (from.x + to.x) / 2.0,
                    y: from.y,
                },
                Placement::Bottom => Coords {
                    x: from.x,
                    y: to.y + LINE_HEIGHT,
                },
                Placement::Left => Coords {
                    x: from.x,
                    y: from.y + LINE_HEIGHT / 2.0,
                },
                Placement::Right => Coords {
                    x: to.x,
                    y: from.y + LINE_HEIGHT / 2.0,
                },
            }
        }
        _ => {
            let mut at = options.pos.to_coords(editor)?;
            match options.placement {
                Placement::Bottom => at.y += LINE_HEIGHT,
                Placement::Left | Placement::Right => at.y += LINE_HEIGHT / 2.0,
                Placement::Top => {}
            }
            at
        }
    };
    Ok(AnnotationAnchor::Code(coords))
}

pub(super) fn capture_annotations(player: &Player, state: &mut CapturedState) {
    state.annotations = Some(player.stage().annotations().to_vec());
}

pub(super) fn restore_annotations(player: &mut Player, state: &CapturedState) {
    let stage = player.stage_mut();
    stage.hide_all_annotations();
    if let Some(annotations) = &state.annotations {
        stage.restore_annotations(annotations.clone());
    }
}

fn hide_popovers(player: &mut Player, options: &Value, next: Next) -> Result<()> {
    let options: HideOptions = parse_options("hidePopovers", options)?;
    player.stage_mut().hide_all_annotations();
    player.schedule_next(ms(options.wait), next);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{EditorBuffer, Pos, Range};
    use serde_json::json;

    fn options(value: Value) -> PopoverOptions {
        parse_options("popover", &value).unwrap()
    }

    #[test]
    fn test_defaults() {
        let parsed = options(json!({"text": "Hi"}));
        assert_eq!(parsed.wait, Wait::Click);
        assert_eq!(parsed.hide, Hide::Same);
        assert_eq!(parsed.attachment, Attachment::Code);
        assert_eq!(parsed.placement, Placement::Top);
        assert!(parsed.locale.is_none());
    }

    #[test]
    fn test_wait_and_hide_forms() {
        let parsed = options(json!({"wait": "1500", "hide": "none"}));
        assert_eq!(parsed.wait, Wait::Millis(1500));
        assert_eq!(parsed.hide, Hide::Never);
        assert_eq!(options(json!({"wait": 0})).wait, Wait::Millis(0));
        assert!(parse_options::<PopoverOptions>("popover", &json!({"wait": "later"})).is_err());
    }

    #[test]
    fn test_code_anchor_shifts_with_placement() {
        let mut buf = EditorBuffer::from_text("ab\ncd");
        buf.set_cursor(Pos::new(1, 1));
        let AnnotationAnchor::Code(top) = anchor_for(&buf, &options(json!({}))).unwrap() else {
            panic!("expected code anchor");
        };
        let AnnotationAnchor::Code(bottom) =
            anchor_for(&buf, &options(json!({"placement": "bottom"}))).unwrap()
        else {
            panic!("expected code anchor");
        };
        assert!((bottom.y - top.y - LINE_HEIGHT).abs() < f64::EPSILON);
    }

    #[test]
    fn test_element_and_selection_anchors() {
        let mut buf = EditorBuffer::from_text("abcd");
        let element = anchor_for(&buf, &options(json!({"attachment": "element", "selector": ".x"}))).unwrap();
        assert_eq!(element, AnnotationAnchor::Element(".x".into()));

        buf.set_selections(&[Range::new(Pos::new(0, 0), Pos::new(0, 4))]);
        let AnnotationAnchor::Code(mid) =
            anchor_for(&buf, &options(json!({"attachment": "selection"}))).unwrap()
        else {
            panic!("expected code anchor");
        };
        assert!((mid.x - 14.0).abs() < f64::EPSILON);
    }
}
