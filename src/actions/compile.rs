//! Simulated compilation.
//!
//! Nothing is compiled: the compile button spins for a while, then reports
//! the scripted outcome in a message attached to the button.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::popover::{self, capture_annotations, plays_in_locale, restore_annotations};
use super::{millis, ms, wait};
use crate::error::Result;
use crate::player::{CapturedState, Next, Player};
use crate::registry::{ActionRegistry, ActionSpec, parse_options};
use crate::stage::{COMPILE_BUTTON, CompileIndicator, TOOLTIP};
use crate::texts::COMPILE_SUCCESS;

/// How long the button waits for a click before compiling on its own.
const READY_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Deserialize)]
struct CompileOptions {
    #[serde(default = "yes")]
    success: bool,
    #[serde(default = "default_wait", deserialize_with = "millis")]
    wait: u64,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    popover: Map<String, Value>,
    #[serde(default)]
    locale: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadyOptions {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    text2: Option<String>,
    #[serde(default = "yes")]
    success: bool,
    #[serde(default = "default_wait", deserialize_with = "millis")]
    wait: u64,
    #[serde(default)]
    wait_for_click: bool,
    #[serde(default)]
    locale: Option<String>,
}

const fn yes() -> bool {
    true
}

const fn default_wait() -> u64 {
    1000
}

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register(
        "compile",
        ActionSpec::new(compile)
            .reversible()
            .with_capture(capture_annotations)
            .with_restore(restore_compile),
    );
    registry.register(
        "readyAndCompile",
        ActionSpec::new(ready_and_compile)
            .reversible()
            .with_capture(capture_annotations)
            .with_restore(restore_compile),
    );
}

fn restore_compile(player: &mut Player, state: &CapturedState) {
    player.stage_mut().compile.blinking = false;
    player.stage_mut().compile.indicator = CompileIndicator::Idle;
    restore_annotations(player, state);
}

/// Options of the result message, or `None` when there is nothing to say.
fn result_message(player: &Player, options: &mut CompileOptions) -> Option<Map<String, Value>> {
    let mut message = std::mem::take(&mut options.popover);
    for (key, fallback) in [("wait", "click"), ("hide", "same")] {
        let unset = message.get(key).is_none_or(|value| {
            value.is_null() || value.as_str().is_some_and(str::is_empty)
        });
        if unset {
            message.insert(key.to_string(), json!(fallback));
        }
    }
    message.insert("attachment".to_string(), json!("element"));
    message.insert("selector".to_string(), json!(COMPILE_BUTTON));
    message.insert("placement".to_string(), json!("right"));
    if let Some(text) = options.text.take() {
        message.insert("text".to_string(), json!(text));
    }
    let text = match message.get("text").and_then(Value::as_str) {
        Some(text) => text.to_string(),
        None if options.success => player.texts().get(COMPILE_SUCCESS).to_string(),
        None => String::new(),
    };
    if text.is_empty() {
        return None;
    }
    message.insert("text".to_string(), json!(text));
    if let Some(locale) = options.locale.take() {
        message.insert("locale".to_string(), json!(locale));
    }

    let outcome = if options.success { "tooltip-success" } else { "tooltip-danger" };
    let class = message
        .get("class")
        .and_then(Value::as_str)
        .map_or_else(|| outcome.to_string(), |class| format!("{class} {outcome}"));
    message.insert("class".to_string(), json!(class));
    Some(message)
}

fn compile(player: &mut Player, options: &Value, next: Next) -> Result<()> {
    let mut options: CompileOptions = parse_options("compile", options)?;
    let message = result_message(player, &mut options);
    let success = options.success;

    player.add_cleanup(|player| player.stage_mut().compile.indicator = CompileIndicator::Idle);
    let stage = player.stage_mut();
    stage.hide_all_annotations();
    stage.compile.indicator = CompileIndicator::Running;

    player.schedule(ms(options.wait), move |player| {
        let Some(message) = message else {
            player.stage_mut().compile.indicator = CompileIndicator::Idle;
            return next.run(player);
        };
        player.stage_mut().compile.indicator = if success {
            CompileIndicator::Succeeded
        } else {
            CompileIndicator::Failed
        };
        let after = Next::then(move |player| {
            player.stage_mut().compile.indicator = CompileIndicator::Idle;
            next.run(player)
        });
        popover::popover(player, &Value::Object(message), after)
    });
    Ok(())
}

/// Make the compile button blink, wait for a click on it, then compile.
fn ready_and_compile(player: &mut Player, options: &Value, next: Next) -> Result<()> {
    let options: ReadyOptions = parse_options("readyAndCompile", options)?;
    let locale = options
        .locale
        .clone()
        .unwrap_or_else(|| "en".to_string());
    if !plays_in_locale(player, Some(locale.as_str())) {
        player.proceed(next);
        return Ok(());
    }

    let compile_options = json!({
        "success": options.success,
        "wait": options.wait,
        "text": options.text2,
        "locale": locale,
    });
    let timeout = if options.wait_for_click { 0 } else { READY_TIMEOUT_MS };
    let arm = move |player: &mut Player| {
        player.add_cleanup(|player| player.stage_mut().compile.blinking = false);
        player.stage_mut().compile.blinking = true;
        let click = json!({
            "selector": format!("{COMPILE_BUTTON}, {TOOLTIP}"),
            "timeout": timeout,
        });
        let then = Next::then(move |player| {
            player.stage_mut().compile.blinking = false;
            compile(player, &compile_options, next)
        });
        wait::wait_for_click_on(player, &click, then)
    };

    match options.text.filter(|text| !text.is_empty()) {
        Some(text) => {
            player.add_cleanup(|player| player.stage_mut().hide_all_annotations());
            let intro = json!({
                "attachment": "element",
                "selector": COMPILE_BUTTON,
                "placement": "right",
                "wait": 100,
                "hide": "none",
                "text": text,
                "locale": locale,
            });
            popover::popover(player, &intro, Next::then(arm))
        }
        None => arm(player),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorBuffer;
    use crate::player::PlayerConfig;
    use crate::scenario::Scenario;

    fn player() -> Player {
        Player::new(
            Box::new(EditorBuffer::empty()),
            Scenario::default(),
            PlayerConfig::default(),
        )
    }

    fn options(value: Value) -> CompileOptions {
        parse_options("compile", &value).unwrap()
    }

    #[test]
    fn test_success_without_text_uses_text_table() {
        let player = player();
        let message = result_message(&player, &mut options(json!({}))).unwrap();
        assert_eq!(message["text"], "Everything is fine, we can continue!");
        assert_eq!(message["wait"], "click");
        assert_eq!(message["class"], "tooltip-success");
        assert_eq!(message["selector"], COMPILE_BUTTON);
    }

    #[test]
    fn test_failure_without_text_says_nothing() {
        let player = player();
        assert!(result_message(&player, &mut options(json!({"success": false}))).is_none());
    }

    #[test]
    fn test_explicit_text_and_class() {
        let player = player();
        let mut parsed = options(json!({
            "success": false,
            "text": "Boom",
            "popover": {"class": "wide", "wait": 500},
        }));
        let message = result_message(&player, &mut parsed).unwrap();
        assert_eq!(message["text"], "Boom");
        assert_eq!(message["wait"], 500);
        assert_eq!(message["class"], "wide tooltip-danger");
    }

    #[test]
    fn test_empty_text_suppresses_success_message() {
        let player = player();
        assert!(result_message(&player, &mut options(json!({"text": ""}))).is_none());
    }
}
