use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use proptest::prelude::*;
use serde_json::{Value, json};

use codeplay::events::PlayerEvent;
use codeplay::prelude::*;

const SHOP: &str = "public class Shop {\n    public int total(int a, int b) {\n        return a + b;\n    }\n\n    void reset() {\n        count = 0;\n    }\n}\n";

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn player_from(scenario: &Value, config: PlayerConfig) -> Player {
    let scenario = Scenario::parse(&scenario.to_string()).unwrap();
    Player::new(Box::new(EditorBuffer::empty()), scenario, config)
}

fn typing(texts: &[String], delay: u64) -> Vec<Value> {
    texts
        .iter()
        .map(|text| json!({"type": "type", "text": text, "delay": delay}))
        .collect()
}

#[test]
fn test_headless_lesson_edits_structure() {
    let scenario = json!({
        "code": SHOP,
        "steps": ["Rename", "Call"],
        "actions": [
            {"type": "setStep", "step": 1, "wait": 200},
            {"type": "popover", "text": "Let's rename this method"},
            {"type": "select", "location": "total", "place": "name"},
            {"type": "type", "text": "sum"},
            {"type": "setStep", "step": 2},
            {"type": "moveTo", "location": "reset", "place": "end"},
            {"type": "type", "text": "\n        sum(1, 2);", "delay": 20},
            {"type": "compile"},
            {"type": "setStep", "step": "all", "wait": 0},
        ],
    });
    let mut player = player_from(&scenario, PlayerConfig::default());
    player.play().unwrap();
    player.run_to_end().unwrap();

    assert_eq!(player.state(), PlayerState::Idle);
    assert_eq!(
        player.editor().text(),
        "public class Shop {\n    public int sum(int a, int b) {\n        return a + b;\n    }\n\n    void reset() {\n        count = 0;\n        sum(1, 2);\n    }\n}\n"
    );
    assert!(player.stage().roadmap.is_completed());
    assert!(player.stage().annotations().is_empty());
}

#[test]
fn test_select_by_text_then_type_replaces_selection() {
    let scenario = json!({
        "code": "hello world|",
        "actions": [
            {"type": "select", "text": "WORLD"},
            {"type": "type", "text": "rust", "delay": 0},
            {"type": "moveTo", "text": "hello", "immediate": true},
            {"type": "type", "text": "say ", "delay": 0},
        ],
    });
    let mut player = player_from(&scenario, PlayerConfig::default());
    player.play().unwrap();
    assert_eq!(player.editor().text(), "say hello rust");
    assert_eq!(player.state(), PlayerState::Idle);
}

#[test]
fn test_unresolvable_location_stops_playback() {
    let scenario = json!({
        "code": SHOP,
        "actions": [{"type": "moveTo", "location": "missing", "place": "body"}],
    });
    let mut player = player_from(&scenario, PlayerConfig::default());
    let err = player.play().unwrap_err();
    assert!(matches!(err, PlayerError::Locate(_)), "got {err:?}");
    assert_eq!(player.state(), PlayerState::Idle);
    assert_eq!(player.editor().text(), SHOP);
}

proptest! {
    #[test]
    fn reset_restores_construction_state(
        code in "[a-z ]{0,12}",
        texts in prop::collection::vec("[a-z]{1,4}", 1..5),
        elapsed in 0..2_000u64,
    ) {
        let scenario = json!({"code": code, "actions": typing(&texts, 40)});
        let mut player = player_from(&scenario, PlayerConfig::default());
        player.play().unwrap();
        player.tick(ms(elapsed)).unwrap();
        player.reset();

        prop_assert_eq!(player.editor().text(), code);
        prop_assert_eq!(player.index(), None);
        prop_assert_eq!(player.state(), PlayerState::Idle);
        prop_assert!(!player.has_pending_timers());
    }

    #[test]
    fn back_returns_to_earlier_snapshot(
        texts in prop::collection::vec("[a-z]{1,4}", 1..6),
        forward in 1..6usize,
    ) {
        let forward = forward.min(texts.len());
        let scenario = json!({"actions": typing(&texts, 10)});
        let mut player = player_from(&scenario, PlayerConfig::default());
        for _ in 0..forward {
            player.next().unwrap();
        }
        prop_assert_eq!(player.editor().text(), texts[..forward - 1].concat());

        player.back().unwrap();
        let kept = forward.saturating_sub(2);
        prop_assert_eq!(player.editor().text(), texts[..kept].concat());
        prop_assert_eq!(player.index(), forward.checked_sub(2));
    }

    #[test]
    fn steps_for_other_locales_are_transparent(
        texts in prop::collection::vec("[a-z]{1,4}", 1..5),
        foreign in prop::collection::vec(any::<bool>(), 1..5),
    ) {
        let mut actions = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            if foreign.get(i).copied().unwrap_or(false) {
                actions.push(json!({"type": "type", "text": "XX", "delay": 0, "locale": "ru"}));
            }
            actions.push(json!({"type": "type", "text": text, "delay": 0, "locale": "en"}));
        }
        let config = PlayerConfig {
            locale: Some("en".to_string()),
            ..PlayerConfig::default()
        };
        let mut player = player_from(&json!({"actions": actions}), config);
        player.play().unwrap();
        prop_assert_eq!(player.editor().text(), texts.concat());
        prop_assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn paused_wait_fires_once_after_remaining_delay(
        timeout in 1..1_000u64,
        before_pause in 0..1_000u64,
        paused_for in 0..5_000u64,
    ) {
        prop_assume!(before_pause < timeout);
        let scenario = json!({"actions": [{"type": "wait", "timeout": timeout}]});
        let mut player = player_from(&scenario, PlayerConfig::default());
        let stops = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&stops);
        player.on("stop", move |_| *counter.borrow_mut() += 1);

        player.play().unwrap();
        player.tick(ms(before_pause)).unwrap();
        player.pause();
        player.tick(ms(paused_for)).unwrap();
        player.play().unwrap();

        let remaining = timeout - before_pause;
        prop_assert_eq!(player.next_due(), Some(ms(remaining)));
        player.tick(ms(remaining)).unwrap();
        player.tick(ms(10_000)).unwrap();
        prop_assert_eq!(player.state(), PlayerState::Idle);
        prop_assert_eq!(*stops.borrow(), 1);
    }

    #[test]
    fn nothing_fires_after_stop(
        texts in prop::collection::vec("[a-z]{1,6}", 1..4),
        elapsed in 0..1_000u64,
    ) {
        let scenario = json!({"actions": typing(&texts, 30)});
        let mut player = player_from(&scenario, PlayerConfig::default());
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        player.on("all", move |event| sink.borrow_mut().push(*event));

        player.play().unwrap();
        player.tick(ms(elapsed)).unwrap();
        player.stop();
        let text = player.editor().text();
        let seen = events.borrow().len();

        player.tick(ms(60_000)).unwrap();
        prop_assert_eq!(player.editor().text(), text);
        prop_assert!(!player.has_pending_timers());
        prop_assert_eq!(events.borrow().len(), seen);
        let events = events.borrow();
        prop_assert_eq!(events.last(), Some(&PlayerEvent::Stop));
    }
}
