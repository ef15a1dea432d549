//! The built-in action vocabulary.
//!
//! Every action parses its options into its own struct (camelCase keys,
//! explicit defaults), does its work through the player and hands control
//! back exactly once through the `Next` it was given.

mod classes;
mod command;
mod compile;
mod cursor;
mod popover;
mod roadmap;
mod select;
mod type_text;
mod wait;

use std::time::Duration;

use serde::{Deserialize, Deserializer, de};

use crate::editor::{Editor, Pos};
use crate::error::Result;
use crate::locate::{self, Place, PosSpec};
use crate::registry::ActionRegistry;

pub(crate) fn register_builtins(registry: &mut ActionRegistry) {
    type_text::register(registry);
    cursor::register(registry);
    select::register(registry);
    roadmap::register(registry);
    wait::register(registry);
    command::register(registry);
    classes::register(registry);
    popover::register(registry);
    compile::register(registry);
}

pub(crate) const fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMillis {
    Number(f64),
    Text(String),
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_millis(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

/// Milliseconds given as a number or a numeric string.
pub(crate) fn millis<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawMillis::deserialize(deserializer)? {
        RawMillis::Number(value) => Ok(clamp_millis(value)),
        RawMillis::Text(text) => text
            .trim()
            .parse::<f64>()
            .map(clamp_millis)
            .map_err(|_| de::Error::custom(format!("expected milliseconds, got \"{text}\""))),
    }
}

/// A structural address shared by `moveTo` and `select`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Address {
    pub location: String,
    pub parent: String,
    #[serde(deserialize_with = "locate::optional_place")]
    pub place: Option<Place>,
    pub text: String,
}

impl Address {
    /// Whether the step addresses code structurally or by text.
    pub fn is_given(&self) -> bool {
        !self.location.is_empty() || self.place.is_some() || !self.text.is_empty()
    }
}

pub(crate) fn resolve_pos(editor: &dyn Editor, spec: &PosSpec) -> Result<Pos> {
    Ok(spec.to_pos(editor)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Timed {
        #[serde(deserialize_with = "millis")]
        timeout: u64,
    }

    fn timeout(value: serde_json::Value) -> u64 {
        serde_json::from_value::<Timed>(json!({ "timeout": value }))
            .unwrap()
            .timeout
    }

    #[test]
    fn test_millis_accepts_numbers_and_strings() {
        assert_eq!(timeout(json!(250)), 250);
        assert_eq!(timeout(json!("1500")), 1500);
        assert_eq!(timeout(json!(" 20 ")), 20);
        assert_eq!(timeout(json!(-5)), 0);
        assert_eq!(timeout(json!(12.6)), 13);
    }

    #[test]
    fn test_millis_rejects_words() {
        assert!(serde_json::from_value::<Timed>(json!({"timeout": "soon"})).is_err());
    }

    #[test]
    fn test_address_empty_place_is_absent() {
        let address: Address = serde_json::from_value(json!({"location": "Shop", "place": ""})).unwrap();
        assert!(address.place.is_none());
        assert!(address.is_given());
        assert!(!Address::default().is_given());
    }
}
