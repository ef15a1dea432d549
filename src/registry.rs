//! Action name to handler table.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::actions;
use crate::error::{PlayerError, Result};
use crate::player::{CapturedState, Next, Player};

/// Runs one step. Must hand control back exactly once through `next`,
/// either directly via [`Player::proceed`] or from a scheduled timer.
pub type Handler = Box<dyn Fn(&mut Player, &Value, Next) -> Result<()>>;

/// A registered action and its metadata.
pub struct ActionSpec {
    handler: Handler,
    reversible: bool,
    initializer: Option<fn(&mut Player)>,
    capture_state: Option<fn(&Player, &mut CapturedState)>,
    restore_state: Option<fn(&mut Player, &CapturedState)>,
}

impl ActionSpec {
    pub fn new(handler: impl Fn(&mut Player, &Value, Next) -> Result<()> + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            reversible: false,
            initializer: None,
            capture_state: None,
            restore_state: None,
        }
    }

    /// Mark the action as a point `back()` can rewind to.
    #[must_use]
    pub const fn reversible(mut self) -> Self {
        self.reversible = true;
        self
    }

    /// Run once when a player is constructed.
    #[must_use]
    pub const fn with_initializer(mut self, init: fn(&mut Player)) -> Self {
        self.initializer = Some(init);
        self
    }

    /// Extend the captured state of a reversible step.
    #[must_use]
    pub const fn with_capture(mut self, capture: fn(&Player, &mut CapturedState)) -> Self {
        self.capture_state = Some(capture);
        self
    }

    /// Extend the restore of a reversible step.
    #[must_use]
    pub const fn with_restore(mut self, restore: fn(&mut Player, &CapturedState)) -> Self {
        self.restore_state = Some(restore);
        self
    }

    pub const fn is_reversible(&self) -> bool {
        self.reversible
    }

    pub(crate) fn invoke(&self, player: &mut Player, options: &Value, next: Next) -> Result<()> {
        (self.handler)(player, options, next)
    }

    pub(crate) const fn initializer(&self) -> Option<fn(&mut Player)> {
        self.initializer
    }

    pub(crate) const fn capture_hook(&self) -> Option<fn(&Player, &mut CapturedState)> {
        self.capture_state
    }

    pub(crate) const fn restore_hook(&self) -> Option<fn(&mut Player, &CapturedState)> {
        self.restore_state
    }
}

impl fmt::Debug for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSpec")
            .field("reversible", &self.reversible)
            .field("initializer", &self.initializer.is_some())
            .field("capture_state", &self.capture_state.is_some())
            .field("restore_state", &self.restore_state.is_some())
            .finish_non_exhaustive()
    }
}

/// The vocabulary a player understands.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, ActionSpec>,
}

impl ActionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in vocabulary.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        actions::register_builtins(&mut registry);
        registry
    }

    /// Add or replace an action.
    pub fn register(&mut self, name: impl Into<String>, spec: ActionSpec) {
        self.actions.insert(name.into(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&ActionSpec> {
        self.actions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn specs(&self) -> impl Iterator<Item = &ActionSpec> {
        self.actions.values()
    }
}

/// Parse step options into an action's option struct.
///
/// Missing options behave like an empty object so per-field defaults apply.
pub fn parse_options<T: DeserializeOwned>(action: &str, options: &Value) -> Result<T> {
    let value = if options.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        options.clone()
    };
    serde_json::from_value(value).map_err(|source| PlayerError::InvalidOptions {
        action: action.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        #[serde(default = "default_delay")]
        before_delay: u64,
        text: String,
    }

    const fn default_delay() -> u64 {
        60
    }

    #[test]
    fn test_builtins_cover_vocabulary() {
        let registry = ActionRegistry::with_builtins();
        for name in [
            "type",
            "moveTo",
            "jumpTo",
            "select",
            "setStep",
            "wait",
            "waitForClickOn",
            "run",
            "indent",
            "deindent",
            "addClass",
            "removeClass",
            "popover",
            "hidePopovers",
            "compile",
            "readyAndCompile",
        ] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert!(registry.get("type").is_some_and(ActionSpec::is_reversible));
        assert!(registry.get("setStep").is_some_and(ActionSpec::is_reversible));
        assert!(!registry.get("wait").is_some_and(ActionSpec::is_reversible));
    }

    #[test]
    fn test_register_extends_table() {
        let mut registry = ActionRegistry::new();
        registry.register("noop", ActionSpec::new(|player, _, next| {
            player.proceed(next);
            Ok(())
        }));
        assert_eq!(registry.names(), vec!["noop"]);
    }

    #[test]
    fn test_parse_options_applies_defaults() {
        let parsed: Sample = parse_options("sample", &json!({"text": "hi"})).unwrap();
        assert_eq!(
            parsed,
            Sample {
                before_delay: 60,
                text: "hi".into()
            }
        );
    }

    #[test]
    fn test_parse_options_reports_action() {
        let err = parse_options::<Sample>("sample", &Value::Null).unwrap_err();
        assert!(matches!(err, PlayerError::InvalidOptions { ref action, .. } if action == "sample"));
    }
}
