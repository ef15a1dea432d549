//! Interface text table.
//!
//! Keys are the English defaults. A translation file is a JSON5 object
//! mapping keys to replacements; unknown keys are kept so custom front
//! ends can carry their own strings.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ScenarioError;

pub const PLAY: &str = "Play";
pub const REPLAY: &str = "Replay";
pub const NEXT: &str = "Next";
pub const BACK: &str = "Back";
pub const STOP: &str = "Stop";
pub const CLICK_HINT: &str = "Click on these blue things to continue.";
pub const SHOW_DIFFERENCE: &str = "Show difference";
pub const COMPILE_AND_TEST: &str = "Compile and test";
/// Message shown after a successful `compile` without its own text.
pub const COMPILE_SUCCESS: &str = "Compile success";

const DEFAULTS: &[(&str, &str)] = &[
    (PLAY, "Play"),
    (REPLAY, "Replay"),
    (NEXT, "Next"),
    (BACK, "Back"),
    (STOP, "Pause"),
    (CLICK_HINT, "Click on these blue messages to continue."),
    (SHOW_DIFFERENCE, "Show difference"),
    (COMPILE_AND_TEST, "Compile and test"),
    (COMPILE_SUCCESS, "Everything is fine, we can continue!"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texts {
    table: BTreeMap<String, String>,
}

impl Default for Texts {
    fn default() -> Self {
        Self {
            table: DEFAULTS
                .iter()
                .map(|&(key, text)| (key.to_string(), text.to_string()))
                .collect(),
        }
    }
}

impl Texts {
    /// Text for `key`, falling back to the key itself.
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.table.get(key).map_or(key, String::as_str)
    }

    /// Replace entries with `overrides`.
    #[must_use]
    pub fn with_overrides(mut self, overrides: BTreeMap<String, String>) -> Self {
        self.table.extend(overrides);
        self
    }

    /// Defaults overridden by a JSON5 translation.
    pub fn parse(source: &str) -> Result<Self, ScenarioError> {
        let overrides: BTreeMap<String, String> = json5::from_str(source)?;
        Ok(Self::default().with_overrides(overrides))
    }

    /// Defaults overridden by a JSON5 translation file.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let source = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_differ_from_keys_where_reworded() {
        let texts = Texts::default();
        assert_eq!(texts.get(STOP), "Pause");
        assert_eq!(texts.get(CLICK_HINT), "Click on these blue messages to continue.");
        assert_eq!(texts.get(PLAY), "Play");
    }

    #[test]
    fn test_unknown_key_falls_back_to_itself() {
        assert_eq!(Texts::default().get("Diff"), "Diff");
    }

    #[test]
    fn test_parse_overrides_selected_keys() {
        let texts = Texts::parse("{ Play: 'Старт', 'Compile success': 'Все отлично!' }").unwrap();
        assert_eq!(texts.get(PLAY), "Старт");
        assert_eq!(texts.get(COMPILE_SUCCESS), "Все отлично!");
        assert_eq!(texts.get(NEXT), "Next");
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Texts::load(&dir.path().join("absent.json5")).unwrap_err();
        assert!(matches!(err, ScenarioError::Io { .. }));
    }
}
