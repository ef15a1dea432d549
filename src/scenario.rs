//! Loaded tutorial scripts.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::editor::Pos;
use crate::error::ScenarioError;
use crate::player::CapturedState;
use crate::registry::ActionRegistry;

/// Cursor marker inside the initial code.
pub const CURSOR_MARKER: char = '|';

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawStep")]
pub struct Step {
    pub kind: String,
    pub options: Value,
    /// Snapshot taken when a reversible step was last dispatched forward.
    pub captured_state: Option<CapturedState>,
}

impl Step {
    pub fn new(kind: impl Into<String>, options: Value) -> Self {
        Self {
            kind: kind.into(),
            options,
            captured_state: None,
        }
    }

    /// The `locale` option, when the step is limited to one.
    pub fn locale(&self) -> Option<&str> {
        self.options.get("locale").and_then(Value::as_str)
    }
}

#[derive(Deserialize)]
struct RawStep {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    options: Option<Map<String, Value>>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl From<RawStep> for Step {
    fn from(raw: RawStep) -> Self {
        // Nested options win over flattened ones.
        let mut options = raw.rest;
        options.extend(raw.options.unwrap_or_default());
        Self::new(raw.kind, Value::Object(options))
    }
}

/// A roadmap label, either plain or translated per locale.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RoadmapLabel {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl RoadmapLabel {
    pub fn for_locale(&self, locale: &str) -> String {
        match self {
            Self::Plain(label) => label.clone(),
            Self::Localized(labels) => labels.get(locale).cloned().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub code: Option<String>,
    #[serde(rename = "actions")]
    pub steps: Vec<Step>,
    #[serde(rename = "steps")]
    pub roadmap: Vec<RoadmapLabel>,
    pub lang: Option<String>,
    /// The help hint was already added to the first message.
    pub ready: bool,
}

impl Scenario {
    /// Parse a JSON5 scenario.
    pub fn parse(source: &str) -> Result<Self, ScenarioError> {
        let value: Value = json5::from_str(source)?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let source = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source)
    }

    /// Initial text with the cursor marker removed, and the marker position.
    pub fn initial_text(&self) -> Option<(String, Option<Pos>)> {
        let code = self.code.as_deref()?;
        let Some(byte) = code.find(CURSOR_MARKER) else {
            return Some((code.to_string(), None));
        };
        let before = &code[..byte];
        let line = before.matches('\n').count();
        let ch = before
            .rfind('\n')
            .map_or(before, |newline| &before[newline + 1..])
            .chars()
            .count();
        let mut text = String::with_capacity(code.len());
        text.push_str(before);
        text.push_str(&code[byte + CURSOR_MARKER.len_utf8()..]);
        Some((text, Some(Pos::new(line, ch))))
    }

    /// Editor mode for the scenario language.
    pub fn editor_mode(&self) -> Option<&'static str> {
        let mode = match self.lang.as_deref()? {
            "java" => "text/x-java",
            "cpp" => "text/x-c++hdr",
            "csharp" => "text/x-csharp",
            "php" => "text/x-php",
            "delphi" => "text/x-pascal",
            "python" => "text/x-python",
            _ => return None,
        };
        Some(mode)
    }

    /// Roadmap labels for `locale`.
    pub fn roadmap_labels(&self, locale: &str) -> Vec<String> {
        self.roadmap
            .iter()
            .map(|label| label.for_locale(locale))
            .collect()
    }

    /// Whether a compile button is needed.
    pub fn has_compile_step(&self) -> bool {
        self.steps
            .iter()
            .any(|step| matches!(step.kind.as_str(), "compile" | "readyAndCompile"))
    }

    /// Append `hint` to the first popover shown for `locale`. Only done once.
    pub fn annotate_first_message(&mut self, hint: &str, locale: &str) {
        if self.ready {
            return;
        }
        self.ready = true;
        let first = self.steps.iter_mut().find(|step| {
            step.kind == "popover" && step.locale().is_none_or(|own| own == locale)
        });
        let Some(Value::Object(options)) = first.map(|step| &mut step.options) else {
            return;
        };
        let text = options
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let annotated = format!("{text}\n\n{hint}");
        options.insert("text".to_string(), Value::String(annotated));
    }

    /// Step types the registry does not know, with their indices.
    pub fn validate(&self, registry: &ActionRegistry) -> Vec<(usize, String)> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, step)| !registry.contains(&step.kind))
            .map(|(index, step)| (index, step.kind.clone()))
            .collect()
    }
}
