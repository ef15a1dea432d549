//! Observable state outside the editor.
//!
//! The player never touches a widget toolkit. Everything a front end needs
//! to draw besides the code lives here as plain data: the roadmap, the
//! visible annotations, the compile button and the class sets of named
//! page elements.

mod roadmap;

pub use roadmap::{AllSteps, Progress, Roadmap, StepStatus, StepTarget};

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::editor::Coords;

/// Selector of the annotation bubbles.
pub const TOOLTIP: &str = ".tooltip";
/// Selector of the compile button.
pub const COMPILE_BUTTON: &str = ".codeplayer-compile";
/// Selector of the roadmap.
pub const ROADMAP: &str = ".codeplayer-roadmap";

/// Side of the anchor an annotation is drawn on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
}

/// What an annotation points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnnotationAnchor {
    /// A point in the code area.
    Code(Coords),
    /// A named page element.
    Element(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationId(u64);

/// A visible message bubble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub text: String,
    pub anchor: AnnotationAnchor,
    pub placement: Placement,
    /// Extra classes, space separated.
    pub class: String,
}

/// Activity shown on the compile button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompileIndicator {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileButton {
    pub indicator: CompileIndicator,
    /// Drawing attention while waiting for the user.
    pub blinking: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stage {
    pub roadmap: Roadmap,
    pub compile: CompileButton,
    annotations: Vec<Annotation>,
    next_annotation: u64,
    classes: BTreeMap<String, BTreeSet<String>>,
}

impl Stage {
    pub fn new(roadmap: Roadmap) -> Self {
        Self {
            roadmap,
            ..Self::default()
        }
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn show_annotation(
        &mut self,
        text: impl Into<String>,
        anchor: AnnotationAnchor,
        placement: Placement,
        class: impl Into<String>,
    ) -> AnnotationId {
        let id = AnnotationId(self.next_annotation);
        self.next_annotation += 1;
        self.annotations.push(Annotation {
            id,
            text: text.into(),
            anchor,
            placement,
            class: class.into(),
        });
        id
    }

    pub fn hide_annotation(&mut self, id: AnnotationId) -> bool {
        let before = self.annotations.len();
        self.annotations.retain(|annotation| annotation.id != id);
        self.annotations.len() != before
    }

    pub fn hide_all_annotations(&mut self) {
        self.annotations.clear();
    }

    /// Replace the visible annotations with a captured set.
    pub fn restore_annotations(&mut self, annotations: Vec<Annotation>) {
        let highest = annotations.iter().map(|a| a.id.0 + 1).max().unwrap_or(0);
        self.next_annotation = self.next_annotation.max(highest);
        self.annotations = annotations;
    }

    /// Add every space-separated class in `class` to the element.
    pub fn add_class(&mut self, selector: &str, class: &str) {
        let set = self.classes.entry(selector.to_string()).or_default();
        set.extend(class.split_whitespace().map(ToOwned::to_owned));
    }

    /// Remove every space-separated class in `class` from the element.
    pub fn remove_class(&mut self, selector: &str, class: &str) {
        if let Some(set) = self.classes.get_mut(selector) {
            for name in class.split_whitespace() {
                set.remove(name);
            }
            if set.is_empty() {
                self.classes.remove(selector);
            }
        }
    }

    pub fn has_class(&self, selector: &str, class: &str) -> bool {
        self.classes
            .get(selector)
            .is_some_and(|set| set.contains(class))
    }

    pub fn classes_of(&self, selector: &str) -> impl Iterator<Item = &str> {
        self.classes
            .get(selector)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Back to the pristine state. Roadmap labels are kept.
    pub fn reset(&mut self) {
        self.roadmap.reset();
        self.compile = CompileButton::default();
        self.annotations.clear();
        self.classes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotations_show_and_hide() {
        let mut stage = Stage::default();
        let first = stage.show_annotation(
            "hello",
            AnnotationAnchor::Code(Coords { x: 7.0, y: 18.0 }),
            Placement::Top,
            "",
        );
        let second = stage.show_annotation(
            "there",
            AnnotationAnchor::Element(COMPILE_BUTTON.into()),
            Placement::Right,
            "tooltip-success",
        );
        assert_ne!(first, second);
        assert!(stage.hide_annotation(first));
        assert!(!stage.hide_annotation(first));
        assert_eq!(stage.annotations().len(), 1);
        assert_eq!(stage.annotations()[0].text, "there");
    }

    #[test]
    fn test_restore_annotations_keeps_ids_unique() {
        let mut stage = Stage::default();
        let id = stage.show_annotation("a", AnnotationAnchor::Element(TOOLTIP.into()), Placement::Top, "");
        let captured = stage.annotations().to_vec();
        stage.hide_all_annotations();

        let mut other = Stage::default();
        other.restore_annotations(captured);
        let fresh = other.show_annotation("b", AnnotationAnchor::Element(TOOLTIP.into()), Placement::Top, "");
        assert_ne!(fresh, id);
    }

    #[test]
    fn test_classes_are_space_separated() {
        let mut stage = Stage::default();
        stage.add_class(".editor", "dim  faded");
        assert!(stage.has_class(".editor", "dim"));
        assert!(stage.has_class(".editor", "faded"));
        stage.remove_class(".editor", "dim");
        assert_eq!(stage.classes_of(".editor").collect::<Vec<_>>(), vec!["faded"]);
        stage.remove_class(".editor", "faded");
        assert_eq!(stage.classes_of(".editor").count(), 0);
    }

    #[test]
    fn test_reset_keeps_roadmap_labels() {
        let mut stage = Stage::new(Roadmap::new(vec!["intro".into()]));
        stage.roadmap.set(Progress::Active(1));
        stage.compile.blinking = true;
        stage.add_class(".x", "y");
        stage.reset();
        assert_eq!(stage.roadmap.labels(), ["intro".to_string()]);
        assert_eq!(stage.roadmap.progress(), Progress::None);
        assert!(!stage.compile.blinking);
        assert!(!stage.has_class(".x", "y"));
    }
}
