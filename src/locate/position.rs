use serde::Deserialize;

use crate::editor::{Coords, Editor, Pos};
use crate::error::LocateError;

/// A position as written in a scenario.
///
/// Accepted forms: `"caret"`, a character offset (number or numeric
/// string), `"line:ch"` (both zero-based), `{line, ch}`, and absolute
/// coordinates as `{x, y}` or `{left, top}`. Coordinates only make sense
/// as an annotation anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(try_from = "RawPos")]
pub enum PosSpec {
    #[default]
    Caret,
    Index(usize),
    LineCh(Pos),
    Coords(Coords),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPos {
    Index(i64),
    Text(String),
    LineCh { line: usize, ch: usize },
    Coords { x: f64, y: f64 },
    Offset { left: f64, top: f64 },
}

impl TryFrom<RawPos> for PosSpec {
    type Error = LocateError;

    fn try_from(raw: RawPos) -> Result<Self, Self::Error> {
        match raw {
            RawPos::Index(index) => Ok(Self::Index(usize::try_from(index).unwrap_or(0))),
            RawPos::Text(text) => text.parse(),
            RawPos::LineCh { line, ch } => Ok(Self::LineCh(Pos::new(line, ch))),
            RawPos::Coords { x, y } | RawPos::Offset { left: x, top: y } => {
                Ok(Self::Coords(Coords { x, y }))
            }
        }
    }
}

impl std::str::FromStr for PosSpec {
    type Err = LocateError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        if text == "caret" {
            return Ok(Self::Caret);
        }
        let invalid = || LocateError::InvalidPosition(text.to_string());
        if let Some((line, ch)) = text.split_once(':') {
            let line = line.trim().parse().map_err(|_| invalid())?;
            let ch = ch.trim().parse().map_err(|_| invalid())?;
            return Ok(Self::LineCh(Pos::new(line, ch)));
        }
        let index: i64 = text.parse().map_err(|_| invalid())?;
        Ok(Self::Index(usize::try_from(index).unwrap_or(0)))
    }
}

impl From<Pos> for PosSpec {
    fn from(pos: Pos) -> Self {
        Self::LineCh(pos)
    }
}

impl PosSpec {
    /// Resolve to a document position.
    ///
    /// # Errors
    /// Absolute coordinates do not map back to a document position.
    pub fn to_pos(&self, editor: &dyn Editor) -> Result<Pos, LocateError> {
        match *self {
            Self::Caret => Ok(editor.cursor()),
            Self::Index(index) => Ok(editor.pos_from_index(index)),
            Self::LineCh(pos) => Ok(pos),
            Self::Coords(coords) => Err(LocateError::InvalidPosition(format!(
                "absolute coordinates ({}, {}) can only anchor an annotation",
                coords.x, coords.y
            ))),
        }
    }

    /// Resolve to screen coordinates.
    pub fn to_coords(&self, editor: &dyn Editor) -> Result<Coords, LocateError> {
        match *self {
            Self::Coords(coords) => Ok(coords),
            _ => self.to_pos(editor).map(|pos| editor.coords_of(pos)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorBuffer;

    fn parse(json: &str) -> PosSpec {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_deserializes_every_form() {
        assert_eq!(parse("\"caret\""), PosSpec::Caret);
        assert_eq!(parse("12"), PosSpec::Index(12));
        assert_eq!(parse("\"12\""), PosSpec::Index(12));
        assert_eq!(parse("\"2:5\""), PosSpec::LineCh(Pos::new(2, 5)));
        assert_eq!(parse(r#"{"line": 1, "ch": 3}"#), PosSpec::LineCh(Pos::new(1, 3)));
        assert_eq!(
            parse(r#"{"x": 10.0, "y": 4.5}"#),
            PosSpec::Coords(Coords { x: 10.0, y: 4.5 })
        );
        assert_eq!(
            parse(r#"{"left": 1, "top": 2}"#),
            PosSpec::Coords(Coords { x: 1.0, y: 2.0 })
        );
    }

    #[test]
    fn test_negative_offset_clamps_to_start() {
        assert_eq!(parse("-4"), PosSpec::Index(0));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(serde_json::from_str::<PosSpec>("\"somewhere\"").is_err());
        assert!(serde_json::from_str::<PosSpec>("\"1:x\"").is_err());
    }

    #[test]
    fn test_to_pos_resolves_against_editor() {
        let mut buf = EditorBuffer::from_text("ab\ncd");
        buf.set_cursor(Pos::new(1, 1));
        assert_eq!(PosSpec::Caret.to_pos(&buf).unwrap(), Pos::new(1, 1));
        assert_eq!(PosSpec::Index(4).to_pos(&buf).unwrap(), Pos::new(1, 1));
        assert!(matches!(
            PosSpec::Coords(Coords::default()).to_pos(&buf),
            Err(LocateError::InvalidPosition(_))
        ));
    }

    #[test]
    fn test_to_coords_passes_absolute_through() {
        let buf = EditorBuffer::from_text("ab\ncd");
        let coords = Coords { x: 3.0, y: 9.0 };
        assert_eq!(PosSpec::Coords(coords).to_coords(&buf).unwrap(), coords);
        let at = PosSpec::LineCh(Pos::new(1, 2)).to_coords(&buf).unwrap();
        assert!((at.x - 14.0).abs() < f64::EPSILON);
    }
}
