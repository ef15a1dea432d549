//! Position resolution.
//!
//! Scenario steps address code three ways: plain positions ([`PosSpec`]),
//! structure (`location` / `parent` / `place`, resolved by [`locate`]) and
//! text searched inside a region ([`find_text`], [`find_text_ranges`]).
//! Search text may carry `|||` markers: in a single match the first marker
//! shifts the resulting position, in a selection each marker pair becomes
//! a separate sub-range.

mod position;
mod structure;

pub use position::PosSpec;
pub use structure::{Block, DeclarationKind, Signature, SignaturePart};

use std::str::FromStr;

use regex::RegexBuilder;
use serde::{Deserialize, Deserializer};

use crate::editor::{Editor, Pos, Range};
use crate::error::LocateError;
use structure::{byte_of, char_len, range_text};

/// Marker separating sub-ranges inside search text.
pub const MARKER: &str = "|||";

/// A named point or range of a located declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Place {
    Name,
    Visibility,
    Static,
    Abstract,
    Type,
    Super,
    Interface,
    Body,
    Whole,
    Start,
    End,
    Before,
    After,
    Parameters,
    ParametersEnd,
}

impl FromStr for Place {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "name" => Self::Name,
            "visibility" => Self::Visibility,
            "static" => Self::Static,
            "abstract" => Self::Abstract,
            "type" => Self::Type,
            "super" => Self::Super,
            "interface" => Self::Interface,
            "body" => Self::Body,
            "whole" => Self::Whole,
            "start" => Self::Start,
            "end" => Self::End,
            "before" => Self::Before,
            "after" => Self::After,
            "parameters" => Self::Parameters,
            "parameters end" => Self::ParametersEnd,
            other => return Err(format!("unknown place \"{other}\"")),
        })
    }
}

impl Place {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Visibility => "visibility",
            Self::Static => "static",
            Self::Abstract => "abstract",
            Self::Type => "type",
            Self::Super => "super",
            Self::Interface => "interface",
            Self::Body => "body",
            Self::Whole => "whole",
            Self::Start => "start",
            Self::End => "end",
            Self::Before => "before",
            Self::After => "after",
            Self::Parameters => "parameters",
            Self::ParametersEnd => "parameters end",
        }
    }

    const fn signature_part(self) -> Option<SignaturePart> {
        match self {
            Self::Name => Some(SignaturePart::Name),
            Self::Visibility => Some(SignaturePart::Visibility),
            Self::Static => Some(SignaturePart::Static),
            Self::Abstract => Some(SignaturePart::Abstract),
            Self::Type => Some(SignaturePart::Type),
            Self::Super => Some(SignaturePart::Super),
            Self::Interface => Some(SignaturePart::Interface),
            _ => None,
        }
    }
}

/// Deserialize an optional place, treating an empty string as absent.
pub(crate) fn optional_place<'de, D>(deserializer: D) -> Result<Option<Place>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref() {
        None | Some("") => Ok(None),
        Some(place) => place.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// The whole document as a range.
pub fn document_range(editor: &dyn Editor) -> Range {
    Range::new(Pos::default(), editor.pos_from_index(editor.len_chars()))
}

/// Resolve a structural address to a range.
///
/// `parent` narrows the search for `location`; an empty `location` falls
/// back to the parent block, and with neither the whole document is
/// returned. `place` then picks a point or part of the block. Places that
/// yield a single point return it as the anchor and keep the block's
/// closing brace as the head.
pub fn locate(
    editor: &dyn Editor,
    location: &str,
    parent: &str,
    place: Option<Place>,
) -> Result<Range, LocateError> {
    let document = document_range(editor);
    let mut found: Option<(Block, Signature, &str)> = None;

    for name in [parent, location] {
        if name.is_empty() {
            continue;
        }
        let region = found
            .as_ref()
            .map_or(document, |(block, _, _)| Range::new(block.start, block.head));
        let signature = Signature::new(name, &range_text(editor, region))?;
        let block = signature.find_block(editor, name, region)?;
        found = Some((block, signature, name));
    }

    let Some(place) = place else {
        return Ok(found.map_or(document, |(block, _, _)| {
            Range::new(block.start, block.head)
        }));
    };
    let Some((block, signature, name)) = found else {
        return Err(LocateError::MissingLocation {
            place: place.as_str().to_string(),
        });
    };

    let place_not_found = || LocateError::PlaceNotFound {
        place: place.as_str().to_string(),
        location: name.to_string(),
    };
    let point = |pos: Pos| Range::new(pos, block.head);
    Ok(match place {
        Place::Body => Range::new(editor.find_text_offset(block.start, 1), block.end),
        Place::Whole => {
            let anchor = if block.before == Pos::default() {
                block.before
            } else {
                editor.find_text_offset(block.before, 1)
            };
            Range::new(anchor, editor.find_text_offset(block.after, 1))
        }
        Place::Start => point(block.start),
        Place::End => point(block.end),
        Place::Before => point(block.before),
        Place::After => point(block.after),
        Place::Parameters | Place::ParametersEnd => {
            let (open, close) = parameter_bounds(editor, block.start).ok_or_else(|| {
                LocateError::NoParameters {
                    location: name.to_string(),
                }
            })?;
            if place == Place::Parameters {
                Range::new(open, close)
            } else {
                point(close)
            }
        }
        other => {
            let part = other.signature_part().ok_or_else(place_not_found)?;
            signature
                .part(editor, name, block.start, part)?
                .ok_or_else(place_not_found)?
        }
    })
}

/// Inside of the last parenthesis pair that opens and closes before `start`.
fn parameter_bounds(editor: &dyn Editor, start: Pos) -> Option<(Pos, Pos)> {
    let limit = editor.index_from_pos(start);
    let before: Vec<char> = editor.text().chars().take(limit).collect();
    let open = before.iter().rposition(|&c| c == '(')?;
    let close = before.iter().rposition(|&c| c == ')')?;
    Some((editor.pos_from_index(open + 1), editor.pos_from_index(close)))
}

fn search_scope(location: &str) -> String {
    if location.is_empty() {
        String::new()
    } else {
        format!("method/class \"{location}\" of the ")
    }
}

/// Case-insensitive matches of `query` that start at or after `region.anchor`
/// and end no later than `region.head`, as char offsets.
fn matches_in(
    editor: &dyn Editor,
    region: Range,
    query: &str,
) -> Result<Vec<(usize, usize)>, LocateError> {
    let text = editor.text();
    let from = editor.index_from_pos(region.anchor);
    let limit = editor.index_from_pos(region.head);
    let regex = RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
        .map_err(|err| LocateError::InvalidPattern(err.to_string()))?;

    let start_byte = byte_of(&text, from);
    let mut found = Vec::new();
    let mut chars_seen = from;
    let mut bytes_seen = start_byte;
    for m in regex.find_iter(&text[start_byte..]) {
        let begin = start_byte + m.start();
        chars_seen += char_len(&text[bytes_seen..begin]);
        bytes_seen = begin;
        let end = chars_seen + char_len(m.as_str());
        if end > limit {
            break;
        }
        found.push((chars_seen, end));
    }
    Ok(found)
}

fn not_found(editor: &dyn Editor, region: Range, query: &str, location: &str) -> LocateError {
    LocateError::TextNotFound {
        scope: search_scope(location),
        query: query.to_string(),
        region: range_text(editor, region),
    }
}

/// Position of the first occurrence of `text` inside `region`.
///
/// A `|||` marker in `text` moves the result to the marker's offset.
pub fn find_text(
    editor: &dyn Editor,
    region: Range,
    text: &str,
    location: &str,
) -> Result<Pos, LocateError> {
    let query = text.replace(MARKER, "");
    let (from, _) = matches_in(editor, region, &query)?
        .into_iter()
        .next()
        .ok_or_else(|| not_found(editor, region, &query, location))?;
    let shift = text.find(MARKER).map_or(0, |byte| char_len(&text[..byte]));
    Ok(editor.pos_from_index(from + shift))
}

/// Ranges of the occurrences of `text` inside `region`.
///
/// With `index` (one-based) only that occurrence is used. Each `|||` pair in
/// `text` yields a sub-range of the occurrence instead of the whole match;
/// an unpaired marker yields an empty range at its offset.
pub fn find_text_ranges(
    editor: &dyn Editor,
    region: Range,
    text: &str,
    index: Option<usize>,
    location: &str,
) -> Result<Vec<Range>, LocateError> {
    let query = text.replace(MARKER, "");
    let index = index.filter(|&i| i > 0);
    let mut ranges = Vec::new();
    for (i, (from, to)) in matches_in(editor, region, &query)?.into_iter().enumerate() {
        let ordinal = i + 1;
        if index.is_some_and(|wanted| wanted != ordinal) {
            continue;
        }
        if text.contains(MARKER) {
            ranges.extend(
                marker_spans(text)
                    .into_iter()
                    .map(|(start, end)| {
                        Range::new(editor.pos_from_index(from + start), editor.pos_from_index(from + end))
                    }),
            );
        } else {
            ranges.push(Range::new(editor.pos_from_index(from), editor.pos_from_index(to)));
        }
        if index.is_some() {
            break;
        }
    }
    if ranges.is_empty() {
        return Err(not_found(editor, region, &query, location));
    }
    Ok(ranges)
}

/// Char offsets of the `|||` pairs once the markers are removed.
fn marker_spans(text: &str) -> Vec<(usize, usize)> {
    let mut rest = text.to_string();
    let mut spans = Vec::new();
    while let Some(open) = rest.find(MARKER) {
        let start = char_len(&rest[..open]);
        rest.replace_range(open..open + MARKER.len(), "");
        let end = match rest.find(MARKER) {
            Some(close) => {
                let end = char_len(&rest[..close]);
                rest.replace_range(close..close + MARKER.len(), "");
                end
            }
            None => start,
        };
        spans.push((start, end));
    }
    spans
}
