//! Heuristic recognition of class and method signatures.
//!
//! This is a pattern table, not a parser. It covers the brace languages the
//! tutorials are written in (Java, C#, C++, PHP) well enough to point at a
//! class or method by name and then at a part of it.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::editor::{Editor, Pos, Range};
use crate::error::LocateError;

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:([a-zA-Z0-9_\\$]+?) )?([a-zA-Z0-9_\\$]+?)$").expect("location regex")
});

const INDENT: &str = r"^([^\S\n]*)";
const CLASS_VISIBILITY: &str = r"((private|protected|public|internal)\s+)?";
const CLASS_ABSTRACT: &str = r"((abstract|virtual|static|partial)\s+)?";
const CLASS_KEYWORD: &str = r"((class)\s+)";
const CLASS_SUPER: &str = r"((?:\s+extends|\s*:)\s+([a-zA-Z0-9_<>\\. ]+)\s*)?";
const CLASS_INTERFACE: &str = r"((?:\s+implements|\s*\,)\s+([a-zA-Z0-9_<>\\., ]+)\s*)?";
const METHOD_OVERRIDE: &str = r"(?:@Override\s+)?";
const METHOD_VISIBILITY: &str = r"((private|protected|public|internal)\s+)?";
const METHOD_STATIC: &str = r"((override|static|abstract|virtual)\s+)?";
const METHOD_TYPE: &str = r"(([a-zA-Z0-9_<>\$]+?)\s+)?";
const METHOD_PARAMETERS: &str = r"\s*\(([^;\(\{\}]*?)\)";
const METHOD_BASE: &str = r"(\s*:\s*(base|this)\([a-zA-Z0-9_<>\\., ]*\))?";
const TRAILER: &str = r"\s*";

/// The kind of declaration a location names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Class,
    Method,
}

/// Signature pattern for one location.
#[derive(Debug, Clone)]
pub struct Signature {
    pub kind: DeclarationKind,
    pattern: String,
}

/// A matched declaration with its block delimiters and derived points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Just after the opening brace.
    pub start: Pos,
    /// The closing brace.
    pub head: Pos,
    /// Last non-blank point of the body.
    pub end: Pos,
    /// Just before the declaration.
    pub before: Pos,
    /// Just after the closing brace.
    pub after: Pos,
}

impl Signature {
    /// Build the pattern for `location` (`"name"` or `"type name"`).
    ///
    /// Without an explicit type, the location is a class when `region`
    /// contains `class <name>`.
    pub fn new(location: &str, region: &str) -> Result<Self, LocateError> {
        let captures = LOCATION
            .captures(location)
            .ok_or_else(|| LocateError::SignatureNotFound {
                location: location.to_string(),
            })?;
        let name = regex::escape(&captures[2]);
        let mut kind_word = captures.get(1).map(|m| m.as_str().to_string());

        if kind_word.is_none() {
            let probe = Regex::new(&format!("(?im){CLASS_KEYWORD}({name})")).map_err(pattern_error)?;
            if probe.is_match(region) {
                kind_word = Some("class".to_string());
            }
        }

        let mut pattern = String::from(INDENT);
        let kind = match kind_word.as_deref() {
            Some("class") => {
                pattern.push_str(CLASS_VISIBILITY);
                pattern.push_str(CLASS_ABSTRACT);
                pattern.push_str(CLASS_KEYWORD);
                pattern.push_str(&format!("({name})"));
                pattern.push_str(CLASS_SUPER);
                pattern.push_str(CLASS_INTERFACE);
                DeclarationKind::Class
            }
            Some(word @ ("public" | "private" | "protected")) => {
                let word = regex::escape(word);
                pattern.push_str(METHOD_OVERRIDE);
                pattern.push_str(&format!(r"(({word})\s+)(())(())({name})"));
                pattern.push_str(METHOD_PARAMETERS);
                pattern.push_str(METHOD_BASE);
                DeclarationKind::Method
            }
            Some("static") => {
                pattern.push_str(METHOD_OVERRIDE);
                pattern.push_str(METHOD_VISIBILITY);
                pattern.push_str(&format!(r"((static)\s+)(())({name})"));
                pattern.push_str(METHOD_PARAMETERS);
                pattern.push_str(METHOD_BASE);
                DeclarationKind::Method
            }
            Some(word) => {
                let word = regex::escape(word);
                pattern.push_str(METHOD_OVERRIDE);
                pattern.push_str(METHOD_VISIBILITY);
                pattern.push_str(METHOD_STATIC);
                pattern.push_str(&format!(r"(({word})\s+)({name})"));
                pattern.push_str(METHOD_PARAMETERS);
                pattern.push_str(METHOD_BASE);
                DeclarationKind::Method
            }
            None => {
                pattern.push_str(METHOD_OVERRIDE);
                pattern.push_str(METHOD_VISIBILITY);
                pattern.push_str(METHOD_STATIC);
                pattern.push_str(METHOD_TYPE);
                pattern.push_str(&format!("({name})"));
                pattern.push_str(METHOD_PARAMETERS);
                pattern.push_str(METHOD_BASE);
                DeclarationKind::Method
            }
        };
        pattern.push_str(TRAILER);
        Ok(Self { kind, pattern })
    }

    fn block_regex(&self) -> Result<Regex, LocateError> {
        Regex::new(&format!(r"(?im){}\{{", self.pattern)).map_err(pattern_error)
    }

    fn signature_regex(&self) -> Result<Regex, LocateError> {
        Regex::new(&format!("(?im){}", self.pattern)).map_err(pattern_error)
    }

    /// Find the first declaration inside `region` and its block.
    pub fn find_block(
        &self,
        editor: &dyn Editor,
        location: &str,
        region: Range,
    ) -> Result<Block, LocateError> {
        let region_start = editor.index_from_pos(region.anchor);
        let region_text = range_text(editor, region);
        let found = self
            .block_regex()?
            .find(&region_text)
            .ok_or_else(|| LocateError::LocationNotFound {
                location: location.to_string(),
                region: region_text.clone(),
            })?;

        let match_start = char_len(&region_text[..found.start()]);
        let match_end = match_start + char_len(found.as_str());
        let start = editor.pos_from_index(region_start + match_end);
        let head = editor
            .find_matching_delimiter(start)
            .ok_or_else(|| LocateError::UnbalancedBlock {
                location: location.to_string(),
            })?;
        let before = editor.pos_from_index((region_start + match_start).saturating_sub(1));
        let after = editor.find_text_offset(head, 1);

        let line_before_brace: String = editor
            .text()
            .split('\n')
            .nth(head.line)
            .unwrap_or_default()
            .chars()
            .take(head.ch)
            .collect();
        let end = if line_before_brace.trim().is_empty() && head.line > 0 {
            let previous = head.line - 1;
            let previous_len = editor
                .text()
                .split('\n')
                .nth(previous)
                .map_or(0, |line| line.chars().count());
            Pos::new(previous, previous_len)
        } else {
            head
        };

        Ok(Block {
            start,
            head,
            end,
            before,
            after,
        })
    }

    /// Range of one part of the signature that ends right before `start`.
    ///
    /// Returns `Ok(None)` when the signature has no such part.
    pub fn part(
        &self,
        editor: &dyn Editor,
        location: &str,
        start: Pos,
        part: SignaturePart,
    ) -> Result<Option<Range>, LocateError> {
        let text = editor.text();
        let limit = byte_of(&text, editor.index_from_pos(start));
        let haystack = &text[..limit];
        let regex = self.signature_regex()?;
        let captures = last_match(&regex, haystack).ok_or_else(|| LocateError::SignatureNotFound {
            location: location.to_string(),
        })?;
        let whole = captures.get(0).map_or(0, |m| m.start());
        let from = char_len(&haystack[..whole]);

        let parts = match self.kind {
            DeclarationKind::Class => class_parts(&captures, from),
            DeclarationKind::Method => method_parts(&captures, from),
        };
        Ok(parts
            .into_iter()
            .find(|(candidate, _)| *candidate == part)
            .map(|(_, (anchor, head))| {
                Range::new(editor.pos_from_index(anchor), editor.pos_from_index(head))
            }))
    }
}

/// Parts of a signature that can be addressed by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignaturePart {
    Name,
    Visibility,
    Static,
    Abstract,
    Type,
    Super,
    Interface,
}

type Span = (usize, usize);

fn group<'h>(captures: &Captures<'h>, index: usize) -> &'h str {
    captures.get(index).map_or("", |m| m.as_str())
}

/// Walk the class groups: indent, visibility, modifier, keyword, name,
/// superclass, interfaces.
fn class_parts(captures: &Captures<'_>, from: usize) -> Vec<(SignaturePart, Span)> {
    let mut parts = Vec::new();
    let mut next = from + char_len(group(captures, 1));
    for (index, part) in [
        (2, SignaturePart::Visibility),
        (4, SignaturePart::Abstract),
        (6, SignaturePart::Type),
    ] {
        let outer = group(captures, index);
        if !outer.is_empty() {
            let word = char_len(group(captures, index + 1).trim());
            parts.push((part, (next, next + word)));
            next += char_len(outer);
        }
    }
    let name = group(captures, 8);
    if !name.is_empty() {
        parts.push((SignaturePart::Name, (next, next + char_len(name.trim()))));
        next += char_len(name);
    }
    for (index, part) in [(9, SignaturePart::Super), (11, SignaturePart::Interface)] {
        let outer = group(captures, index);
        if !outer.is_empty() {
            let inner = group(captures, index + 1);
            let offset = outer.find(inner).map_or(0, |byte| char_len(&outer[..byte]));
            let anchor = next + offset;
            parts.push((part, (anchor, anchor + char_len(inner.trim()))));
            next += char_len(outer);
        }
    }
    parts
}

/// Walk the method groups: indent, visibility, modifier, return type, name.
///
/// An `@Override` prefix is matched but not counted, so offsets after it
/// are shifted.
fn method_parts(captures: &Captures<'_>, from: usize) -> Vec<(SignaturePart, Span)> {
    let mut parts = Vec::new();
    let mut next = from + char_len(group(captures, 1));
    let visibility = group(captures, 2);
    if !visibility.is_empty() {
        let word = char_len(group(captures, 3).trim());
        parts.push((SignaturePart::Visibility, (next, next + word)));
        next += char_len(visibility);
    }
    let modifier = group(captures, 4);
    if !modifier.is_empty() {
        let span = (next, next + char_len(group(captures, 5).trim()));
        parts.push((SignaturePart::Static, span));
        parts.push((SignaturePart::Abstract, span));
        next += char_len(modifier);
    }
    let return_type = group(captures, 6);
    if !return_type.is_empty() {
        parts.push((SignaturePart::Type, (next, next + char_len(group(captures, 7)))));
        next += char_len(return_type);
    }
    parts.push((SignaturePart::Name, (next, next + char_len(group(captures, 8)))));
    parts
}

/// The match ending furthest into `haystack`, trying every start offset.
fn last_match<'h>(regex: &Regex, haystack: &'h str) -> Option<Captures<'h>> {
    let mut best: Option<Captures<'h>> = None;
    let mut from = 0;
    while from <= haystack.len() {
        let Some(captures) = regex.captures_at(haystack, from) else {
            break;
        };
        let Some(found) = captures.get(0) else {
            break;
        };
        let longer = best
            .as_ref()
            .and_then(|b| b.get(0))
            .is_none_or(|b| found.end() > b.end());
        from = found.start()
            + haystack[found.start()..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
        if longer {
            best = Some(captures);
        }
    }
    best
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub(crate) fn byte_of(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map_or(text.len(), |(byte, _)| byte)
}

pub(crate) fn range_text(editor: &dyn Editor, range: Range) -> String {
    let from = editor.index_from_pos(range.from());
    let to = editor.index_from_pos(range.to());
    editor.text().chars().skip(from).take(to - from).collect()
}

fn pattern_error(err: regex::Error) -> LocateError {
    LocateError::InvalidPattern(err.to_string())
}
