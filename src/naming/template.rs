//! Filename templates
//!
//! Templates use named placeholders in braces:
//! - `{key}`: key label ("Am", "F#") or "Unknown"
//! - `{camelot}`: wheel position ("8A") or empty
//! - `{bpm}`: tempo rounded to whole BPM
//! - `{name}`: song name (input file name without extension)
//! - `{stem}`: stem label ("Vocals", "Kick", "Full Track")
//!
//! `{{` and `}}` produce literal braces. A template is compiled once; every
//! syntax problem is reported at compile time so rendering cannot fail.
//!
//! # Example
//!
//! ```
//! use stemsplit::naming::FilenameTemplate;
//! use stemsplit::types::TrackMetadata;
//!
//! let template = FilenameTemplate::compile("{key} - {bpm}BPM - {name} - ({stem})").unwrap();
//! let meta = TrackMetadata {
//!     song_name: "song".into(),
//!     key: "Am".into(),
//!     wheel_position: "8A".into(),
//!     tempo_bpm: 120,
//! };
//! assert_eq!(template.render(&meta, "Vocals"), "Am - 120BPM - song - (Vocals)");
//! ```

use crate::error::{Result, StemsplitError};
use crate::types::TrackMetadata;
use std::collections::BTreeMap;
use std::fmt;

/// Literal text removed from the file template to get the folder template
pub const STEM_SUFFIX: &str = " - ({stem})";

/// A named template field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placeholder {
    Key,
    Camelot,
    Bpm,
    Name,
    Stem,
}

impl Placeholder {
    pub const ALL: [Placeholder; 5] = [
        Placeholder::Key,
        Placeholder::Camelot,
        Placeholder::Bpm,
        Placeholder::Name,
        Placeholder::Stem,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Placeholder::Key => "key",
            Placeholder::Camelot => "camelot",
            Placeholder::Bpm => "bpm",
            Placeholder::Name => "name",
            Placeholder::Stem => "stem",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }

    fn value(self, meta: &TrackMetadata, stem: &str) -> String {
        match self {
            Placeholder::Key => meta.key.clone(),
            Placeholder::Camelot => meta.wheel_position.clone(),
            Placeholder::Bpm => meta.tempo_bpm.to_string(),
            Placeholder::Name => meta.song_name.clone(),
            Placeholder::Stem => stem.to_string(),
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Placeholder),
}

/// A compiled filename template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl FilenameTemplate {
    /// Parse template text, rejecting unknown placeholders and unbalanced braces
    pub fn compile(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|&(_, next)| next) == Some('{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().map(|&(_, next)| next) == Some('}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        if c == '{' {
                            break;
                        }
                        name.push(c);
                    }

                    if !closed {
                        return Err(StemsplitError::template_error(
                            source,
                            format!("unterminated '{{' at position {}", pos),
                        ));
                    }
                    if name.is_empty() {
                        return Err(StemsplitError::template_error(
                            source,
                            format!("empty placeholder at position {}", pos),
                        ));
                    }
                    if let Some((field, _)) = name.split_once([':', '!']) {
                        if Placeholder::from_name(field).is_some() {
                            return Err(StemsplitError::template_error(
                                source,
                                format!(
                                    "format spec in '{{{}}}' is not supported, use '{{{}}}'",
                                    name, field
                                ),
                            ));
                        }
                    }
                    let field = Placeholder::from_name(&name).ok_or_else(|| {
                        StemsplitError::template_error(source, format!("unknown placeholder '{}'", name))
                    })?;

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
                '}' => {
                    return Err(StemsplitError::template_error(
                        source,
                        format!("unmatched '}}' at position {}", pos),
                    ));
                }
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Template text as written
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render the template for one stem of a track
    pub fn render(&self, meta: &TrackMetadata, stem: &str) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.clone(),
                Segment::Field(field) => field.value(meta, stem),
            })
            .collect()
    }

    /// Recover placeholder values from a rendered name
    ///
    /// Each field extends to the first occurrence of the literal that follows
    /// it; a trailing literal is matched as a suffix. Returns `None` when the
    /// literals do not line up, when two fields are adjacent, or when a
    /// repeated field takes different values.
    pub fn parse(&self, rendered: &str) -> Option<ParsedName> {
        let mut values = BTreeMap::new();
        let mut rest = rendered;
        let last = self.segments.len().saturating_sub(1);

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(text) => {
                    rest = rest.strip_prefix(text.as_str())?;
                }
                Segment::Field(field) => {
                    let value = match self.segments.get(i + 1) {
                        None => rest,
                        Some(Segment::Field(_)) => return None,
                        Some(Segment::Literal(next)) => {
                            let end = if i + 1 == last {
                                rest.strip_suffix(next.as_str()).map(str::len)?
                            } else {
                                rest.find(next.as_str())?
                            };
                            &rest[..end]
                        }
                    };

                    if let Some(previous) = values.insert(*field, value.to_string()) {
                        if previous != value {
                            return None;
                        }
                    }
                    rest = &rest[value.len()..];
                }
            }
        }

        rest.is_empty().then_some(ParsedName { values })
    }

    /// Template for the per-song folder: this template without [`STEM_SUFFIX`]
    pub fn folder_template(&self) -> Result<FilenameTemplate> {
        FilenameTemplate::compile(&self.source.replace(STEM_SUFFIX, ""))
    }
}

impl fmt::Display for FilenameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Placeholder values recovered by [`FilenameTemplate::parse`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    values: BTreeMap<Placeholder, String>,
}

impl ParsedName {
    pub fn get(&self, field: Placeholder) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn key(&self) -> Option<&str> {
        self.get(Placeholder::Key)
    }

    pub fn stem(&self) -> Option<&str> {
        self.get(Placeholder::Stem)
    }

    pub fn bpm(&self) -> Option<u32> {
        self.get(Placeholder::Bpm)?.parse().ok()
    }
}
