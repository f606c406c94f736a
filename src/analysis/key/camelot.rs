//! Camelot wheel notation
//!
//! - Numbers 1-12 are positions on the wheel, adjacent numbers a fifth apart
//! - 'A' suffix = minor key, 'B' suffix = major key
//! - Same number, different letter = relative major/minor

use crate::types::{Mode, PitchClass};

/// Wheel positions indexed by pitch class: (major, minor)
const WHEEL: [(&str, &str); 12] = [
    ("8B", "5A"),  // C / Cm
    ("3B", "12A"), // C# / C#m
    ("10B", "7A"), // D / Dm
    ("5B", "2A"),  // D# / D#m
    ("12B", "9A"), // E / Em
    ("7B", "4A"),  // F / Fm
    ("2B", "11A"), // F# / F#m
    ("9B", "6A"),  // G / Gm
    ("4B", "1A"),  // G# / G#m
    ("11B", "8A"), // A / Am
    ("6B", "3A"),  // A# / A#m
    ("1B", "10A"), // B / Bm
];

/// Camelot position for a key
pub fn to_camelot(pitch: PitchClass, mode: Mode) -> &'static str {
    let (major, minor) = WHEEL[pitch.to_index()];
    match mode {
        Mode::Major => major,
        Mode::Minor => minor,
    }
}
