//! Model → stem list lookup
//!
//! Stem names are the file stems demucs writes (`vocals.wav`, ...). Unknown
//! models fall back to the four-stem default.

const FOUR_STEMS: &[&str] = &["bass", "drums", "other", "vocals"];
const SIX_STEMS: &[&str] = &["bass", "drums", "other", "vocals", "piano", "guitar"];

/// Stem list used for any model not in [`MODEL_STEMS`]
pub const DEFAULT_STEMS: &[&str] = FOUR_STEMS;

/// Stem name of the drums output, fed to the drum sub-separator
pub const DRUMS_STEM: &str = "drums";

const MODEL_STEMS: &[(&str, &[&str])] = &[
    ("htdemucs", FOUR_STEMS),
    ("htdemucs_ft", FOUR_STEMS),
    ("htdemucs_6s", SIX_STEMS),
    ("mdx_extra", FOUR_STEMS),
    ("mdx_extra_q", FOUR_STEMS),
];

/// Stems produced by `model`
pub fn stems_for_model(model: &str) -> &'static [&'static str] {
    MODEL_STEMS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, stems)| *stems)
        .unwrap_or(DEFAULT_STEMS)
}

/// Whether `model` has its own table entry
pub fn is_known_model(model: &str) -> bool {
    MODEL_STEMS.iter().any(|(name, _)| *name == model)
}

/// Label used in file names: "vocals" → "Vocals"
pub fn stem_label(stem: &str) -> String {
    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
