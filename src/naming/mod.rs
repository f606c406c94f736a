//! Output naming
//!
//! Every file written to a run's output directory gets its final name here,
//! before the copy happens.

pub mod template;

pub use template::{FilenameTemplate, ParsedName, Placeholder};

use crate::error::Result;
use crate::types::TrackMetadata;

/// Extension of every file in the output contract
pub const OUTPUT_EXTENSION: &str = "wav";

/// Stem label of the copied input file
pub const FULL_TRACK_LABEL: &str = "Full Track";

/// Final file name for one stem, extension included
pub fn stem_file_name(template: &FilenameTemplate, meta: &TrackMetadata, stem_label: &str) -> String {
    format!("{}.{}", template.render(meta, stem_label), OUTPUT_EXTENSION)
}

/// Name of the per-song folder
///
/// With `include_key_bpm` the folder follows the file template minus its
/// stem suffix ("Am - 120BPM - song"); otherwise it is the song name.
pub fn song_folder_name(
    template: &FilenameTemplate,
    meta: &TrackMetadata,
    include_key_bpm: bool,
) -> Result<String> {
    if !include_key_bpm {
        return Ok(meta.song_name.clone());
    }
    Ok(template.folder_template()?.render(meta, ""))
}
