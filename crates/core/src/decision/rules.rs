//! Pure decision rules over probed state.

use crate::target::SyncTarget;
use crate::transform::CoverStream;

use super::stage::Stage;

/// What was found on disk for one track.
///
/// Anything that could not be probed is recorded as absent, which makes
/// the rules below redo the affected work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbedState {
    /// The original was (or is being) fetched in this run.
    pub downloaded: bool,
    /// Quality tag of the converted song, if it exists and carries one.
    pub converted_quality: Option<String>,
    /// Picture stream of the original song.
    pub cover: Option<CoverStream>,
    /// Width of the existing converted cover.
    pub converted_cover_width: Option<u32>,
    pub final_output_exists: bool,
}

/// Whether the original song must be fetched.
///
/// Only the size is compared with the catalog's: a same-sized corrupt
/// file is accepted.
pub fn needs_download(observed_size: Option<u64>, expected_size: u64) -> bool {
    observed_size != Some(expected_size)
}

/// Whether the converted song must be rebuilt. Only meaningful when
/// transcoding.
pub fn needs_transcode(
    converted_quality: Option<&str>,
    target: &SyncTarget,
    downloaded: bool,
) -> bool {
    if downloaded {
        return true;
    }
    converted_quality != Some(target.quality_tag().as_str())
}

/// Whether the cover must be extracted and resized again. Only meaningful
/// when the original has a cover.
pub fn needs_cover_refresh(converted_width: Option<u32>, edge: u32, downloaded: bool) -> bool {
    downloaded || converted_width != Some(edge)
}

/// Mux when there is a cover to attach, Link otherwise.
pub fn final_stage(cover: Option<&CoverStream>) -> Stage {
    if cover.is_some() {
        Stage::Mux
    } else {
        Stage::Link
    }
}
