//! Run-wide target state shared read-only by every track task.

use serde::{Deserialize, Serialize};

/// Extension of transcoded songs.
pub const TRANSCODED_EXTENSION: &str = "mp3";

/// Metadata key the transcoder embeds to record the quality it used.
pub const QUALITY_TAG: &str = "sonicsync_quality";

/// What the local library should look like after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTarget {
    /// Transcode every song to MP3.
    pub transcode: bool,
    /// LAME VBR quality, 0 (best) to 9 (smallest).
    pub quality: u8,
    /// Width in pixels of embedded covers.
    pub cover_size: u32,
    /// Put every final file directly in the collection folder instead of
    /// `Artist/Album/NNN Title`.
    pub flat: bool,
}

impl Default for SyncTarget {
    fn default() -> Self {
        Self {
            transcode: false,
            quality: 2,
            cover_size: 150,
            flat: false,
        }
    }
}

impl SyncTarget {
    /// The quality tag value a transcoded file must carry to be current.
    pub fn quality_tag(&self) -> String {
        self.quality.to_string()
    }
}
