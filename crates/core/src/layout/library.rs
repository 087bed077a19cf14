//! Library directory layout.

use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::LayoutError;
use crate::sanitize::sanitize_segment;
use crate::target::TRANSCODED_EXTENSION;

/// Hidden directory holding downloaded originals.
pub const ORIGINAL_DIR: &str = ".original";

/// Hidden directory holding transcoded songs and resized covers.
pub const CONVERTED_DIR: &str = ".converted";

const SONGS_DIR: &str = "songs";
const COVERS_DIR: &str = "covers";

/// The directories one run reads and writes.
///
/// ```text
/// root/
///   .original/{songs,covers}
///   .converted/{songs,covers}
///   {collection}[_mp3]/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryLayout {
    pub root: PathBuf,
    pub original_songs: PathBuf,
    pub original_covers: PathBuf,
    pub converted_songs: PathBuf,
    pub converted_covers: PathBuf,
    /// Where final artifacts go.
    pub combined: PathBuf,
}

impl LibraryLayout {
    /// Computes the layout without touching the filesystem.
    pub fn new(root: &Path, collection: &str, transcode: bool) -> Self {
        let original = root.join(ORIGINAL_DIR);
        let converted = root.join(CONVERTED_DIR);

        let mut combined_name = sanitize_segment(collection);
        if transcode {
            combined_name.push('_');
            combined_name.push_str(TRANSCODED_EXTENSION);
        }

        Self {
            root: root.to_path_buf(),
            original_songs: original.join(SONGS_DIR),
            original_covers: original.join(COVERS_DIR),
            converted_songs: converted.join(SONGS_DIR),
            converted_covers: converted.join(COVERS_DIR),
            combined: root.join(sanitize_segment(&combined_name)),
        }
    }

    /// Computes the layout and creates every directory in it.
    ///
    /// Existing directories are left alone, so this can run on every sync.
    pub async fn prepare(
        root: &Path,
        collection: &str,
        transcode: bool,
    ) -> Result<Self, LayoutError> {
        let layout = Self::new(root, collection, transcode);

        for dir in layout.dirs() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| LayoutError::create_failed(dir.to_path_buf(), e))?;

            let metadata = tokio::fs::metadata(dir)
                .await
                .map_err(|e| LayoutError::create_failed(dir.to_path_buf(), e))?;
            if !metadata.is_dir() {
                return Err(LayoutError::NotADirectory {
                    path: dir.to_path_buf(),
                });
            }
        }

        debug!(root = %layout.root.display(), combined = %layout.combined.display(), "Library layout ready");

        Ok(layout)
    }

    /// Every directory of the layout.
    pub fn dirs(&self) -> [&Path; 5] {
        [
            &self.original_songs,
            &self.original_covers,
            &self.converted_songs,
            &self.converted_covers,
            &self.combined,
        ]
    }
}
