//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the catalog and media
//! transform traits, so the whole sync engine can be exercised without a
//! server or ffmpeg.
//!
//! # Example
//!
//! ```rust,ignore
//! use sonicsync_core::testing::{fixtures, MockCatalog, MockTransformer};
//!
//! let catalog = MockCatalog::new();
//! catalog.set_collection(fixtures::favorites(3)).await;
//!
//! let transformer = MockTransformer::new();
//! transformer.set_source_cover(Some(fixtures::cover())).await;
//! ```

mod mock_catalog;
mod mock_transformer;

pub use mock_catalog::{MockCatalog, RecordedCatalogCall};
pub use mock_transformer::{MockTransformer, RecordedOp};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::catalog::{Collection, Track};
    use crate::transform::CoverStream;

    /// Create a test track with reasonable defaults.
    pub fn track(id: &str, title: &str, album: &str) -> Track {
        Track {
            id: id.to_string(),
            title: title.to_string(),
            album: album.to_string(),
            album_id: format!("album-{}", album.to_lowercase().replace(' ', "-")),
            artist: "Test Artist".to_string(),
            track_number: "1".to_string(),
            suffix: "flac".to_string(),
            size: 1024,
        }
    }

    /// Create `count` tracks with distinct titles on one album.
    pub fn tracks(count: usize) -> Vec<Track> {
        (1..=count)
            .map(|i| {
                let mut track = track(&format!("t{}", i), &format!("Song {}", i), "Test Album");
                track.track_number = i.to_string();
                track
            })
            .collect()
    }

    /// Create the favorites collection with `count` tracks.
    pub fn favorites(count: usize) -> Collection {
        Collection::favorites(tracks(count))
    }

    /// A typical embedded cover.
    pub fn cover() -> CoverStream {
        CoverStream::new("mjpeg", 600)
    }
}
