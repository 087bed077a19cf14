//! Per-track path planning.

use std::path::PathBuf;

use super::library::LibraryLayout;
use crate::catalog::Track;
use crate::sanitize::{file_name, sanitize_segment};
use crate::target::{SyncTarget, TRANSCODED_EXTENSION};
use crate::transform::CoverStream;

/// Every path one track touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedPaths {
    /// `{Album} {Title}`, sanitized. Shared by every intermediate file.
    pub stem: String,
    pub original_song: PathBuf,
    pub converted_song: PathBuf,
    /// Final artifact when the run's target is met.
    pub final_output: PathBuf,
    /// Final artifact when the untranscoded original is used instead.
    /// Equal to `final_output` when not transcoding.
    pub untranscoded_output: PathBuf,
    /// Whether `final_output` is in the flat collection folder.
    pub flat: bool,
    original_covers: PathBuf,
    converted_covers: PathBuf,
}

impl DerivedPaths {
    /// Extracted cover, named after the stream's codec.
    pub fn original_cover(&self, cover: &CoverStream) -> PathBuf {
        self.original_covers
            .join(file_name(&self.stem, cover.extension()))
    }

    /// Resized cover, named after the stream's codec.
    pub fn converted_cover(&self, cover: &CoverStream) -> PathBuf {
        self.converted_covers
            .join(file_name(&self.stem, cover.extension()))
    }
}

/// Derives [`DerivedPaths`] from a track and the run's target.
#[derive(Debug, Clone)]
pub struct PathPlanner {
    layout: LibraryLayout,
    target: SyncTarget,
}

impl PathPlanner {
    pub fn new(layout: LibraryLayout, target: SyncTarget) -> Self {
        Self { layout, target }
    }

    pub fn layout(&self) -> &LibraryLayout {
        &self.layout
    }

    pub fn target(&self) -> &SyncTarget {
        &self.target
    }

    /// `{Album} {Title}` for `track`, each field sanitized on its own and
    /// the result capped to one segment.
    pub fn stem(track: &Track) -> String {
        sanitize_segment(&format!(
            "{} {}",
            sanitize_segment(&track.album),
            sanitize_segment(&track.title)
        ))
    }

    /// Plans all paths for `track`.
    ///
    /// The final output is hierarchical
    /// (`{AlbumArtist}/{Album}/{NNN} {Title}.{ext}`) only when the target
    /// asks for it and `album_artist` is known; otherwise it is flat.
    /// The result depends on nothing but the arguments.
    pub fn plan(&self, track: &Track, album_artist: Option<&str>) -> DerivedPaths {
        let stem = Self::stem(track);
        let suffix = track.suffix.as_str();
        let final_ext = if self.target.transcode {
            TRANSCODED_EXTENSION
        } else {
            suffix
        };

        let hierarchical = match album_artist {
            Some(artist) if !self.target.flat => Some(
                self.layout
                    .combined
                    .join(sanitize_segment(artist))
                    .join(sanitize_segment(&track.album)),
            ),
            _ => None,
        };

        let final_path = |ext: &str| match &hierarchical {
            Some(dir) => dir.join(file_name(
                &format!(
                    "{:03} {}",
                    track.track_position(),
                    sanitize_segment(&track.title)
                ),
                ext,
            )),
            None => self.layout.combined.join(file_name(&stem, ext)),
        };

        DerivedPaths {
            original_song: self.layout.original_songs.join(file_name(&stem, suffix)),
            converted_song: self
                .layout
                .converted_songs
                .join(file_name(&stem, TRANSCODED_EXTENSION)),
            final_output: final_path(final_ext),
            untranscoded_output: final_path(suffix),
            flat: hierarchical.is_none(),
            original_covers: self.layout.original_covers.clone(),
            converted_covers: self.layout.converted_covers.clone(),
            stem,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn track() -> Track {
        Track {
            id: "t1".to_string(),
            title: "Song: Part 1?".to_string(),
            album: "Best Of".to_string(),
            album_id: "al1".to_string(),
            artist: "Someone".to_string(),
            track_number: "7".to_string(),
            suffix: "flac".to_string(),
            size: 100,
        }
    }

    fn planner(transcode: bool, flat: bool) -> PathPlanner {
        let layout = LibraryLayout::new(Path::new("/music"), "favs", transcode);
        let target = SyncTarget {
            transcode,
            flat,
            ..Default::default()
        };
        PathPlanner::new(layout, target)
    }

    #[test]
    fn test_flat_paths() {
        let paths = planner(false, true).plan(&track(), Some("Artist"));

        assert!(paths.flat);
        assert_eq!(
            paths.original_song,
            PathBuf::from("/music/.original/songs/Best Of Song_ Part 1_.flac")
        );
        assert_eq!(
            paths.converted_song,
            PathBuf::from("/music/.converted/songs/Best Of Song_ Part 1_.mp3")
        );
        assert_eq!(
            paths.final_output,
            PathBuf::from("/music/favs/Best Of Song_ Part 1_.flac")
        );
        assert_eq!(paths.final_output, paths.untranscoded_output);
    }

    #[test]
    fn test_hierarchical_paths() {
        let paths = planner(true, false).plan(&track(), Some("AC/DC"));

        assert!(!paths.flat);
        assert_eq!(
            paths.final_output,
            PathBuf::from("/music/favs_mp3/AC_DC/Best Of/007 Song_ Part 1_.mp3")
        );
        assert_eq!(
            paths.untranscoded_output,
            PathBuf::from("/music/favs_mp3/AC_DC/Best Of/007 Song_ Part 1_.flac")
        );
    }

    #[test]
    fn test_unparsable_track_number() {
        let mut track = track();
        track.track_number = "A-side".to_string();
        let paths = planner(false, false).plan(&track, Some("Artist"));

        assert!(paths
            .final_output
            .ends_with("Artist/Best Of/000 Song_ Part 1_.flac"));
    }

    #[test]
    fn test_missing_album_artist_falls_back_to_flat() {
        let paths = planner(false, false).plan(&track(), None);
        assert!(paths.flat);
        assert_eq!(
            paths.final_output,
            PathBuf::from("/music/favs/Best Of Song_ Part 1_.flac")
        );
    }

    #[test]
    fn test_cover_paths_use_codec_extension() {
        let paths = planner(false, true).plan(&track(), None);
        let cover = CoverStream::new("mjpeg", 500);

        assert_eq!(
            paths.original_cover(&cover),
            PathBuf::from("/music/.original/covers/Best Of Song_ Part 1_.jpg")
        );
        assert_eq!(
            paths.converted_cover(&CoverStream::new("png", 500)),
            PathBuf::from("/music/.converted/covers/Best Of Song_ Part 1_.png")
        );
    }

    #[test]
    fn test_stem_sanitizes_fields_separately() {
        let cases = [
            ("", "Song", "unnamed Song"),
            ("CON", "x", "_CON x"),
            ("A", "", "A unnamed"),
            ("Vol. 2.", "Intro", "Vol. 2 Intro"),
            ("Best Of", "Song: Part 1?", "Best Of Song_ Part 1_"),
        ];
        for (album, title, expected) in cases {
            let mut track = track();
            track.album = album.to_string();
            track.title = title.to_string();
            assert_eq!(PathPlanner::stem(&track), expected, "{:?} / {:?}", album, title);
        }
    }

    #[test]
    fn test_flat_output_uses_field_wise_stem() {
        let mut track = track();
        track.album = String::new();
        let paths = planner(false, true).plan(&track, None);
        assert_eq!(
            paths.final_output,
            PathBuf::from("/music/favs/unnamed Song_ Part 1_.flac")
        );
    }

    #[test]
    fn test_hierarchical_title_is_sanitized() {
        let mut track = track();
        track.title = "Live. ".to_string();
        let paths = planner(false, false).plan(&track, Some("Artist"));
        assert_eq!(
            paths.final_output.file_name().unwrap(),
            "007 Live.flac"
        );

        track.title = String::new();
        let paths = planner(false, false).plan(&track, Some("Artist"));
        assert_eq!(
            paths.final_output.file_name().unwrap(),
            "007 unnamed.flac"
        );
    }

    #[test]
    fn test_plan_is_deterministic() {
        let planner = planner(true, false);
        let a = planner.plan(&track(), Some("Artist"));
        let b = planner.plan(&track(), Some("Artist"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_segments_stay_within_limit() {
        let mut track = track();
        track.title = "x".repeat(400);
        track.album = "é".repeat(200);
        let paths = planner(true, false).plan(&track, Some(&"a".repeat(300)));

        for path in [&paths.original_song, &paths.converted_song, &paths.final_output] {
            for segment in path.iter() {
                assert!(segment.len() <= 255, "{:?}", segment);
            }
        }
        assert!(paths.final_output.to_string_lossy().ends_with(".mp3"));
    }
}
