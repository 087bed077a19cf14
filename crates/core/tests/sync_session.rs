//! End-to-end sync runs against the mock catalog and transformer.
//!
//! Each test drives a full session: fetch the collection, prepare the
//! library, run every track and collect the progress lines.

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use sonicsync_core::{
    testing::{fixtures, MockCatalog, MockTransformer},
    transform::TransformOp,
    LibraryLayout, PathPlanner, RunSummary, SchedulerConfig, SyncError, SyncSession, SyncTarget,
};

struct TestHarness {
    catalog: Arc<MockCatalog>,
    transformer: Arc<MockTransformer>,
    temp_dir: TempDir,
}

impl TestHarness {
    async fn new(tracks: usize) -> Self {
        let catalog = Arc::new(MockCatalog::new());
        catalog.set_collection(fixtures::favorites(tracks)).await;
        catalog.set_album_artist("album-test-album", "Test Artist").await;

        let transformer = Arc::new(MockTransformer::new());
        transformer.set_source_cover(Some(fixtures::cover())).await;

        Self {
            catalog,
            transformer,
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    async fn run(&self, target: SyncTarget, concurrency: usize) -> (RunSummary, Vec<String>) {
        let session = SyncSession::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.transformer),
            self.root(),
            target,
            SchedulerConfig::default().with_concurrency(concurrency),
        );

        let mut lines = Vec::new();
        let summary = session
            .run(None, |line| lines.push(line.to_string()))
            .await
            .expect("sync failed");
        (summary, lines)
    }
}

fn mp3_target(quality: u8) -> SyncTarget {
    SyncTarget {
        transcode: true,
        quality,
        cover_size: 150,
        flat: false,
    }
}

#[tokio::test]
async fn test_fresh_library_downloads_everything() {
    let harness = TestHarness::new(3).await;
    let combined = harness.root().join("favs");
    let original_songs = harness.root().join(".original/songs");

    let session = SyncSession::new(
        Arc::clone(&harness.catalog),
        Arc::clone(&harness.transformer),
        harness.root(),
        SyncTarget::default(),
        SchedulerConfig::default().with_concurrency(2),
    );

    let mut lines = Vec::new();
    let summary = session
        .run(None, |line| {
            // directories must exist before anything is reported
            assert!(combined.is_dir());
            assert!(original_songs.is_dir());
            lines.push(line.to_string());
        })
        .await
        .unwrap();

    assert_eq!(lines.len(), 3);
    for line in &lines {
        assert!(line.contains("downloaded"), "unexpected line: {}", line);
    }
    assert_eq!(summary.total, 3);
    assert_eq!(summary.downloaded, 3);
    assert_eq!(summary.muxed, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.output_dir, combined);
    assert!(combined
        .join("Test Artist/Test Album/001 Song 1.flac")
        .is_file());
}

#[tokio::test]
async fn test_progress_lines_count_completions() {
    let harness = TestHarness::new(3).await;
    let (_, lines) = harness.run(SyncTarget::default(), 1).await;

    assert!(lines[0].starts_with("     1/3 "));
    assert!(lines[1].starts_with("     2/3 "));
    assert!(lines[2].starts_with("     3/3 "));
}

#[tokio::test]
async fn test_second_run_has_nothing_to_do() {
    let harness = TestHarness::new(2).await;
    harness.run(mp3_target(2), 2).await;

    harness.transformer.clear_calls().await;
    let downloads_before = harness.catalog.downloads().await;

    let (summary, lines) = harness.run(mp3_target(2), 2).await;

    for line in &lines {
        assert!(line.ends_with("nothing to do!"), "unexpected line: {}", line);
    }
    assert_eq!(summary.unchanged, 2);
    assert_eq!(harness.transformer.write_calls().await, 0);
    assert_eq!(harness.catalog.downloads().await, downloads_before);
}

#[tokio::test]
async fn test_quality_change_retranscodes_once() {
    let harness = TestHarness::new(1).await;
    harness.run(mp3_target(2), 1).await;
    harness.transformer.clear_calls().await;

    let (summary, lines) = harness.run(mp3_target(5), 1).await;

    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with(" MP3-converted"), "unexpected line: {}", lines[0]);
    assert_eq!(summary.transcoded, 1);

    let transcodes: Vec<_> = harness
        .transformer
        .calls()
        .await
        .into_iter()
        .filter(|c| c.op == TransformOp::Transcode)
        .collect();
    assert_eq!(transcodes.len(), 1);
    assert_eq!(transcodes[0].param, Some(5));
    assert_eq!(harness.transformer.calls_for(TransformOp::ResizeCover).await, 0);
}

#[tokio::test]
async fn test_cover_size_change_only_refreshes_cover() {
    let harness = TestHarness::new(1).await;
    harness.run(SyncTarget::default(), 1).await;
    harness.transformer.clear_calls().await;

    let target = SyncTarget {
        cover_size: 300,
        ..Default::default()
    };
    let (_, lines) = harness.run(target, 1).await;

    assert!(lines[0].ends_with(" cover-converted"), "unexpected line: {}", lines[0]);
    assert_eq!(harness.transformer.calls_for(TransformOp::ResizeCover).await, 1);
    assert_eq!(harness.transformer.calls_for(TransformOp::Mux).await, 1);
}

#[tokio::test]
async fn test_truncated_original_is_downloaded_again() {
    let harness = TestHarness::new(1).await;
    harness.run(SyncTarget::default(), 1).await;

    let layout = LibraryLayout::new(harness.root(), "favs", false);
    let tracks = fixtures::tracks(1);
    let track = &tracks[0];
    let paths = PathPlanner::new(layout, SyncTarget::default()).plan(track, Some("Test Artist"));
    tokio::fs::write(&paths.original_song, b"short").await.unwrap();

    let (_, lines) = harness.run(SyncTarget::default(), 1).await;

    assert!(lines[0].contains("downloaded cover-converted"), "unexpected line: {}", lines[0]);
    assert_eq!(
        tokio::fs::metadata(&paths.original_song).await.unwrap().len(),
        track.size
    );
}

#[tokio::test]
async fn test_missing_final_output_is_rebuilt_quietly() {
    let harness = TestHarness::new(1).await;
    harness.run(SyncTarget::default(), 1).await;

    let final_output = harness
        .root()
        .join("favs/Test Artist/Test Album/001 Song 1.flac");
    tokio::fs::remove_file(&final_output).await.unwrap();
    harness.transformer.clear_calls().await;

    let (summary, lines) = harness.run(SyncTarget::default(), 1).await;

    assert!(lines[0].ends_with("nothing to do!"));
    assert_eq!(summary.muxed, 1);
    assert!(final_output.is_file());
    assert_eq!(harness.transformer.calls_for(TransformOp::Mux).await, 1);
}

#[tokio::test]
async fn test_playlist_name_sets_output_dir() {
    let harness = TestHarness::new(0).await;
    let mut collection = fixtures::favorites(1);
    collection.name = "Road Trip: 2024".to_string();
    harness.catalog.set_collection(collection).await;

    let (summary, _) = harness.run(mp3_target(2), 1).await;

    assert_eq!(summary.collection, "Road Trip: 2024");
    assert_eq!(summary.output_dir, harness.root().join("Road Trip_ 2024_mp3"));
    assert!(summary.output_dir.is_dir());
}

#[tokio::test]
async fn test_failed_tracks_do_not_fail_the_run() {
    let harness = TestHarness::new(3).await;
    harness.catalog.fail_download("t2").await;

    let (summary, lines) = harness.run(SyncTarget::default(), 3).await;

    assert_eq!(lines.len(), 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.downloaded, 2);
    assert_eq!(
        lines.iter().filter(|l| l.contains("failed: download failed")).count(),
        1
    );
}

#[tokio::test]
async fn test_catalog_failure_is_fatal() {
    let harness = TestHarness::new(1).await;
    harness.catalog.fail_collection().await;

    let session = SyncSession::new(
        Arc::clone(&harness.catalog),
        Arc::clone(&harness.transformer),
        harness.root(),
        SyncTarget::default(),
        SchedulerConfig::default(),
    );
    let mut lines = 0;
    let result = session.run(None, |_| lines += 1).await;

    assert!(matches!(result, Err(SyncError::CatalogUnavailable(_))));
    assert_eq!(lines, 0);
    assert!(!harness.root().join("favs").exists());
}

#[tokio::test]
async fn test_unusable_root_is_fatal() {
    let harness = TestHarness::new(1).await;
    let root = harness.root().join("file");
    tokio::fs::write(&root, b"in the way").await.unwrap();

    let session = SyncSession::new(
        Arc::clone(&harness.catalog),
        Arc::clone(&harness.transformer),
        &root,
        SyncTarget::default(),
        SchedulerConfig::default(),
    );
    let result = session.run(None, |_| {}).await;

    assert!(matches!(result, Err(SyncError::FilesystemSetup(_))));
    assert_eq!(harness.catalog.downloads().await, 0);
}
