//! Per-track pipeline.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::StageTimeouts;
use super::types::{JobOutcome, TrackFailure};
use crate::catalog::{AlbumArtistCache, Catalog, Track};
use crate::decision::{Inspector, Stage, StageSet};
use crate::layout::{DerivedPaths, PathPlanner};
use crate::placer::FsPlacer;
use crate::transform::{CoverStream, MediaTransform};

/// Attempts per download when failures are transient.
const DOWNLOAD_ATTEMPTS: u32 = 2;

/// Everything a track task needs, shared by all tasks of a run.
pub(crate) struct TrackPipeline<C: Catalog, M: MediaTransform> {
    pub catalog: Arc<C>,
    pub transformer: Arc<M>,
    pub albums: Arc<AlbumArtistCache<C>>,
    pub planner: PathPlanner,
    pub inspector: Inspector<M>,
    pub placer: FsPlacer,
    pub timeouts: StageTimeouts,
    pub cancel: CancellationToken,
}

impl<C: Catalog, M: MediaTransform> TrackPipeline<C, M> {
    pub fn new(
        catalog: Arc<C>,
        transformer: Arc<M>,
        albums: Arc<AlbumArtistCache<C>>,
        planner: PathPlanner,
        timeouts: StageTimeouts,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inspector: Inspector::new(Arc::clone(&transformer), timeouts.probe()),
            catalog,
            transformer,
            albums,
            planner,
            placer: FsPlacer::new(),
            timeouts,
            cancel,
        }
    }

    /// Runs every stage `track` needs and reports what happened.
    pub async fn run(&self, index: usize, track: &Track) -> JobOutcome {
        let mut outcome = JobOutcome::new(index, track);
        if let Err(failure) = self.process(track, &mut outcome).await {
            if !failure.is_cancelled() {
                warn!(track_id = %track.id, title = %track.title, error = %failure, "Track failed");
            }
            outcome.failure = Some(failure);
        }
        outcome
    }

    async fn process(&self, track: &Track, outcome: &mut JobOutcome) -> Result<(), TrackFailure> {
        let target = self.planner.target();

        let album_artist = if target.flat {
            None
        } else {
            match self.album_artist(track).await {
                Ok(artist) => Some(artist),
                Err(TrackFailure::Cancelled) => return Err(TrackFailure::Cancelled),
                Err(failure) => {
                    warn!(
                        track_id = %track.id,
                        album_id = %track.album_id,
                        error = %failure,
                        "Album lookup failed, using flat layout for this track"
                    );
                    outcome.degraded.push(failure);
                    None
                }
            }
        };

        let paths = self.planner.plan(track, album_artist.as_deref());

        if self.cancellable(self.inspector.needs_download(&paths, track)).await? {
            let written = self.download(track, &paths.original_song).await?;
            info!(track_id = %track.id, bytes = written, "Downloaded");
            outcome.downloaded = true;
        }

        let probed = self
            .cancellable(self.inspector.inspect(&paths, target, outcome.downloaded))
            .await?;
        let stages = StageSet::decide(&probed, target);
        debug!(track_id = %track.id, stages = ?stages.stages(), "Decided stages");

        let mut final_output = paths.final_output.clone();
        let mut audio = if target.transcode {
            paths.converted_song.clone()
        } else {
            paths.original_song.clone()
        };

        if stages.contains(Stage::Transcode) {
            match self.transcode(&paths, target.quality).await {
                Ok(()) => {
                    info!(track_id = %track.id, quality = target.quality, "Transcoded");
                    outcome.transcoded = true;
                }
                Err(TrackFailure::Cancelled) => return Err(TrackFailure::Cancelled),
                Err(failure) => {
                    warn!(track_id = %track.id, error = %failure, "Transcode failed, keeping original audio");
                    outcome.degraded.push(failure);
                    audio = paths.original_song.clone();
                    final_output = paths.untranscoded_output.clone();
                }
            }
        }

        let mut cover_file = None;
        if let Some(stream) = &probed.cover {
            if stages.contains(Stage::CoverExtract) {
                match self.refresh_cover(&paths, stream, target.cover_size).await {
                    Ok(path) => {
                        info!(track_id = %track.id, edge = target.cover_size, "Cover converted");
                        outcome.cover_converted = true;
                        cover_file = Some(path);
                    }
                    Err(TrackFailure::Cancelled) => return Err(TrackFailure::Cancelled),
                    Err(failure) => {
                        warn!(track_id = %track.id, error = %failure, "Cover conversion failed, linking without cover");
                        outcome.degraded.push(failure);
                    }
                }
            } else {
                cover_file = Some(paths.converted_cover(stream));
            }
        }

        if stages.final_stage().is_none() {
            return Ok(());
        }

        if let Some(cover) = &cover_file {
            match self.mux(&audio, cover, &final_output).await {
                Ok(()) => {
                    outcome.finalized = Some(Stage::Mux);
                    return Ok(());
                }
                Err(TrackFailure::Cancelled) => return Err(TrackFailure::Cancelled),
                Err(failure) => {
                    warn!(track_id = %track.id, error = %failure, "Mux failed, linking without cover");
                    outcome.degraded.push(failure);
                }
            }
        }

        self.placer
            .link_or_copy(&audio, &final_output)
            .await
            .map_err(|e| TrackFailure::io(Stage::Link, e))?;
        outcome.finalized = Some(Stage::Link);

        Ok(())
    }

    /// Downloads `track`, retrying once when the catalog reports a
    /// transient failure. Each attempt gets the full download deadline.
    async fn download(&self, track: &Track, dest: &Path) -> Result<u64, TrackFailure> {
        let mut attempt = 1;
        loop {
            let result = self
                .guarded(
                    Stage::Download.as_str(),
                    self.timeouts.download(),
                    self.catalog.download(track, dest),
                )
                .await?;
            match result {
                Ok(written) => return Ok(written),
                Err(e) if e.is_retryable() && attempt < DOWNLOAD_ATTEMPTS => {
                    warn!(track_id = %track.id, attempt, error = %e, "Download failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(TrackFailure::io(Stage::Download, e)),
            }
        }
    }

    async fn album_artist(&self, track: &Track) -> Result<String, TrackFailure> {
        if track.album_id.is_empty() {
            return Err(TrackFailure::Catalog("track has no album id".to_string()));
        }
        self.guarded(
            "album lookup",
            self.timeouts.catalog(),
            self.albums.artist(&track.album_id),
        )
        .await?
        .map_err(|e| TrackFailure::Catalog(e.to_string()))
    }

    /// Transcodes into a temp file and commits it, so an interrupted
    /// transcode never leaves a tagged but truncated converted song.
    async fn transcode(&self, paths: &DerivedPaths, quality: u8) -> Result<(), TrackFailure> {
        let staged = FsPlacer::temp_path(&paths.converted_song);
        let result = self
            .guarded(
                Stage::Transcode.as_str(),
                self.timeouts.transcode(),
                self.transformer
                    .transcode_audio(&paths.original_song, &staged, quality),
            )
            .await
            .and_then(|r| r.map_err(|e| TrackFailure::transform(Stage::Transcode, e)));

        self.commit_or_discard(result, &staged, &paths.converted_song, Stage::Transcode)
            .await
    }

    /// Extracts the embedded cover and scales it to `edge`.
    async fn refresh_cover(
        &self,
        paths: &DerivedPaths,
        stream: &CoverStream,
        edge: u32,
    ) -> Result<PathBuf, TrackFailure> {
        let original = paths.original_cover(stream);
        self.guarded(
            Stage::CoverExtract.as_str(),
            self.timeouts.cover(),
            self.transformer
                .extract_cover(&paths.original_song, &original),
        )
        .await?
        .map_err(|e| TrackFailure::transform(Stage::CoverExtract, e))?;

        let converted = paths.converted_cover(stream);
        let staged = FsPlacer::temp_path(&converted);
        let result = self
            .guarded(
                Stage::CoverExtract.as_str(),
                self.timeouts.cover(),
                self.transformer.resize_cover(&original, &staged, edge),
            )
            .await
            .and_then(|r| r.map_err(|e| TrackFailure::transform(Stage::CoverExtract, e)));

        self.commit_or_discard(result, &staged, &converted, Stage::CoverExtract)
            .await?;
        Ok(converted)
    }

    async fn mux(&self, audio: &Path, cover: &Path, dest: &Path) -> Result<(), TrackFailure> {
        self.placer
            .ensure_parent_dirs(dest)
            .await
            .map_err(|e| TrackFailure::io(Stage::Mux, e))?;

        let staged = FsPlacer::temp_path(dest);
        let result = self
            .guarded(
                Stage::Mux.as_str(),
                self.timeouts.mux(),
                self.transformer.mux_cover(audio, cover, &staged),
            )
            .await
            .and_then(|r| r.map_err(|e| TrackFailure::transform(Stage::Mux, e)));

        self.commit_or_discard(result, &staged, dest, Stage::Mux)
            .await
    }

    /// Renames `staged` over `dest` on success, removes it otherwise.
    async fn commit_or_discard(
        &self,
        result: Result<(), TrackFailure>,
        staged: &Path,
        dest: &Path,
        stage: Stage,
    ) -> Result<(), TrackFailure> {
        match result {
            Ok(()) => self
                .placer
                .commit(staged, dest)
                .await
                .map_err(|e| TrackFailure::io(stage, e)),
            Err(failure) => {
                if let Err(e) = self.placer.remove_if_exists(staged).await {
                    warn!(path = %staged.display(), error = %e, "Failed to remove partial output");
                }
                Err(failure)
            }
        }
    }

    /// Races `fut` against the run's cancellation and a deadline.
    async fn guarded<T>(
        &self,
        operation: &'static str,
        limit: Duration,
        fut: impl Future<Output = T>,
    ) -> Result<T, TrackFailure> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TrackFailure::Cancelled),
            result = tokio::time::timeout(limit, fut) => result.map_err(|_| TrackFailure::Timeout {
                operation,
                secs: limit.as_secs(),
            }),
        }
    }

    /// Races `fut` against the run's cancellation only.
    async fn cancellable<T>(&self, fut: impl Future<Output = T>) -> Result<T, TrackFailure> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TrackFailure::Cancelled),
            value = fut => Ok(value),
        }
    }
}
