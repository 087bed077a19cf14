//! Async probing of on-disk artifacts.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::rules::{self, ProbedState};
use crate::catalog::Track;
use crate::layout::DerivedPaths;
use crate::target::SyncTarget;
use crate::transform::{MediaTransform, TransformError};

/// Gathers the [`ProbedState`] of a track.
///
/// Every probe fails open: errors and timeouts are logged and reported as
/// "absent", so the corresponding stage is redone.
pub struct Inspector<M: MediaTransform> {
    transformer: Arc<M>,
    probe_timeout: Duration,
}

impl<M: MediaTransform> Inspector<M> {
    pub fn new(transformer: Arc<M>, probe_timeout: Duration) -> Self {
        Self {
            transformer,
            probe_timeout,
        }
    }

    /// Size of `path` if it is a regular file.
    pub async fn file_size(path: &Path) -> Option<u64> {
        match tokio::fs::metadata(path).await {
            Ok(m) if m.is_file() => Some(m.len()),
            _ => None,
        }
    }

    /// Whether the original song for `track` is missing or has the wrong
    /// size.
    pub async fn needs_download(&self, paths: &DerivedPaths, track: &Track) -> bool {
        let observed = Self::file_size(&paths.original_song).await;
        let needed = rules::needs_download(observed, track.size);
        debug!(
            track_id = %track.id,
            ?observed,
            expected = track.size,
            needed,
            "Download check"
        );
        needed
    }

    /// Probes everything past the download.
    ///
    /// `downloaded` says whether the original was fetched in this run; if
    /// so the derived artifacts are stale and are not probed at all.
    pub async fn inspect(
        &self,
        paths: &DerivedPaths,
        target: &SyncTarget,
        downloaded: bool,
    ) -> ProbedState {
        let cover = self
            .probe("cover", &paths.original_song, |p| {
                self.transformer.probe_cover(p)
            })
            .await
            .flatten();

        let converted_quality = if target.transcode && !downloaded {
            self.probe_existing("quality tag", &paths.converted_song, |p| {
                self.transformer.probe_quality_tag(p)
            })
            .await
        } else {
            None
        };

        let converted_cover_width = match (&cover, downloaded) {
            (Some(stream), false) => {
                let converted = paths.converted_cover(stream);
                self.probe_existing("converted cover", &converted, |p| {
                    self.transformer.probe_cover(p)
                })
                .await
                .map(|c| c.width)
            }
            _ => None,
        };

        let final_output_exists = Self::file_size(&paths.final_output).await.is_some();

        let state = ProbedState {
            downloaded,
            converted_quality,
            cover,
            converted_cover_width,
            final_output_exists,
        };
        debug!(stem = %paths.stem, ?state, "Probed");
        state
    }

    /// Probes `path` only if it exists; `None` covers both absence and a
    /// failed or empty probe.
    async fn probe_existing<'a, T, F, Fut>(&self, what: &str, path: &'a Path, f: F) -> Option<T>
    where
        F: FnOnce(&'a Path) -> Fut,
        Fut: Future<Output = Result<Option<T>, TransformError>>,
    {
        if Self::file_size(path).await.is_none() {
            return None;
        }
        self.probe(what, path, f).await.flatten()
    }

    async fn probe<'a, T, F, Fut>(&self, what: &str, path: &'a Path, f: F) -> Option<T>
    where
        F: FnOnce(&'a Path) -> Fut,
        Fut: Future<Output = Result<T, TransformError>>,
    {
        match tokio::time::timeout(self.probe_timeout, f(path)).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(path = %path.display(), error = %e, "Failed to probe {}, treating as absent", what);
                None
            }
            Err(_) => {
                warn!(
                    path = %path.display(),
                    timeout_secs = self.probe_timeout.as_secs(),
                    "Timed out probing {}, treating as absent",
                    what
                );
                None
            }
        }
    }
}
