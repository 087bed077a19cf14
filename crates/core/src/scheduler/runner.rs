//! Bounded-concurrency execution of track pipelines.

use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::SchedulerConfig;
use super::pipeline::TrackPipeline;
use super::types::{JobOutcome, TrackFailure};
use crate::catalog::{AlbumArtistCache, Catalog, Track};
use crate::layout::PathPlanner;
use crate::transform::MediaTransform;

/// Runs one pipeline per track with at most `concurrency` in flight.
pub struct SyncScheduler<C: Catalog, M: MediaTransform> {
    config: SchedulerConfig,
    catalog: Arc<C>,
    transformer: Arc<M>,
    albums: Arc<AlbumArtistCache<C>>,
    planner: PathPlanner,
    cancel: CancellationToken,
}

impl<C: Catalog + 'static, M: MediaTransform + 'static> SyncScheduler<C, M> {
    /// Creates a new scheduler.
    pub fn new(
        config: SchedulerConfig,
        catalog: Arc<C>,
        transformer: Arc<M>,
        planner: PathPlanner,
    ) -> Self {
        Self {
            albums: Arc::new(AlbumArtistCache::new(Arc::clone(&catalog))),
            config,
            catalog,
            transformer,
            planner,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `token` to cancel the run.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Album artists looked up so far.
    pub fn album_cache(&self) -> &AlbumArtistCache<C> {
        &self.albums
    }

    /// Processes every track and returns their outcomes in completion
    /// order, calling `on_outcome` as each one arrives.
    ///
    /// Exactly one outcome is produced per track, including tracks whose
    /// task failed, panicked or was cancelled. When an outcome is passed to
    /// `on_outcome` its task has already finished.
    pub async fn run<F>(&self, tracks: Vec<Track>, mut on_outcome: F) -> Vec<JobOutcome>
    where
        F: FnMut(&JobOutcome),
    {
        let total = tracks.len();
        warn_on_collisions(&tracks);

        let permits = self.config.concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(permits));
        let pipeline = Arc::new(TrackPipeline::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.transformer),
            Arc::clone(&self.albums),
            self.planner.clone(),
            self.config.timeouts.clone(),
            self.cancel.clone(),
        ));

        info!(tracks = total, concurrency = permits, "Starting sync");

        let mut tasks = JoinSet::new();
        let mut pending = HashMap::with_capacity(total);

        for (index, track) in tracks.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let pipeline = Arc::clone(&pipeline);
            let cancel = self.cancel.clone();
            let identity = (index, track.id.clone(), track.title.clone());

            let handle = tasks.spawn(async move {
                // held for the whole pipeline, released on drop
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return JobOutcome::failed(index, &track, TrackFailure::Cancelled);
                    }
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return JobOutcome::failed(index, &track, TrackFailure::Cancelled),
                    },
                };

                match AssertUnwindSafe(pipeline.run(index, &track))
                    .catch_unwind()
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(panic) => JobOutcome::failed(
                        index,
                        &track,
                        TrackFailure::Panicked(panic_message(panic.as_ref())),
                    ),
                }
            });
            pending.insert(handle.id(), identity);
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next_with_id().await {
            let outcome = match joined {
                Ok((id, outcome)) => {
                    pending.remove(&id);
                    outcome
                }
                Err(e) => {
                    let failure = if e.is_cancelled() {
                        TrackFailure::Cancelled
                    } else {
                        TrackFailure::Panicked(e.to_string())
                    };
                    match pending.remove(&e.id()) {
                        Some((index, track_id, title)) => {
                            let mut outcome = JobOutcome::for_parts(index, track_id, title);
                            outcome.failure = Some(failure);
                            outcome
                        }
                        None => {
                            warn!(error = %e, "Join error for unknown task");
                            continue;
                        }
                    }
                }
            };

            debug!(index = outcome.index, track_id = %outcome.track_id, "Track finished");
            on_outcome(&outcome);
            outcomes.push(outcome);
        }

        info!(
            tracks = total,
            failed = outcomes.iter().filter(|o| !o.is_success()).count(),
            "Sync finished"
        );

        outcomes
    }
}

/// Warns about tracks that will share intermediate files.
fn warn_on_collisions(tracks: &[Track]) {
    let mut seen: HashMap<String, &Track> = HashMap::new();
    for track in tracks {
        let stem = PathPlanner::stem(track);
        if let Some(first) = seen.get(&stem) {
            warn!(
                first = %first.id,
                second = %track.id,
                name = %stem,
                "Tracks share album and title and will overwrite each other's files"
            );
        } else {
            seen.insert(stem, track);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
