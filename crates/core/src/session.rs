//! One sync run, from fetching the collection to the summary.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::catalog::{Catalog, CatalogError};
use crate::layout::{LayoutError, LibraryLayout, PathPlanner};
use crate::report::{ProgressReporter, RunSummary};
use crate::scheduler::{SchedulerConfig, SyncScheduler};
use crate::target::SyncTarget;
use crate::transform::MediaTransform;

/// Errors that stop a run before any track is processed.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(#[from] CatalogError),

    #[error("Failed to set up library: {0}")]
    FilesystemSetup(#[from] LayoutError),
}

/// Wires the catalog, the layout and the scheduler together for one run.
pub struct SyncSession<C: Catalog, M: MediaTransform> {
    catalog: Arc<C>,
    transformer: Arc<M>,
    root: PathBuf,
    target: SyncTarget,
    scheduler: SchedulerConfig,
    cancel: CancellationToken,
}

impl<C: Catalog + 'static, M: MediaTransform + 'static> SyncSession<C, M> {
    pub fn new(
        catalog: Arc<C>,
        transformer: Arc<M>,
        root: impl Into<PathBuf>,
        target: SyncTarget,
        scheduler: SchedulerConfig,
    ) -> Self {
        Self {
            catalog,
            transformer,
            root: root.into(),
            target,
            scheduler,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `token` to cancel the run.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Syncs the playlist `playlist`, or the favorites when `None`.
    ///
    /// `on_line` receives one progress line per finished track. Track
    /// failures end up in the summary; only a missing collection or an
    /// unusable root directory is an error.
    pub async fn run<F>(&self, playlist: Option<&str>, mut on_line: F) -> Result<RunSummary, SyncError>
    where
        F: FnMut(&str),
    {
        let collection = self
            .catalog
            .get_collection(playlist)
            .await
            .map_err(|e| {
                error!(catalog = self.catalog.name(), error = %e, "Failed to fetch collection");
                SyncError::CatalogUnavailable(e)
            })?;

        info!(
            collection = %collection.name,
            tracks = collection.tracks.len(),
            "Fetched collection"
        );

        let layout = LibraryLayout::prepare(&self.root, &collection.name, self.target.transcode)
            .await
            .map_err(|e| {
                error!(root = %self.root.display(), error = %e, "Failed to prepare library");
                SyncError::FilesystemSetup(e)
            })?;
        let output_dir = layout.combined.clone();

        let mut reporter = ProgressReporter::for_tracks(&collection.tracks);
        let scheduler = SyncScheduler::new(
            self.scheduler.clone(),
            Arc::clone(&self.catalog),
            Arc::clone(&self.transformer),
            PathPlanner::new(layout, self.target.clone()),
        )
        .with_cancellation(self.cancel.clone());

        let outcomes = scheduler
            .run(collection.tracks, |outcome| on_line(&reporter.line(outcome)))
            .await;

        let summary = RunSummary::from_outcomes(collection.name, output_dir, &outcomes);
        info!(
            total = summary.total,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Run complete"
        );

        Ok(summary)
    }
}
