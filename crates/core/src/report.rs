//! Progress lines and the end-of-run summary.
//!
//! Lines are numbered in completion order: the `i` in `i/N` counts
//! finished tracks, it is not the track's position in the collection.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::catalog::Track;
use crate::decision::Stage;
use crate::sanitize::sanitize_segment;
use crate::scheduler::JobOutcome;

const NOTHING_TO_DO: &str = "nothing to do!";

/// Formats one line per finished track.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    total: usize,
    title_width: usize,
    completed: usize,
}

impl ProgressReporter {
    /// `title_width` is the longest title of the batch, in characters.
    pub fn new(total: usize, title_width: usize) -> Self {
        Self {
            total,
            title_width,
            completed: 0,
        }
    }

    /// Reporter for a batch, sized from its titles as they are printed.
    pub fn for_tracks(tracks: &[Track]) -> Self {
        let titles: Vec<String> = tracks.iter().map(|t| sanitize_segment(&t.title)).collect();
        Self::new(
            tracks.len(),
            Self::title_width(titles.iter().map(String::as_str)),
        )
    }

    /// Longest title in characters.
    pub fn title_width<'a>(titles: impl IntoIterator<Item = &'a str>) -> usize {
        titles
            .into_iter()
            .map(|t| t.chars().count())
            .max()
            .unwrap_or(0)
    }

    /// Formats the next line. Each call counts one more finished track.
    ///
    /// The title is printed sanitized, so it never spans several rows.
    pub fn line(&mut self, outcome: &JobOutcome) -> String {
        self.completed += 1;
        format!(
            "{:>6}/{} {:<width$} {}",
            self.completed,
            self.total,
            sanitize_segment(&outcome.title),
            Self::tags(outcome),
            width = self.title_width + 2
        )
    }

    /// `downloaded`, `MP3-converted` and `cover-converted` as applicable,
    /// then the failure if any; `nothing to do!` when empty.
    pub fn tags(outcome: &JobOutcome) -> String {
        let mut tags = Vec::with_capacity(4);
        if outcome.downloaded {
            tags.push("downloaded".to_string());
        }
        if outcome.transcoded {
            tags.push("MP3-converted".to_string());
        }
        if outcome.cover_converted {
            tags.push("cover-converted".to_string());
        }
        if let Some(failure) = &outcome.failure {
            tags.push(format!("failed: {}", failure));
        }

        if tags.is_empty() {
            NOTHING_TO_DO.to_string()
        } else {
            tags.join(" ")
        }
    }

    pub fn completed(&self) -> usize {
        self.completed
    }
}

/// Totals for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub collection: String,
    pub output_dir: PathBuf,
    pub total: usize,
    pub downloaded: usize,
    pub transcoded: usize,
    pub covers_converted: usize,
    pub muxed: usize,
    pub linked: usize,
    pub unchanged: usize,
    /// Tracks that finished with at least one workaround.
    pub degraded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl RunSummary {
    pub fn from_outcomes(
        collection: impl Into<String>,
        output_dir: PathBuf,
        outcomes: &[JobOutcome],
    ) -> Self {
        let count = |f: &dyn Fn(&JobOutcome) -> bool| outcomes.iter().filter(|o| f(o)).count();

        Self {
            collection: collection.into(),
            output_dir,
            total: outcomes.len(),
            downloaded: count(&|o| o.downloaded),
            transcoded: count(&|o| o.transcoded),
            covers_converted: count(&|o| o.cover_converted),
            muxed: count(&|o| o.finalized == Some(Stage::Mux)),
            linked: count(&|o| o.finalized == Some(Stage::Link)),
            unchanged: count(&|o| o.is_unchanged()),
            degraded: count(&|o| !o.degraded.is_empty()),
            failed: count(&|o| !o.is_success() && !o.is_cancelled()),
            cancelled: count(&|o| o.is_cancelled()),
        }
    }

    /// No failures and nothing cancelled.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} tracks in {}",
            self.collection,
            self.total,
            self.output_dir.display()
        )?;
        write!(
            f,
            "  downloaded {}, MP3-converted {}, cover-converted {}, unchanged {}, failed {}",
            self.downloaded, self.transcoded, self.covers_converted, self.unchanged, self.failed
        )?;
        if self.degraded > 0 {
            write!(f, ", degraded {}", self.degraded)?;
        }
        if self.cancelled > 0 {
            write!(f, ", cancelled {}", self.cancelled)?;
        }
        Ok(())
    }
}
