//! Types for the scheduler module.

use thiserror::Error;

use crate::catalog::Track;
use crate::decision::Stage;

/// Why a track, or part of its pipeline, did not go as planned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackFailure {
    /// Filesystem or transfer error.
    #[error("{stage} failed: {reason}")]
    Io { stage: Stage, reason: String },

    /// The media transform service failed.
    #[error("{stage} failed: {reason}")]
    Transform { stage: Stage, reason: String },

    /// An operation exceeded its deadline.
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    /// Album lookup failed.
    #[error("album lookup failed: {0}")]
    Catalog(String),

    /// The run was cancelled before the track finished.
    #[error("cancelled")]
    Cancelled,

    /// The track's task panicked.
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TrackFailure {
    pub fn io(stage: Stage, reason: impl ToString) -> Self {
        Self::Io {
            stage,
            reason: reason.to_string(),
        }
    }

    pub fn transform(stage: Stage, reason: impl ToString) -> Self {
        Self::Transform {
            stage,
            reason: reason.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// The result of one track's pipeline.
///
/// Exactly one is produced per submitted track, whatever happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    /// Position of the track in the submitted batch.
    pub index: usize,
    pub track_id: String,
    pub title: String,
    pub downloaded: bool,
    pub transcoded: bool,
    pub cover_converted: bool,
    /// The stage that wrote the final artifact, if one ran.
    pub finalized: Option<Stage>,
    /// Set when the track could not be brought to any usable state.
    pub failure: Option<TrackFailure>,
    /// Problems the pipeline worked around.
    pub degraded: Vec<TrackFailure>,
}

impl JobOutcome {
    pub fn new(index: usize, track: &Track) -> Self {
        Self::for_parts(index, track.id.clone(), track.title.clone())
    }

    pub(crate) fn for_parts(index: usize, track_id: String, title: String) -> Self {
        Self {
            index,
            track_id,
            title,
            downloaded: false,
            transcoded: false,
            cover_converted: false,
            finalized: None,
            failure: None,
            degraded: Vec::new(),
        }
    }

    pub fn failed(index: usize, track: &Track, failure: TrackFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new(index, track)
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn is_cancelled(&self) -> bool {
        self.failure.as_ref().map_or(false, TrackFailure::is_cancelled)
    }

    /// Whether no reportable work was done.
    pub fn is_unchanged(&self) -> bool {
        self.is_success() && !self.downloaded && !self.transcoded && !self.cover_converted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Track {
        Track {
            id: "t1".to_string(),
            title: "Title".to_string(),
            album: String::new(),
            album_id: String::new(),
            artist: String::new(),
            track_number: String::new(),
            suffix: "mp3".to_string(),
            size: 1,
        }
    }

    #[test]
    fn test_failure_display() {
        assert_eq!(
            TrackFailure::io(Stage::Download, "connection reset").to_string(),
            "download failed: connection reset"
        );
        assert_eq!(
            TrackFailure::Timeout {
                operation: "transcode",
                secs: 10
            }
            .to_string(),
            "transcode timed out after 10s"
        );
    }

    #[test]
    fn test_outcome_state() {
        let outcome = JobOutcome::new(3, &track());
        assert_eq!(outcome.index, 3);
        assert!(outcome.is_unchanged());

        let failed = JobOutcome::failed(0, &track(), TrackFailure::Cancelled);
        assert!(!failed.is_success());
        assert!(failed.is_cancelled());
        assert!(!failed.is_unchanged());
    }
}
