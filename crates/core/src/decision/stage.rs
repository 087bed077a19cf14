//! Pipeline stages and the ordered set chosen for a track.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::rules::{self, ProbedState};
use crate::target::SyncTarget;

/// One step of a track's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Download,
    Transcode,
    CoverExtract,
    Mux,
    Link,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Transcode => "transcode",
            Self::CoverExtract => "cover_extract",
            Self::Mux => "mux",
            Self::Link => "link",
        }
    }

    /// Whether this stage produces the final artifact.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Mux | Self::Link)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stages a track needs, always in pipeline order:
/// Download, Transcode, CoverExtract, then one of Mux or Link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageSet {
    stages: Vec<Stage>,
}

impl StageSet {
    /// Chooses the stages for a track from its probed state.
    ///
    /// The final stage is only scheduled when the final artifact is missing
    /// or something upstream of it is being redone, so a track that is
    /// already in its target state gets an empty set.
    pub fn decide(probed: &ProbedState, target: &SyncTarget) -> Self {
        let mut stages = Vec::with_capacity(4);

        if probed.downloaded {
            stages.push(Stage::Download);
        }

        if target.transcode
            && rules::needs_transcode(
                probed.converted_quality.as_deref(),
                target,
                probed.downloaded,
            )
        {
            stages.push(Stage::Transcode);
        }

        if probed.cover.is_some()
            && rules::needs_cover_refresh(
                probed.converted_cover_width,
                target.cover_size,
                probed.downloaded,
            )
        {
            stages.push(Stage::CoverExtract);
        }

        if !stages.is_empty() || !probed.final_output_exists {
            stages.push(rules::final_stage(probed.cover.as_ref()));
        }

        Self { stages }
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Mux or Link, if the final artifact is to be (re)built.
    pub fn final_stage(&self) -> Option<Stage> {
        self.stages.iter().copied().find(Stage::is_final)
    }
}
