//! Configuration for the scheduler module.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-stage deadlines, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTimeouts {
    /// Album lookups against the catalog.
    #[serde(default = "default_catalog_secs")]
    pub catalog_secs: u64,

    /// Raw track downloads.
    #[serde(default = "default_download_secs")]
    pub download_secs: u64,

    /// ffprobe calls.
    #[serde(default = "default_probe_secs")]
    pub probe_secs: u64,

    /// MP3 transcoding.
    #[serde(default = "default_transcode_secs")]
    pub transcode_secs: u64,

    /// Cover extraction and resizing.
    #[serde(default = "default_cover_secs")]
    pub cover_secs: u64,

    /// Attaching the cover to the final artifact.
    #[serde(default = "default_mux_secs")]
    pub mux_secs: u64,
}

fn default_catalog_secs() -> u64 {
    30
}

fn default_download_secs() -> u64 {
    600
}

fn default_probe_secs() -> u64 {
    30
}

fn default_transcode_secs() -> u64 {
    600
}

fn default_cover_secs() -> u64 {
    60
}

fn default_mux_secs() -> u64 {
    120
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            catalog_secs: default_catalog_secs(),
            download_secs: default_download_secs(),
            probe_secs: default_probe_secs(),
            transcode_secs: default_transcode_secs(),
            cover_secs: default_cover_secs(),
            mux_secs: default_mux_secs(),
        }
    }
}

impl StageTimeouts {
    /// The same deadline for every stage.
    pub fn uniform(secs: u64) -> Self {
        Self {
            catalog_secs: secs,
            download_secs: secs,
            probe_secs: secs,
            transcode_secs: secs,
            cover_secs: secs,
            mux_secs: secs,
        }
    }

    pub fn catalog(&self) -> Duration {
        Duration::from_secs(self.catalog_secs)
    }

    pub fn download(&self) -> Duration {
        Duration::from_secs(self.download_secs)
    }

    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub fn transcode(&self) -> Duration {
        Duration::from_secs(self.transcode_secs)
    }

    pub fn cover(&self) -> Duration {
        Duration::from_secs(self.cover_secs)
    }

    pub fn mux(&self) -> Duration {
        Duration::from_secs(self.mux_secs)
    }

    /// Named values, for validation messages.
    pub fn entries(&self) -> [(&'static str, u64); 6] {
        [
            ("catalog_secs", self.catalog_secs),
            ("download_secs", self.download_secs),
            ("probe_secs", self.probe_secs),
            ("transcode_secs", self.transcode_secs),
            ("cover_secs", self.cover_secs),
            ("mux_secs", self.mux_secs),
        ]
    }
}

/// Configuration for a scheduler run.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum tracks processed at once.
    pub concurrency: usize,

    /// Per-stage deadlines.
    pub timeouts: StageTimeouts,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            timeouts: StageTimeouts::default(),
        }
    }
}

impl SchedulerConfig {
    /// Sets the number of permits.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the stage deadlines.
    pub fn with_timeouts(mut self, timeouts: StageTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.timeouts.download(), Duration::from_secs(600));
    }

    #[test]
    fn test_config_builder() {
        let config = SchedulerConfig::default()
            .with_concurrency(2)
            .with_timeouts(StageTimeouts::uniform(1));

        assert_eq!(config.concurrency, 2);
        assert_eq!(config.timeouts.mux(), Duration::from_secs(1));
        assert!(config.timeouts.entries().iter().all(|(_, secs)| *secs == 1));
    }

    #[test]
    fn test_partial_timeouts_from_toml() {
        let timeouts: StageTimeouts = toml::from_str("probe_secs = 5").unwrap();
        assert_eq!(timeouts.probe_secs, 5);
        assert_eq!(timeouts.catalog_secs, 30);
    }
}
