use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::scheduler::{SchedulerConfig, StageTimeouts};
use crate::target::SyncTarget;
use crate::transform::TransformerConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub converter: TransformerConfig,
    #[serde(default)]
    pub timeouts: StageTimeouts,
}

impl Config {
    /// Scheduler settings for this configuration.
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig::default()
            .with_concurrency(self.sync.concurrency)
            .with_timeouts(self.timeouts.clone())
    }
}

/// Subsonic server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server base URL, with or without the trailing `/rest`.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Send the password in clear (`p=`) instead of a salted token.
    #[serde(default)]
    pub legacy_auth: bool,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            password: String::new(),
            legacy_auth: false,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// What to sync and how
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Cover edge length in pixels.
    #[serde(default = "default_cover_size")]
    pub cover_size: u32,
    #[serde(default)]
    pub flat: bool,
    #[serde(default)]
    pub transcode: bool,
    /// LAME VBR quality, 0 (best) to 9.
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// Playlist id; favorites when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            concurrency: default_concurrency(),
            cover_size: default_cover_size(),
            flat: false,
            transcode: false,
            quality: default_quality(),
            playlist: None,
        }
    }
}

impl SyncConfig {
    /// The run-wide target state derived from these settings.
    pub fn target(&self) -> SyncTarget {
        SyncTarget {
            transcode: self.transcode,
            quality: self.quality,
            cover_size: self.cover_size,
            flat: self.flat,
        }
    }
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("./sonicsync_songs")
}

fn default_concurrency() -> usize {
    5
}

fn default_cover_size() -> u32 {
    150
}

fn default_quality() -> u8 {
    2
}

/// Sanitized config for logging (password redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: SanitizedServerConfig,
    pub sync: SyncConfig,
    pub converter: TransformerConfig,
    pub timeouts: StageTimeouts,
}

/// Sanitized server config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServerConfig {
    pub url: String,
    pub user: String,
    pub password_configured: bool,
    pub legacy_auth: bool,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: SanitizedServerConfig {
                url: config.server.url.clone(),
                user: config.server.user.clone(),
                password_configured: !config.server.password.is_empty(),
                legacy_auth: config.server.legacy_auth,
                timeout_secs: config.server.timeout_secs,
            },
            sync: config.sync.clone(),
            converter: config.converter.clone(),
            timeouts: config.timeouts.clone(),
        }
    }
}
