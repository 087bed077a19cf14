//! Command line flags and their mapping onto the configuration layers.

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

/// Mirror a Subsonic playlist or your favorites to a local music folder.
#[derive(Parser, Debug, Default)]
#[command(name = "sonicsync")]
#[command(version)]
pub struct Args {
    /// TOML configuration file
    #[arg(long, env = "SONICSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subsonic server URL
    #[arg(long)]
    pub url: Option<String>,

    /// Subsonic user name
    #[arg(long)]
    pub user: Option<String>,

    /// Subsonic password
    #[arg(long = "pass")]
    pub password: Option<String>,

    /// Send the password in clear instead of a salted token
    #[arg(long)]
    pub legacy_auth: bool,

    /// Playlist id to sync (default: starred songs)
    #[arg(long)]
    pub playlist: Option<String>,

    /// Root directory of the local library
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Tracks processed at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Edge length of embedded covers, in pixels
    #[arg(long)]
    pub cover_size: Option<u32>,

    /// Put every song directly in the collection folder
    #[arg(long)]
    pub flat: bool,

    /// Transcode songs to MP3
    #[arg(long)]
    pub mp3: bool,

    /// LAME VBR quality for --mp3, 0 (best) to 9
    #[arg(long)]
    pub quality: Option<u8>,

    /// Path to the ffmpeg binary
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,

    /// Path to the ffprobe binary
    #[arg(long)]
    pub ffprobe: Option<PathBuf>,
}

/// The topmost configuration layer. Flags that were not given are left
/// out so lower layers keep their values.
#[derive(Debug, Default, Serialize)]
pub struct Overrides {
    server: ServerOverrides,
    sync: SyncOverrides,
    converter: ConverterOverrides,
}

#[derive(Debug, Default, Serialize)]
struct ServerOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    legacy_auth: Option<bool>,
}

#[derive(Debug, Default, Serialize)]
struct SyncOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    root_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cover_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flat: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transcode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    playlist: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct ConverterOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    ffmpeg_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ffprobe_path: Option<PathBuf>,
}

/// `Some(true)` for a switch that was given, `None` otherwise.
fn switch(on: bool) -> Option<bool> {
    on.then_some(true)
}

impl Args {
    pub fn to_overrides(&self) -> Overrides {
        Overrides {
            server: ServerOverrides {
                url: self.url.clone(),
                user: self.user.clone(),
                password: self.password.clone(),
                legacy_auth: switch(self.legacy_auth),
            },
            sync: SyncOverrides {
                root_dir: self.dir.clone(),
                concurrency: self.concurrency,
                cover_size: self.cover_size,
                flat: switch(self.flat),
                transcode: switch(self.mp3),
                quality: self.quality,
                playlist: self.playlist.clone(),
            },
            converter: ConverterOverrides {
                ffmpeg_path: self.ffmpeg.clone(),
                ffprobe_path: self.ffprobe.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonicsync_core::load_layered_config;

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "sonicsync",
            "--url",
            "http://music.local",
            "--user",
            "bob",
            "--pass",
            "secret",
            "--mp3",
            "--quality",
            "4",
            "--cover-size",
            "300",
            "--dir",
            "/mnt/player",
        ])
        .unwrap();

        assert_eq!(args.url.as_deref(), Some("http://music.local"));
        assert_eq!(args.password.as_deref(), Some("secret"));
        assert!(args.mp3);
        assert!(!args.flat);
        assert_eq!(args.quality, Some(4));
        assert_eq!(args.cover_size, Some(300));
    }

    #[test]
    fn test_unset_flags_are_not_serialized() {
        let overrides = Args::default().to_overrides();
        let json = serde_json::to_value(&overrides).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "server": {}, "sync": {}, "converter": {} })
        );
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args {
            user: Some("bob".to_string()),
            mp3: true,
            concurrency: Some(2),
            ffmpeg: Some(PathBuf::from("/opt/ffmpeg")),
            ..Args::default()
        };

        let config = load_layered_config(None, args.to_overrides()).unwrap();

        assert_eq!(config.server.user, "bob");
        assert!(config.sync.transcode);
        assert!(!config.sync.flat);
        assert_eq!(config.sync.concurrency, 2);
        assert_eq!(config.sync.quality, 2);
        assert_eq!(config.converter.ffmpeg_path, PathBuf::from("/opt/ffmpeg"));
        assert_eq!(config.converter.ffprobe_path, PathBuf::from("ffprobe"));
    }
}
