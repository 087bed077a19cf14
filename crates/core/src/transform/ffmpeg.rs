//! FFmpeg-based media transform implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::config::TransformerConfig;
use super::error::TransformError;
use super::traits::MediaTransform;
use super::types::CoverStream;
use crate::target::QUALITY_TAG;

/// Stderr fragments ffmpeg prints when a codec cannot be handled.
const UNSUPPORTED_CODEC_MARKERS: [&str; 4] = [
    "Unsupported codec",
    "not currently supported in container",
    "Could not find tag for codec",
    "Decoder not found",
];

/// FFmpeg-based transformer.
pub struct FfmpegTransformer {
    config: TransformerConfig,
}

impl FfmpegTransformer {
    /// Creates a new transformer with the given configuration.
    pub fn new(config: TransformerConfig) -> Self {
        Self { config }
    }

    /// Creates a transformer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TransformerConfig::default())
    }

    fn path_arg(path: &Path) -> String {
        path.to_string_lossy().to_string()
    }

    fn finish_args(&self, mut args: Vec<String>, dest: &Path) -> Vec<String> {
        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            Self::path_arg(dest),
        ]);
        args
    }

    /// Builds ffmpeg arguments for MP3 transcoding.
    fn transcode_args(&self, src: &Path, dest: &Path, quality: u8) -> Vec<String> {
        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            Self::path_arg(src),
            "-vn".to_string(),
            "-map".to_string(),
            "0:a:0".to_string(),
            "-c:a".to_string(),
            "libmp3lame".to_string(),
            "-q:a".to_string(),
            quality.to_string(),
            "-map_metadata".to_string(),
            "0".to_string(),
            "-id3v2_version".to_string(),
            "3".to_string(),
            "-write_id3v1".to_string(),
            "1".to_string(),
            "-metadata".to_string(),
            format!("{}={}", QUALITY_TAG, quality),
        ];
        self.finish_args(args, dest)
    }

    /// Builds ffmpeg arguments to copy the first picture stream out.
    fn extract_args(&self, audio: &Path, dest: &Path) -> Vec<String> {
        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            Self::path_arg(audio),
            "-an".to_string(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-c:v".to_string(),
            "copy".to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-update".to_string(),
            "1".to_string(),
        ];
        self.finish_args(args, dest)
    }

    /// Builds ffmpeg arguments for cover scaling.
    fn resize_args(&self, src: &Path, dest: &Path, edge: u32) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            Self::path_arg(src),
            "-vf".to_string(),
            format!("scale={}:-2:flags=lanczos", edge),
            "-map_metadata".to_string(),
            "-1".to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-update".to_string(),
            "1".to_string(),
        ];

        let is_jpeg = dest
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
            .unwrap_or(false);
        if is_jpeg {
            // baseline output; progressive JPEGs break many players
            args.extend([
                "-q:v".to_string(),
                self.config.cover_jpeg_quality.to_string(),
                "-pix_fmt".to_string(),
                "yuvj420p".to_string(),
            ]);
        }

        self.finish_args(args, dest)
    }

    /// Builds ffmpeg arguments to attach a cover picture.
    fn mux_args(&self, audio: &Path, cover: &Path, dest: &Path) -> Vec<String> {
        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            Self::path_arg(audio),
            "-i".to_string(),
            Self::path_arg(cover),
            "-map".to_string(),
            "0:a".to_string(),
            "-map".to_string(),
            "1:v".to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-id3v2_version".to_string(),
            "3".to_string(),
            "-metadata:s:v".to_string(),
            "title=Album cover".to_string(),
            "-metadata:s:v".to_string(),
            "comment=Cover (front)".to_string(),
            "-disposition:v".to_string(),
            "attached_pic".to_string(),
        ];
        self.finish_args(args, dest)
    }

    /// Parses `ffprobe -show_streams` JSON into the first picture stream.
    fn parse_cover_stream(output: &str) -> Result<Option<CoverStream>, TransformError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: Option<String>,
            codec_name: Option<String>,
            width: Option<u32>,
        }

        let probe: ProbeOutput = serde_json::from_str(output)
            .map_err(|e| TransformError::parse(format!("Failed to parse ffprobe output: {}", e)))?;

        Ok(probe
            .streams
            .into_iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .map(|s| CoverStream {
                codec: s.codec_name.unwrap_or_else(|| "unknown".to_string()),
                width: s.width.unwrap_or(0),
            }))
    }

    /// Parses `ffprobe -show_format` JSON into the quality tag, if present.
    fn parse_quality_tag(output: &str) -> Result<Option<String>, TransformError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            #[serde(default)]
            tags: HashMap<String, String>,
        }

        let probe: ProbeOutput = serde_json::from_str(output)
            .map_err(|e| TransformError::parse(format!("Failed to parse ffprobe output: {}", e)))?;

        Ok(probe
            .format
            .tags
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(QUALITY_TAG))
            .map(|(_, value)| value.trim().to_string()))
    }

    fn unsupported_codec_line(stderr: &str) -> Option<String> {
        stderr
            .lines()
            .find(|line| UNSUPPORTED_CODEC_MARKERS.iter().any(|m| line.contains(m)))
            .map(|line| line.trim().to_string())
    }

    /// Runs ffmpeg and checks that `dest` was written.
    async fn run_ffmpeg(&self, args: Vec<String>, dest: &Path) -> Result<(), TransformError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!("Running ffmpeg {:?}", args);

        // kill_on_drop so a deadline or cancellation upstream stops the child
        let output = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TransformError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    TransformError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            if let Some(codec) = Self::unsupported_codec_line(&stderr) {
                return Err(TransformError::UnsupportedCodec { codec });
            }
            return Err(TransformError::failed(
                format!("FFmpeg exited with code: {:?}", output.status.code()),
                if stderr.is_empty() { None } else { Some(stderr) },
            ));
        }

        tokio::fs::metadata(dest)
            .await
            .map_err(|_| TransformError::failed("Output file not created", None))?;

        Ok(())
    }

    /// Runs ffprobe with JSON output and returns stdout.
    async fn run_ffprobe(&self, args: &[&str], path: &Path) -> Result<String, TransformError> {
        if tokio::fs::metadata(path).await.is_err() {
            return Err(TransformError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json"])
            .args(args)
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TransformError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    TransformError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(TransformError::parse(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn check_binary(path: &Path) -> Result<(), std::io::Error> {
        Command::new(path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl MediaTransform for FfmpegTransformer {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe_cover(&self, path: &Path) -> Result<Option<CoverStream>, TransformError> {
        let output = self
            .run_ffprobe(&["-show_streams", "-select_streams", "v:0"], path)
            .await?;
        Self::parse_cover_stream(&output)
    }

    async fn probe_quality_tag(&self, path: &Path) -> Result<Option<String>, TransformError> {
        let output = self.run_ffprobe(&["-show_format"], path).await?;
        Self::parse_quality_tag(&output)
    }

    async fn transcode_audio(
        &self,
        src: &Path,
        dest: &Path,
        quality: u8,
    ) -> Result<(), TransformError> {
        self.run_ffmpeg(self.transcode_args(src, dest, quality), dest)
            .await
    }

    async fn extract_cover(&self, audio: &Path, dest: &Path) -> Result<(), TransformError> {
        self.run_ffmpeg(self.extract_args(audio, dest), dest).await
    }

    async fn resize_cover(
        &self,
        src: &Path,
        dest: &Path,
        edge: u32,
    ) -> Result<(), TransformError> {
        self.run_ffmpeg(self.resize_args(src, dest, edge), dest).await
    }

    async fn mux_cover(
        &self,
        audio: &Path,
        cover: &Path,
        dest: &Path,
    ) -> Result<(), TransformError> {
        self.run_ffmpeg(self.mux_args(audio, cover, dest), dest)
            .await
    }

    async fn validate(&self) -> Result<(), TransformError> {
        if let Err(e) = Self::check_binary(&self.config.ffmpeg_path).await {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(TransformError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                });
            }
            return Err(TransformError::Io(e));
        }

        if let Err(e) = Self::check_binary(&self.config.ffprobe_path).await {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(TransformError::FfprobeNotFound {
                    path: self.config.ffprobe_path.clone(),
                });
            }
            return Err(TransformError::Io(e));
        }

        Ok(())
    }
}
