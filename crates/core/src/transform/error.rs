//! Error types for the transform module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while probing or transforming media.
#[derive(Debug, Error)]
pub enum TransformError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    FfprobeNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The stream uses a codec the tools cannot handle.
    #[error("Unsupported codec: {codec}")]
    UnsupportedCodec { codec: String },

    /// The external tool ran but did not produce a usable result.
    #[error("Transform failed: {reason}")]
    TransformFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Failed to parse FFprobe output.
    #[error("Failed to parse media info: {reason}")]
    ParseError { reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransformError {
    /// Creates a new transform failed error with stderr output.
    pub fn failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::TransformFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a new parse error.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::ParseError {
            reason: reason.into(),
        }
    }

    /// Whether this error is an I/O problem rather than a media problem.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::InputNotFound { .. })
    }
}
