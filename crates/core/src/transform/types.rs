//! Types shared by media transform implementations.

use serde::{Deserialize, Serialize};

/// An embedded picture stream found in an audio file, or the image stream
/// of a standalone cover file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverStream {
    /// Codec name as reported by ffprobe (`mjpeg`, `png`, ...).
    pub codec: String,
    /// Width in pixels.
    pub width: u32,
}

impl CoverStream {
    pub fn new(codec: impl Into<String>, width: u32) -> Self {
        Self {
            codec: codec.into(),
            width,
        }
    }

    /// File extension for an extracted copy of this stream.
    pub fn extension(&self) -> &str {
        match self.codec.as_str() {
            "mjpeg" | "jpeg" | "jpg" => "jpg",
            "png" => "png",
            "bmp" => "bmp",
            "gif" => "gif",
            "webp" => "webp",
            other => other,
        }
    }
}

/// The individual operations a transform service performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformOp {
    ProbeCover,
    ProbeQuality,
    Transcode,
    ExtractCover,
    ResizeCover,
    Mux,
}

impl TransformOp {
    /// Whether the operation writes a file.
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::ProbeCover | Self::ProbeQuality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_extension() {
        assert_eq!(CoverStream::new("mjpeg", 500).extension(), "jpg");
        assert_eq!(CoverStream::new("png", 500).extension(), "png");
        assert_eq!(CoverStream::new("tiff", 500).extension(), "tiff");
    }

    #[test]
    fn test_write_ops() {
        assert!(!TransformOp::ProbeCover.is_write());
        assert!(TransformOp::Mux.is_write());
    }
}
