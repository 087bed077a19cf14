//! Trait definitions for the transform module.

use async_trait::async_trait;
use std::path::Path;

use super::error::TransformError;
use super::types::CoverStream;

/// A service that inspects and rewrites media files.
///
/// Every write operation overwrites `dest` if it already exists.
#[async_trait]
pub trait MediaTransform: Send + Sync {
    /// Returns the name of this implementation.
    fn name(&self) -> &str;

    /// Returns the first picture stream of `path`, if any.
    async fn probe_cover(&self, path: &Path) -> Result<Option<CoverStream>, TransformError>;

    /// Returns the quality tag embedded by [`MediaTransform::transcode_audio`].
    async fn probe_quality_tag(&self, path: &Path) -> Result<Option<String>, TransformError>;

    /// Transcodes `src` to MP3 at VBR `quality`, dropping pictures and
    /// recording the quality as metadata.
    async fn transcode_audio(
        &self,
        src: &Path,
        dest: &Path,
        quality: u8,
    ) -> Result<(), TransformError>;

    /// Writes the first picture stream of `audio` to `dest` unchanged.
    async fn extract_cover(&self, audio: &Path, dest: &Path) -> Result<(), TransformError>;

    /// Scales `src` to `edge` pixels wide, keeping the aspect ratio, and
    /// writes a metadata-free, non-interlaced image to `dest`.
    async fn resize_cover(&self, src: &Path, dest: &Path, edge: u32)
        -> Result<(), TransformError>;

    /// Writes `audio` with `cover` attached as front cover to `dest`.
    async fn mux_cover(&self, audio: &Path, cover: &Path, dest: &Path)
        -> Result<(), TransformError>;

    /// Validates that the service is properly configured and ready.
    async fn validate(&self) -> Result<(), TransformError>;
}
