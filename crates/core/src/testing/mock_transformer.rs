//! Mock media transformer for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::target::QUALITY_TAG;
use crate::transform::{CoverStream, MediaTransform, TransformError, TransformOp};

const COVER_KEY: &str = "cover";

/// A recorded transform call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedOp {
    pub op: TransformOp,
    /// Input for probes, destination for writes.
    pub path: PathBuf,
    /// Quality for transcodes, edge for resizes.
    pub param: Option<u32>,
}

/// Mock implementation of the MediaTransform trait.
///
/// Files it writes are small text placeholders carrying their own metadata
/// (`sonicsync_quality=2`, `cover=mjpeg:150`), so probes keep working after
/// the files are renamed or linked.
///
/// Provides controllable behavior for testing:
/// - Record every call for assertions
/// - Give downloaded originals an embedded cover
/// - Fail, hang or panic on chosen operations
///
/// # Example
///
/// ```rust,ignore
/// use sonicsync_core::testing::MockTransformer;
///
/// let transformer = MockTransformer::new();
/// transformer.set_source_cover(Some(CoverStream::new("mjpeg", 600))).await;
/// transformer.fail_on(TransformOp::Mux).await;
///
/// // ... run a sync ...
///
/// assert_eq!(transformer.calls_for(TransformOp::Transcode).await, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTransformer {
    /// Recorded calls, in order.
    calls: Arc<RwLock<Vec<RecordedOp>>>,
    /// Cover probe results by path, checked before file contents.
    covers: Arc<RwLock<HashMap<PathBuf, CoverStream>>>,
    /// Quality probe results by path, checked before file contents.
    quality_tags: Arc<RwLock<HashMap<PathBuf, String>>>,
    /// Cover reported for files that carry none (e.g. downloaded originals).
    source_cover: Arc<RwLock<Option<CoverStream>>>,
    failing: Arc<RwLock<HashSet<TransformOp>>>,
    hanging: Arc<RwLock<HashSet<TransformOp>>>,
    panicking: Arc<RwLock<HashSet<TransformOp>>>,
}

impl MockTransformer {
    /// Create a new mock transformer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `cover` when probing `path`.
    pub async fn set_cover(&self, path: impl AsRef<Path>, cover: CoverStream) {
        self.covers
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), cover);
    }

    /// Report `tag` when probing the quality of `path`.
    pub async fn set_quality_tag(&self, path: impl AsRef<Path>, tag: &str) {
        self.quality_tags
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), tag.to_string());
    }

    /// Cover reported for files without one of their own.
    pub async fn set_source_cover(&self, cover: Option<CoverStream>) {
        *self.source_cover.write().await = cover;
    }

    /// Make every call of `op` fail.
    pub async fn fail_on(&self, op: TransformOp) {
        self.failing.write().await.insert(op);
    }

    /// Make every call of `op` never complete.
    pub async fn hang_on(&self, op: TransformOp) {
        self.hanging.write().await.insert(op);
    }

    /// Make every call of `op` panic.
    pub async fn panic_on(&self, op: TransformOp) {
        self.panicking.write().await.insert(op);
    }

    /// Get all recorded calls.
    pub async fn calls(&self) -> Vec<RecordedOp> {
        self.calls.read().await.clone()
    }

    /// Number of calls of `op`.
    pub async fn calls_for(&self, op: TransformOp) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.op == op)
            .count()
    }

    /// Number of calls that write a file.
    pub async fn write_calls(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.op.is_write())
            .count()
    }

    /// Clear recorded calls.
    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    async fn enter(&self, op: TransformOp, path: &Path, param: Option<u32>) -> Result<(), TransformError> {
        self.calls.write().await.push(RecordedOp {
            op,
            path: path.to_path_buf(),
            param,
        });

        if self.hanging.read().await.contains(&op) {
            std::future::pending::<()>().await;
        }
        if self.panicking.read().await.contains(&op) {
            panic!("mock transformer panic on {:?}", op);
        }
        if self.failing.read().await.contains(&op) {
            return Err(TransformError::failed(format!("mock {:?} failure", op), None));
        }
        Ok(())
    }

    async fn read_placeholder(path: &Path) -> Result<String, TransformError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TransformError::InputNotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => Err(TransformError::Io(e)),
        }
    }

    fn field<'a>(content: &'a str, key: &str) -> Option<&'a str> {
        content.lines().find_map(|line| {
            line.strip_prefix(key)
                .and_then(|rest| rest.strip_prefix('='))
        })
    }

    fn parse_cover(value: &str) -> Option<CoverStream> {
        let (codec, width) = value.split_once(':')?;
        Some(CoverStream::new(codec, width.parse().ok()?))
    }

    fn cover_line(cover: &CoverStream) -> String {
        format!("{}={}:{}\n", COVER_KEY, cover.codec, cover.width)
    }

    async fn write(dest: &Path, content: String) -> Result<(), TransformError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, content).await?;
        Ok(())
    }

    async fn cover_of(&self, path: &Path) -> Result<Option<CoverStream>, TransformError> {
        if let Some(cover) = self.covers.read().await.get(path) {
            return Ok(Some(cover.clone()));
        }
        let content = Self::read_placeholder(path).await?;
        match Self::field(&content, COVER_KEY) {
            Some(value) => Self::parse_cover(value)
                .map(Some)
                .ok_or_else(|| TransformError::parse(format!("bad cover field: {}", value))),
            None => Ok(self.source_cover.read().await.clone()),
        }
    }
}

#[async_trait]
impl MediaTransform for MockTransformer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe_cover(&self, path: &Path) -> Result<Option<CoverStream>, TransformError> {
        self.enter(TransformOp::ProbeCover, path, None).await?;
        self.cover_of(path).await
    }

    async fn probe_quality_tag(&self, path: &Path) -> Result<Option<String>, TransformError> {
        self.enter(TransformOp::ProbeQuality, path, None).await?;
        if let Some(tag) = self.quality_tags.read().await.get(path) {
            return Ok(Some(tag.clone()));
        }
        let content = Self::read_placeholder(path).await?;
        Ok(Self::field(&content, QUALITY_TAG).map(str::to_string))
    }

    async fn transcode_audio(
        &self,
        src: &Path,
        dest: &Path,
        quality: u8,
    ) -> Result<(), TransformError> {
        self.enter(TransformOp::Transcode, dest, Some(quality as u32))
            .await?;
        Self::read_placeholder(src).await?;
        Self::write(dest, format!("mock mp3\n{}={}\n", QUALITY_TAG, quality)).await
    }

    async fn extract_cover(&self, audio: &Path, dest: &Path) -> Result<(), TransformError> {
        self.enter(TransformOp::ExtractCover, dest, None).await?;
        let cover = self
            .cover_of(audio)
            .await?
            .ok_or_else(|| TransformError::failed("no picture stream", None))?;
        Self::write(dest, Self::cover_line(&cover)).await
    }

    async fn resize_cover(
        &self,
        src: &Path,
        dest: &Path,
        edge: u32,
    ) -> Result<(), TransformError> {
        self.enter(TransformOp::ResizeCover, dest, Some(edge)).await?;
        let cover = self
            .cover_of(src)
            .await?
            .ok_or_else(|| TransformError::parse("not an image"))?;
        Self::write(dest, Self::cover_line(&CoverStream::new(cover.codec, edge))).await
    }

    async fn mux_cover(
        &self,
        audio: &Path,
        cover: &Path,
        dest: &Path,
    ) -> Result<(), TransformError> {
        self.enter(TransformOp::Mux, dest, None).await?;
        let audio_content = Self::read_placeholder(audio).await?;
        let stream = self
            .cover_of(cover)
            .await?
            .ok_or_else(|| TransformError::parse("not an image"))?;

        let mut content: String = audio_content
            .lines()
            .filter(|line| Self::field(line, COVER_KEY).is_none())
            .map(|line| format!("{}\n", line))
            .collect();
        content.push_str(&Self::cover_line(&stream));
        Self::write(dest, content).await
    }

    async fn validate(&self) -> Result<(), TransformError> {
        Ok(())
    }
}
