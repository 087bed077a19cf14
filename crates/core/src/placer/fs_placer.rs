//! File system placer implementation.

use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::debug;

use super::error::PlacerError;
use crate::sanitize::affixed_name;

/// Buffer size for copies.
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Prefix of in-progress files written next to their destination.
const TEMP_PREFIX: &str = ".sonicsync-tmp-";

/// How a file was put in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMethod {
    HardLink,
    Copy,
}

/// File system based placer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsPlacer;

impl FsPlacer {
    pub fn new() -> Self {
        Self
    }

    /// Sibling path to write `destination` to before committing it.
    ///
    /// The extension is kept so tools that pick a container from it still
    /// work, and the name stays within the segment limit even when the
    /// destination's name already uses all of it.
    pub fn temp_path(destination: &Path) -> PathBuf {
        let name = destination
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        destination.with_file_name(affixed_name(&name, TEMP_PREFIX, ""))
    }

    /// Removes `path` if it exists. Returns whether something was removed.
    pub async fn remove_if_exists(&self, path: &Path) -> Result<bool, PlacerError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PlacerError::RemoveFailed {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Creates parent directories for a path.
    pub async fn ensure_parent_dirs(&self, path: &Path) -> Result<(), PlacerError> {
        if let Some(parent) = path.parent() {
            // create_dir_all tolerates concurrent creation of the same tree
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PlacerError::DirectoryCreationFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Replaces `destination` with `source`, hard-linking when possible and
    /// copying otherwise.
    pub async fn link_or_copy(
        &self,
        source: &Path,
        destination: &Path,
    ) -> Result<LinkMethod, PlacerError> {
        if fs::metadata(source).await.is_err() {
            return Err(PlacerError::SourceNotFound {
                path: source.to_path_buf(),
            });
        }

        self.ensure_parent_dirs(destination).await?;
        self.remove_if_exists(destination).await?;

        match fs::hard_link(source, destination).await {
            Ok(()) => Ok(LinkMethod::HardLink),
            Err(e) => {
                debug!(
                    source = %source.display(),
                    destination = %destination.display(),
                    error = %e,
                    "Hard link failed, copying instead"
                );
                // copy beside the destination so a failed copy never leaves
                // a truncated final file
                let temp = Self::temp_path(destination);
                if let Err(e) = self.copy_file(source, &temp).await {
                    let _ = self.remove_if_exists(&temp).await;
                    return Err(e);
                }
                self.commit(&temp, destination).await?;
                Ok(LinkMethod::Copy)
            }
        }
    }

    /// Renames a finished temp file over its destination.
    pub async fn commit(&self, temp: &Path, destination: &Path) -> Result<(), PlacerError> {
        fs::rename(temp, destination)
            .await
            .map_err(|e| PlacerError::move_failed(temp.to_path_buf(), destination.to_path_buf(), e))
    }

    /// Copies a file.
    async fn copy_file(&self, source: &Path, destination: &Path) -> Result<u64, PlacerError> {
        let source_file = File::open(source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlacerError::SourceNotFound {
                    path: source.to_path_buf(),
                }
            } else {
                PlacerError::Io(e)
            }
        })?;

        let dest_file = File::create(destination).await.map_err(|e| {
            PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;

        let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, source_file);
        let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, dest_file);

        let mut total_bytes = 0u64;
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

        loop {
            let bytes_read = reader.read(&mut buffer).await.map_err(|e| {
                PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
            })?;

            if bytes_read == 0 {
                break;
            }

            writer.write_all(&buffer[..bytes_read]).await.map_err(|e| {
                PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
            })?;

            total_bytes += bytes_read as u64;
        }

        writer.flush().await.map_err(|e| {
            PlacerError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
        })?;

        Ok(total_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::{file_name, MAX_SEGMENT_BYTES};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_link_creates_parents_and_links() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source.flac");
        let dest = temp.path().join("Artist/Album/001 Song.flac");
        fs::write(&source, "audio").await.unwrap();

        let method = FsPlacer::new().link_or_copy(&source, &dest).await.unwrap();

        assert_eq!(method, LinkMethod::HardLink);
        assert_eq!(fs::read_to_string(&dest).await.unwrap(), "audio");
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_link_replaces_existing_destination() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("new.mp3");
        let dest = temp.path().join("out.mp3");
        fs::write(&source, "new").await.unwrap();
        fs::write(&dest, "old").await.unwrap();

        FsPlacer::new().link_or_copy(&source, &dest).await.unwrap();

        assert_eq!(fs::read_to_string(&dest).await.unwrap(), "new");
    }

    #[tokio::test]
    async fn test_link_missing_source() {
        let temp = TempDir::new().unwrap();
        let result = FsPlacer::new()
            .link_or_copy(&temp.path().join("nope"), &temp.path().join("out"))
            .await;

        assert!(matches!(result, Err(PlacerError::SourceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_copy_file() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a");
        let dest = temp.path().join("b");
        fs::write(&source, vec![7u8; 200_000]).await.unwrap();

        let copied = FsPlacer::new().copy_file(&source, &dest).await.unwrap();

        assert_eq!(copied, 200_000);
        assert_eq!(fs::metadata(&dest).await.unwrap().len(), 200_000);
    }

    #[tokio::test]
    async fn test_commit_and_remove() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("song.mp3");
        let staged = FsPlacer::temp_path(&dest);
        fs::write(&staged, "muxed").await.unwrap();

        let placer = FsPlacer::new();
        placer.commit(&staged, &dest).await.unwrap();
        assert!(!staged.exists());
        assert_eq!(fs::read_to_string(&dest).await.unwrap(), "muxed");

        assert!(placer.remove_if_exists(&dest).await.unwrap());
        assert!(!placer.remove_if_exists(&dest).await.unwrap());
    }

    #[test]
    fn test_temp_path_keeps_extension() {
        let temp = FsPlacer::temp_path(Path::new("/music/favs/Album Song.mp3"));
        assert_eq!(temp, PathBuf::from("/music/favs/.sonicsync-tmp-Album Song.mp3"));
        assert_eq!(temp.extension().unwrap(), "mp3");
    }

    #[tokio::test]
    async fn test_temp_path_for_maximal_name_is_writable() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join(file_name(&"x".repeat(300), "mp3"));
        let staged = FsPlacer::temp_path(&dest);
        assert!(staged.file_name().unwrap().len() <= MAX_SEGMENT_BYTES);
        assert_eq!(staged.extension().unwrap(), "mp3");

        fs::write(&staged, "muxed").await.unwrap();
        FsPlacer::new().commit(&staged, &dest).await.unwrap();

        assert_eq!(fs::read_to_string(&dest).await.unwrap(), "muxed");
    }

    #[tokio::test]
    async fn test_link_maximal_name() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.flac");
        let dest = temp.path().join(file_name(&"y".repeat(300), "flac"));
        fs::write(&source, b"audio").await.unwrap();

        FsPlacer::new().link_or_copy(&source, &dest).await.unwrap();

        assert_eq!(fs::read(&dest).await.unwrap(), b"audio");
    }
}
