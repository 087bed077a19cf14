//! Mock catalog for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::catalog::{Catalog, CatalogError, Collection, Track};

/// A recorded catalog call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCatalogCall {
    GetCollection { id: Option<String> },
    GetAlbumArtist { album_id: String },
    Download { track_id: String },
    Ping,
}

/// Mock implementation of the Catalog trait.
///
/// Provides controllable behavior for testing:
/// - Serve a configurable collection and album artists
/// - Write placeholder downloads of the track's expected size
/// - Simulate failures, slowness and hangs
/// - Track calls and download concurrency for assertions
///
/// # Example
///
/// ```rust,ignore
/// use sonicsync_core::testing::MockCatalog;
///
/// let catalog = MockCatalog::new();
/// catalog.set_collection(Collection::favorites(tracks)).await;
/// catalog.set_album_artist("al-1", "Artist").await;
///
/// let collection = catalog.get_collection(None).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockCatalog {
    collection: Arc<RwLock<Option<Collection>>>,
    album_artists: Arc<RwLock<HashMap<String, String>>>,
    failing_albums: Arc<RwLock<HashSet<String>>>,
    failing_downloads: Arc<RwLock<HashSet<String>>>,
    flaky_downloads: Arc<RwLock<HashMap<String, usize>>>,
    calls: Arc<RwLock<Vec<RecordedCatalogCall>>>,
    lookup_delay: Arc<RwLock<Duration>>,
    download_delay: Arc<RwLock<Duration>>,
    hang_downloads: Arc<RwLock<bool>>,
    fail_collection: Arc<RwLock<bool>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight counter when a download ends, however it ends.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockCatalog {
    /// Create a new mock catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `collection` for every collection request.
    pub async fn set_collection(&self, collection: Collection) {
        *self.collection.write().await = Some(collection);
    }

    /// Make collection requests fail.
    pub async fn fail_collection(&self) {
        *self.fail_collection.write().await = true;
    }

    pub async fn set_album_artist(&self, album_id: &str, artist: &str) {
        self.album_artists
            .write()
            .await
            .insert(album_id.to_string(), artist.to_string());
    }

    /// Make lookups of `album_id` fail.
    pub async fn fail_album(&self, album_id: &str) {
        self.failing_albums.write().await.insert(album_id.to_string());
    }

    /// Make downloads of `track_id` fail.
    pub async fn fail_download(&self, track_id: &str) {
        self.failing_downloads
            .write()
            .await
            .insert(track_id.to_string());
    }

    /// Make the next `times` downloads of `track_id` fail with a
    /// transient server error.
    pub async fn fail_download_times(&self, track_id: &str, times: usize) {
        self.flaky_downloads
            .write()
            .await
            .insert(track_id.to_string(), times);
    }

    pub async fn set_lookup_delay(&self, delay: Duration) {
        *self.lookup_delay.write().await = delay;
    }

    pub async fn set_download_delay(&self, delay: Duration) {
        *self.download_delay.write().await = delay;
    }

    /// Make downloads never complete.
    pub async fn hang_downloads(&self) {
        *self.hang_downloads.write().await = true;
    }

    /// Get all recorded calls.
    pub async fn calls(&self) -> Vec<RecordedCatalogCall> {
        self.calls.read().await.clone()
    }

    /// Number of album artist lookups that reached the catalog.
    pub async fn album_lookups(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| matches!(c, RecordedCatalogCall::GetAlbumArtist { .. }))
            .count()
    }

    /// Number of downloads started.
    pub async fn downloads(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| matches!(c, RecordedCatalogCall::Download { .. }))
            .count()
    }

    /// Highest number of downloads that ran at the same time.
    pub fn max_concurrent_downloads(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn record(&self, call: RecordedCatalogCall) {
        self.calls.write().await.push(call);
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get_collection(&self, id: Option<&str>) -> Result<Collection, CatalogError> {
        self.record(RecordedCatalogCall::GetCollection {
            id: id.map(str::to_string),
        })
        .await;

        if *self.fail_collection.read().await {
            return Err(CatalogError::Api {
                code: 40,
                message: "Wrong username or password".to_string(),
            });
        }

        self.collection
            .read()
            .await
            .clone()
            .ok_or_else(|| CatalogError::NotFound(id.unwrap_or("favorites").to_string()))
    }

    async fn get_album_artist(&self, album_id: &str) -> Result<String, CatalogError> {
        self.record(RecordedCatalogCall::GetAlbumArtist {
            album_id: album_id.to_string(),
        })
        .await;

        let delay = *self.lookup_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.failing_albums.read().await.contains(album_id) {
            return Err(CatalogError::Api {
                code: 70,
                message: format!("Album not found: {}", album_id),
            });
        }

        self.album_artists
            .read()
            .await
            .get(album_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(album_id.to_string()))
    }

    async fn download(&self, track: &Track, dest: &Path) -> Result<u64, CatalogError> {
        self.record(RecordedCatalogCall::Download {
            track_id: track.id.clone(),
        })
        .await;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(Arc::clone(&self.in_flight));
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if *self.hang_downloads.read().await {
            std::future::pending::<()>().await;
        }

        let delay = *self.download_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let flaky = match self.flaky_downloads.write().await.get_mut(&track.id) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };
        if flaky || self.failing_downloads.read().await.contains(&track.id) {
            return Err(CatalogError::Status {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, vec![0u8; track.size as usize]).await?;
        Ok(track.size)
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        self.record(RecordedCatalogCall::Ping).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn track(id: &str, size: u64) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Title {}", id),
            album: "Album".to_string(),
            album_id: "al".to_string(),
            artist: "Artist".to_string(),
            track_number: "1".to_string(),
            suffix: "flac".to_string(),
            size,
        }
    }

    #[tokio::test]
    async fn test_download_writes_expected_size() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("songs/a.flac");
        let catalog = MockCatalog::new();

        let written = catalog.download(&track("1", 42), &dest).await.unwrap();

        assert_eq!(written, 42);
        assert_eq!(tokio::fs::metadata(&dest).await.unwrap().len(), 42);
        assert_eq!(catalog.downloads().await, 1);
        assert_eq!(catalog.max_concurrent_downloads(), 1);
    }

    #[tokio::test]
    async fn test_failures() {
        let temp = TempDir::new().unwrap();
        let catalog = MockCatalog::new();
        catalog.fail_download("1").await;
        catalog.fail_album("al").await;

        assert!(catalog
            .download(&track("1", 1), &temp.path().join("x"))
            .await
            .is_err());
        assert!(catalog.get_album_artist("al").await.is_err());
        assert!(catalog.get_collection(None).await.is_err());
    }

    #[tokio::test]
    async fn test_collection_and_artist() {
        let catalog = MockCatalog::new();
        catalog
            .set_collection(Collection::favorites(vec![track("1", 1)]))
            .await;
        catalog.set_album_artist("al", "Someone").await;

        assert_eq!(catalog.get_collection(None).await.unwrap().tracks.len(), 1);
        assert_eq!(catalog.get_album_artist("al").await.unwrap(), "Someone");
        assert_eq!(catalog.album_lookups().await, 1);
    }
}
