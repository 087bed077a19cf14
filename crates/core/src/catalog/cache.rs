//! Single-flight cache for album artist lookups.
//!
//! Hierarchical layouts need the album artist of every track. Tracks of the
//! same album usually run concurrently, so without coordination each of them
//! would hit the server with the same `getAlbum` call.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use super::{Catalog, CatalogError};

/// Memoizes album artist lookups per album id.
///
/// Concurrent callers for the same id share one in-flight request.
/// Failures are not cached; the next caller retries.
pub struct AlbumArtistCache<C: Catalog> {
    catalog: Arc<C>,
    entries: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl<C: Catalog> AlbumArtistCache<C> {
    /// Creates an empty cache backed by `catalog`.
    pub fn new(catalog: Arc<C>) -> Self {
        Self {
            catalog,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the artist of `album_id`, asking the catalog at most once
    /// per successful lookup.
    pub async fn artist(&self, album_id: &str) -> Result<String, CatalogError> {
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(album_id.to_string()).or_default())
        };

        cell.get_or_try_init(|| async {
            debug!("Looking up artist for album {}", album_id);
            self.catalog.get_album_artist(album_id).await
        })
        .await
        .cloned()
    }

    /// Number of albums with a resolved artist.
    pub async fn resolved(&self) -> usize {
        self.entries
            .lock()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }
}
