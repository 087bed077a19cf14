//! Remote catalog access.
//!
//! The sync engine only needs three things from the server: the list of
//! tracks in a collection, the artist of an album and the raw bytes of a
//! song. [`Catalog`] captures exactly that; [`SubsonicClient`] implements it
//! against the Subsonic REST API.

mod cache;
mod subsonic;
mod types;

pub use cache::AlbumArtistCache;
pub use subsonic::{SubsonicClient, API_VERSION, CLIENT_NAME};
pub use types::{Collection, Track, FAVORITES_NAME};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when talking to the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success HTTP status.
    #[error("Server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Server answered with a failed Subsonic envelope.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Writing downloaded bytes failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Creates a new parse error.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse(reason.into())
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// A source of tracks.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Returns the name of this catalog implementation.
    fn name(&self) -> &str;

    /// Fetches a playlist by id, or the starred songs when `id` is `None`
    /// or empty.
    async fn get_collection(&self, id: Option<&str>) -> Result<Collection, CatalogError>;

    /// Looks up the artist name of an album.
    async fn get_album_artist(&self, album_id: &str) -> Result<String, CatalogError>;

    /// Streams the original file of `track` to `dest`, returning the
    /// number of bytes written.
    async fn download(&self, track: &Track, dest: &Path) -> Result<u64, CatalogError>;

    /// Checks that the server is reachable and accepts our credentials.
    async fn ping(&self) -> Result<(), CatalogError>;
}
