//! Subsonic REST API client.
//!
//! Talks JSON (`f=json`) to any server implementing the Subsonic API
//! (Navidrome, Airsonic, Gonic, ...). Authentication uses the salted token
//! scheme from API 1.13.0 unless the server only understands plain
//! passwords.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use super::types::{Collection, Track};
use super::{Catalog, CatalogError};
use crate::config::ServerConfig;
use crate::sanitize::affixed_name;

/// API version announced to the server.
pub const API_VERSION: &str = "1.16.1";

/// Client name announced to the server.
pub const CLIENT_NAME: &str = "sonicsync";

/// Subsonic API client.
pub struct SubsonicClient {
    client: Client,
    base_url: String,
    user: String,
    password: String,
    legacy_auth: bool,
    request_timeout: Duration,
}

impl SubsonicClient {
    /// Create a new client from server settings.
    pub fn new(config: &ServerConfig) -> Result<Self, CatalogError> {
        let request_timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .user_agent(format!("{}/{}", CLIENT_NAME, env!("CARGO_PKG_VERSION")))
            .connect_timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: Self::normalize_base_url(&config.url),
            user: config.user.clone(),
            password: config.password.clone(),
            legacy_auth: config.legacy_auth,
            request_timeout,
        })
    }

    /// Accepts both `http://host` and `http://host/rest`.
    fn normalize_base_url(url: &str) -> String {
        let trimmed = url.trim_end_matches('/');
        if trimmed.ends_with("/rest") {
            trimmed.to_string()
        } else {
            format!("{}/rest", trimmed)
        }
    }

    /// Query parameters every request carries.
    fn auth_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("u", self.user.clone()),
            ("v", API_VERSION.to_string()),
            ("c", CLIENT_NAME.to_string()),
            ("f", "json".to_string()),
        ];

        if self.legacy_auth {
            params.push(("p", self.password.clone()));
        } else {
            let salt: String = Uuid::new_v4().simple().to_string().chars().take(12).collect();
            params.push(("t", Self::auth_token(&self.password, &salt)));
            params.push(("s", salt));
        }

        params
    }

    /// `md5(password + salt)` as lowercase hex.
    fn auth_token(password: &str, salt: &str) -> String {
        format!("{:x}", md5::compute(format!("{}{}", password, salt)))
    }

    fn request(&self, endpoint: &str, extra: &[(&str, &str)]) -> RequestBuilder {
        self.client
            .get(format!("{}/{}", self.base_url, endpoint))
            .query(&self.auth_params())
            .query(extra)
    }

    /// Performs an API call and returns the unwrapped `subsonic-response`.
    async fn call(&self, endpoint: &str, extra: &[(&str, &str)]) -> Result<Value, CatalogError> {
        debug!("Subsonic call: endpoint={}, params={:?}", endpoint, extra);

        let response = self
            .request(endpoint, extra)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if status == 404 {
            return Err(CatalogError::NotFound(endpoint.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: Value = response.json().await.map_err(|e| {
            CatalogError::parse(format!("Failed to parse {} response: {}", endpoint, e))
        })?;

        Self::unwrap_envelope(body)
    }

    /// Extracts the inner response object, turning `status: failed` into
    /// an error.
    fn unwrap_envelope(body: Value) -> Result<Value, CatalogError> {
        let inner = match body {
            Value::Object(mut map) => map
                .remove("subsonic-response")
                .ok_or_else(|| CatalogError::parse("missing subsonic-response"))?,
            _ => return Err(CatalogError::parse("response is not an object")),
        };

        let status = inner.get("status").and_then(Value::as_str).unwrap_or("");
        if status != "ok" {
            let error = inner.get("error");
            let code = error
                .and_then(|e| e.get("code"))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            let message = error
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(CatalogError::Api { code, message });
        }

        Ok(inner)
    }

    fn parse_starred(inner: Value) -> Result<Collection, CatalogError> {
        #[derive(Deserialize)]
        struct Body {
            #[serde(default)]
            starred: Starred,
        }

        #[derive(Deserialize, Default)]
        struct Starred {
            #[serde(default)]
            song: Vec<Track>,
        }

        let body: Body = serde_json::from_value(inner)
            .map_err(|e| CatalogError::parse(format!("Failed to parse starred songs: {}", e)))?;
        Ok(Collection::favorites(body.starred.song))
    }

    fn parse_playlist(inner: Value) -> Result<Collection, CatalogError> {
        #[derive(Deserialize)]
        struct Body {
            playlist: Playlist,
        }

        #[derive(Deserialize)]
        struct Playlist {
            name: String,
            #[serde(default)]
            entry: Vec<Track>,
        }

        let body: Body = serde_json::from_value(inner)
            .map_err(|e| CatalogError::parse(format!("Failed to parse playlist: {}", e)))?;
        Ok(Collection {
            name: body.playlist.name,
            tracks: body.playlist.entry,
        })
    }

    fn parse_album_artist(inner: Value) -> Result<String, CatalogError> {
        #[derive(Deserialize)]
        struct Body {
            album: Album,
        }

        #[derive(Deserialize)]
        struct Album {
            #[serde(default)]
            artist: String,
        }

        let body: Body = serde_json::from_value(inner)
            .map_err(|e| CatalogError::parse(format!("Failed to parse album: {}", e)))?;
        Ok(body.album.artist)
    }

    /// Partial downloads land next to the destination and are renamed once
    /// complete.
    fn partial_path(dest: &Path) -> PathBuf {
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        dest.with_file_name(affixed_name(&name, "", PARTIAL_SUFFIX))
    }
}

/// Suffix of downloads in progress.
const PARTIAL_SUFFIX: &str = ".part";

/// A download in progress.
///
/// The file is removed on drop unless it was committed, so errors, deadlines
/// and cancellation never leave a `.part` file behind.
struct PartialDownload {
    path: PathBuf,
    committed: bool,
}

impl PartialDownload {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    async fn commit(mut self, dest: &Path) -> std::io::Result<()> {
        tokio::fs::rename(&self.path, dest).await?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialDownload {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove partial download {:?}: {}", self.path, e);
                }
            }
        }
    }
}

#[async_trait]
impl Catalog for SubsonicClient {
    fn name(&self) -> &str {
        "subsonic"
    }

    async fn get_collection(&self, id: Option<&str>) -> Result<Collection, CatalogError> {
        match id.filter(|id| !id.is_empty()) {
            Some(id) => Self::parse_playlist(self.call("getPlaylist", &[("id", id)]).await?),
            None => Self::parse_starred(self.call("getStarred", &[]).await?),
        }
    }

    async fn get_album_artist(&self, album_id: &str) -> Result<String, CatalogError> {
        Self::parse_album_artist(self.call("getAlbum", &[("id", album_id)]).await?)
    }

    async fn download(&self, track: &Track, dest: &Path) -> Result<u64, CatalogError> {
        debug!("Downloading track {} to {:?}", track.id, dest);

        let response = self.request("download", &[("id", track.id.as_str())]).send().await?;

        let status = response.status();
        if status == 404 {
            return Err(CatalogError::NotFound(track.id.clone()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        // errors come back as a JSON envelope with a 200 status
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("json"))
            .unwrap_or(false);
        if is_json {
            let body: Value = response
                .json()
                .await
                .map_err(|e| CatalogError::parse(format!("Failed to parse download error: {}", e)))?;
            Self::unwrap_envelope(body)?;
            return Err(CatalogError::parse("server sent JSON instead of audio"));
        }

        let partial = PartialDownload::new(Self::partial_path(dest));
        let mut file = File::create(&partial.path).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        drop(file);
        partial.commit(dest).await?;

        if track.size > 0 && written != track.size {
            warn!(
                "Downloaded size of {} differs from catalog: {} vs {} bytes",
                track.title, written, track.size
            );
        }

        Ok(written)
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        self.call("ping", &[]).await.map(|_| ())
    }
}
