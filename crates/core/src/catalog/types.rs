//! Types returned by catalog sources.

use serde::{Deserialize, Deserializer, Serialize};

/// Name used for the starred-songs collection.
pub const FAVORITES_NAME: &str = "favs";

/// One remote song.
///
/// Created once from the catalog response and never modified afterwards;
/// tasks receive their own copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Server-side song identifier.
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub album: String,
    #[serde(default, rename = "albumId")]
    pub album_id: String,
    #[serde(default)]
    pub artist: String,
    /// Track number as reported; servers send numbers, strings or nothing.
    #[serde(default, rename = "track", deserialize_with = "string_or_number")]
    pub track_number: String,
    /// File extension of the original upload.
    #[serde(default)]
    pub suffix: String,
    /// Size in bytes of the original file.
    #[serde(default)]
    pub size: u64,
}

impl Track {
    /// Parsed track number, `0` when missing or unparsable.
    pub fn track_position(&self) -> u32 {
        self.track_number.trim().parse().unwrap_or(0)
    }
}

/// An ordered list of tracks under a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub tracks: Vec<Track>,
}

impl Collection {
    /// Creates the favorites collection.
    pub fn favorites(tracks: Vec<Track>) -> Self {
        Self {
            name: FAVORITES_NAME.to_string(),
            tracks,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
        Float(f64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => s,
        Some(Raw::Number(n)) => n.to_string(),
        Some(Raw::Float(f)) => f.to_string(),
        None => String::new(),
    })
}
