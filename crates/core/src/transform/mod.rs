//! Media transform service.
//!
//! This module provides the `MediaTransform` trait and an ffmpeg-backed
//! implementation covering everything the sync pipeline does to media:
//!
//! - Probing a file for an embedded cover and its width
//! - Probing a transcoded file for the quality it was made with
//! - MP3 transcoding with an embedded quality tag
//! - Cover extraction and resizing
//! - Attaching a cover to an audio file
//!
//! # Example
//!
//! ```ignore
//! use sonicsync_core::transform::{FfmpegTransformer, MediaTransform, TransformerConfig};
//!
//! let transformer = FfmpegTransformer::new(TransformerConfig::default());
//! transformer.validate().await?;
//!
//! if let Some(cover) = transformer.probe_cover(Path::new("song.flac")).await? {
//!     println!("{} cover, {} px wide", cover.codec, cover.width);
//! }
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::TransformerConfig;
pub use error::TransformError;
pub use ffmpeg::FfmpegTransformer;
pub use traits::MediaTransform;
pub use types::{CoverStream, TransformOp};
