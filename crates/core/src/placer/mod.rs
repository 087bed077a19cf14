//! Placing final artifacts.
//!
//! Final outputs are either hard links to an intermediate file or files
//! written next to their destination and renamed over it, so a reader
//! never sees a half-written final output.
//!
//! # Features
//!
//! - Hard links with automatic fallback to copy (e.g. across devices)
//! - Sibling temp paths that keep the destination's extension
//! - Atomic commit by rename
//! - Automatic parent directory creation

mod error;
mod fs_placer;

pub use error::PlacerError;
pub use fs_placer::{FsPlacer, LinkMethod};
