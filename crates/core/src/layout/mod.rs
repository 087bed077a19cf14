//! Library layout and per-track path planning.
//!
//! [`LibraryLayout`] owns the run's directory structure; [`PathPlanner`]
//! turns a [`Track`](crate::catalog::Track) into the [`DerivedPaths`] of
//! every artifact that track can produce. All segments pass through
//! [`sanitize_segment`](crate::sanitize::sanitize_segment).

mod error;
mod library;
mod planner;

pub use error::LayoutError;
pub use library::{LibraryLayout, CONVERTED_DIR, ORIGINAL_DIR};
pub use planner::{DerivedPaths, PathPlanner};
