//! Core engine for mirroring a Subsonic collection to local storage.
//!
//! The crate is organised leaves first:
//! - [`sanitize`]: filesystem-safe path segments
//! - [`layout`]: directory setup and per-track path planning
//! - [`decision`]: probing existing artifacts and choosing pipeline stages
//! - [`scheduler`]: bounded-concurrency execution of per-track pipelines
//! - [`report`]: human readable progress lines
//!
//! External collaborators sit behind traits in [`catalog`] and [`transform`].

pub mod catalog;
pub mod config;
pub mod decision;
pub mod layout;
pub mod placer;
pub mod report;
pub mod sanitize;
pub mod scheduler;
pub mod session;
pub mod target;
pub mod testing;
pub mod transform;

pub use catalog::{AlbumArtistCache, Catalog, CatalogError, Collection, SubsonicClient, Track};
pub use config::{
    load_config, load_config_from_str, load_layered_config, validate_config, Config, ConfigError,
    SanitizedConfig, ServerConfig, SyncConfig,
};
pub use decision::{Inspector, ProbedState, Stage, StageSet};
pub use layout::{DerivedPaths, LayoutError, LibraryLayout, PathPlanner};
pub use report::{ProgressReporter, RunSummary};
pub use sanitize::sanitize_segment;
pub use scheduler::{JobOutcome, SchedulerConfig, StageTimeouts, SyncScheduler, TrackFailure};
pub use session::{SyncError, SyncSession};
pub use target::SyncTarget;
pub use transform::{CoverStream, FfmpegTransformer, MediaTransform, TransformError, TransformerConfig};
