//! Sync scheduler.
//!
//! Runs one pipeline per track, at most `concurrency` at a time:
//! - A permit from a shared semaphore is held for the whole pipeline
//! - Stages run in order; a stage whose input failed is skipped
//! - Every external call has a deadline and races the cancellation token
//! - Every track yields exactly one [`JobOutcome`], in completion order
//!
//! # Example
//!
//! ```ignore
//! use sonicsync_core::scheduler::{SchedulerConfig, SyncScheduler};
//!
//! let scheduler = SyncScheduler::new(SchedulerConfig::default(), catalog, transformer, planner);
//! let outcomes = scheduler
//!     .run(collection.tracks, |outcome| println!("{}", outcome.title))
//!     .await;
//! ```

mod config;
mod pipeline;
mod runner;
mod types;

pub use config::{SchedulerConfig, StageTimeouts};
pub use runner::SyncScheduler;
pub use types::{JobOutcome, TrackFailure};
