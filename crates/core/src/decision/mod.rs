//! Sync decisions.
//!
//! The [`Inspector`] probes what already exists for a track and produces a
//! [`ProbedState`]; [`StageSet::decide`] turns that into the ordered stages
//! the track still needs. The decision itself is pure, see [`rules`].

mod inspector;
pub mod rules;
mod stage;

pub use inspector::Inspector;
pub use rules::ProbedState;
pub use stage::{Stage, StageSet};
