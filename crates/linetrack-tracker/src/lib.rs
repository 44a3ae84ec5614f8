//! Incremental diff tracking between two mutable documents.
//!
//! A [`DocumentTracker`] keeps the list of changed [`Block`](linetrack_types::Block)s
//! between two documents current while both are edited. Each edit is projected
//! onto the block list with line arithmetic, leaving at most one dirty block;
//! dirty regions are re-compared exactly once the edit transaction finishes.
//!
//! # Key Types
//!
//! - [`DocumentTracker`] -- Owns the block list, freeze state and document subscriptions
//! - [`TrackerHandler`] -- Observer hooks for block changes and freeze transitions
//! - [`FreezeGuard`] -- Keeps sides frozen for the guard's lifetime
//! - [`RangeChange`] -- One edit projected onto a block list
//!
//! # Freezing
//!
//! While a side is frozen its edits are not tracked. Releasing the last freeze
//! level diffs the freeze-time snapshot against the live text and replays the
//! result as ordinary edits. Document bulk updates freeze the edited side.

mod error;
mod freeze;
mod handler;
mod listener;
mod lock;
mod projector;
mod refresher;
mod store;
mod tracker;

pub use error::{TrackerError, TrackerResult};
pub use handler::{NoopHandler, TrackerHandler};
pub use projector::{project_range_change, RangeChange};
pub use tracker::{DocumentTracker, FreezeGuard};
