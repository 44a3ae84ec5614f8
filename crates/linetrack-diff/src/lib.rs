//! Line comparison engine for linetrack.
//!
//! Computes line-level correspondences between two texts, optionally restricted
//! to a sub-range of lines on each side, and synthesizes texts from a set of
//! changed ranges.
//!
//! # Key Types
//!
//! - [`LineComparator`] -- Exact (may decline) and approximate (always succeeds) comparison
//! - [`SimilarComparator`] -- `similar`-backed comparator governed by a [`ComparisonPolicy`]
//! - [`DiffIterable`] -- Changed and unchanged line ranges of one comparison
//! - [`LineEdit`] -- Byte-level edit that replaces whole lines of a text

pub mod comparator;
pub mod iterable;
pub mod modification;
pub mod policy;

pub use comparator::{LineComparator, SimilarComparator, TextLines};
pub use iterable::{DiffIterable, Unchanged};
pub use modification::{apply_modification, replace_lines, LineEdit};
pub use policy::{ComparisonPolicy, DiffAlgorithm};
