//! Foundation types for linetrack.
//!
//! This crate provides the two-sided coordinate types shared by every other
//! linetrack crate: which buffer a quantity belongs to, line ranges pairing a
//! region of one buffer with a region of the other, and the line index used
//! to translate byte offsets into line numbers.
//!
//! # Key Types
//!
//! - [`Side`] -- Buffer 1 (left) or buffer 2 (right), with a symmetric `other()`
//! - [`LineRange`] -- Half-open line ranges on both sides of a comparison
//! - [`Block`] -- A tracked changed region with dirty / too-big flags and an annotation slot
//! - [`LineOffsets`] -- Line start/end index of a text

pub mod block;
pub mod error;
pub mod offsets;
pub mod range;
pub mod side;

pub use block::{Block, BlockData};
pub use error::TypeError;
pub use offsets::LineOffsets;
pub use range::LineRange;
pub use side::Side;
