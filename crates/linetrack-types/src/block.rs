use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::range::LineRange;
use crate::side::Side;

/// Opaque annotation attached to a [`Block`] by whoever consumes the blocks.
pub type BlockData = Arc<dyn Any + Send + Sync>;

/// A changed region: lines of buffer 1 that correspond to different lines of
/// buffer 2. Equal regions are the implicit gaps between consecutive blocks.
///
/// The range and flags never change once a block exists. Shifting, merging or
/// re-diffing a block produces a new block, and the new block starts without
/// an annotation; consumers re-attach annotations from the tracker's handler
/// notifications.
#[derive(Clone)]
pub struct Block {
    range: LineRange,
    dirty: bool,
    too_big: bool,
    data: Option<BlockData>,
}

impl Block {
    pub fn new(range: LineRange, dirty: bool, too_big: bool) -> Self {
        Self {
            range,
            dirty,
            too_big,
            data: None,
        }
    }

    /// A clean block as produced by an exact comparison.
    pub fn clean(range: LineRange) -> Self {
        Self::new(range, false, false)
    }

    pub fn range(&self) -> LineRange {
        self.range
    }

    /// Boundaries are approximate and pending an exact re-diff.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The region was last compared with the approximate comparator.
    pub fn is_too_big(&self) -> bool {
        self.too_big
    }

    pub fn data(&self) -> Option<&BlockData> {
        self.data.as_ref()
    }

    pub fn set_data(&mut self, data: Option<BlockData>) {
        self.data = data;
    }

    /// Downcast the annotation to a concrete type.
    pub fn data_as<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.data.as_ref().and_then(|d| d.downcast_ref::<T>())
    }

    /// A copy moved by `delta` lines on `side`, keeping flags, dropping data.
    pub fn shift(&self, side: Side, delta: isize) -> Self {
        Self::new(self.range.shift(side, delta), self.dirty, self.too_big)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("range", &self.range)
            .field("dirty", &self.dirty)
            .field("too_big", &self.too_big)
            .field("has_data", &self.data.is_some())
            .finish()
    }
}
