use std::cell::{Cell, RefCell};
use std::sync::Arc;

use tracing::debug;

use linetrack_diff::{LineComparator, TextLines};
use linetrack_types::{Block, LineRange, Side};

use crate::handler::TrackerHandler;
use crate::projector::project_range_change;
use crate::refresher::DirtyRegionRefresher;

/// The current block list and its dirty flag.
///
/// Lives inside the tracker lock. No `RefCell` borrow is held while a handler
/// hook runs, so hooks may read the tracker again on the same thread.
pub(crate) struct BlockStore {
    handler: Arc<dyn TrackerHandler>,
    blocks: RefCell<Vec<Block>>,
    dirty: Cell<bool>,
}

impl BlockStore {
    pub(crate) fn new(handler: Arc<dyn TrackerHandler>, blocks: Vec<Block>) -> Self {
        Self {
            handler,
            blocks: RefCell::new(blocks),
            dirty: Cell::new(false),
        }
    }

    pub(crate) fn blocks(&self) -> Vec<Block> {
        self.blocks.borrow().clone()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.blocks.borrow().is_empty()
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Replace every block; the new blocks carry the given dirty flag.
    pub(crate) fn set_ranges(&self, ranges: &[LineRange], dirty: bool) {
        let blocks = ranges
            .iter()
            .map(|range| Block::new(*range, dirty, false))
            .collect();
        self.install(blocks, dirty);
        self.handler.after_bulk_range_change();
    }

    /// Install blocks produced elsewhere (e.g. a full comparison).
    pub(crate) fn set_blocks(&self, blocks: Vec<Block>) {
        self.install(blocks, false);
        self.handler.after_bulk_range_change();
    }

    pub(crate) fn destroy(&self) {
        self.install(Vec::new(), false);
    }

    /// Let the caller touch annotations; ranges and flags are immutable.
    pub(crate) fn annotate(&self, f: &mut dyn FnMut(&mut Block)) {
        let mut blocks = self.blocks();
        blocks.iter_mut().for_each(|block| f(block));
        *self.blocks.borrow_mut() = blocks;
    }

    pub(crate) fn refresh_dirty(
        &self,
        comparator: &dyn LineComparator,
        left: TextLines<'_>,
        right: TextLines<'_>,
        fast_refresh: bool,
    ) {
        if !self.dirty.get() {
            return;
        }
        let current = self.blocks();
        let refreshed = DirtyRegionRefresher::new(self.handler.as_ref(), comparator, left, right)
            .refresh(&current, fast_refresh);
        debug!(
            before = current.len(),
            after = refreshed.len(),
            fast_refresh,
            "dirty blocks refreshed"
        );
        self.install(refreshed, false);
        self.handler.after_bulk_range_change();
    }

    pub(crate) fn range_changed(&self, side: Side, start_line: usize, before_len: usize, after_len: usize) {
        let current = self.blocks();
        let mut change = project_range_change(&current, side, start_line, before_len, after_len);

        self.handler
            .on_ranges_changed(&change.affected, &mut change.new_affected);
        for (old, new) in change.after.iter().zip(change.new_after.iter_mut()) {
            self.handler.on_range_shifted(old, new);
        }

        self.install(change.into_blocks(), true);
        self.handler.after_range_change();
    }

    /// Remove the blocks matching `predicate` and return them. Remaining
    /// blocks shift on `side` by the size change of the removed ones before
    /// them, as if each removed block's `side` lines were replaced by the
    /// other side's lines.
    pub(crate) fn partially_apply(&self, side: Side, predicate: &mut dyn FnMut(&Block) -> bool) -> Vec<Block> {
        let current = self.blocks();
        let mut retained = Vec::with_capacity(current.len());
        let mut applied = Vec::new();

        let mut shift = 0isize;
        for block in current {
            if predicate(&block) {
                shift += block.range().delta(side);
                applied.push(block);
            } else {
                let mut shifted = block.shift(side, shift);
                self.handler.on_range_shifted(&block, &mut shifted);
                retained.push(shifted);
            }
        }

        let dirty = self.dirty.get();
        self.install(retained, dirty);
        self.handler.after_bulk_range_change();
        applied
    }

    fn install(&self, blocks: Vec<Block>, dirty: bool) {
        *self.blocks.borrow_mut() = blocks;
        self.dirty.set(dirty);
    }
}
