//! Per-side freeze bookkeeping and reconciliation of frozen edits.

use std::cell::RefCell;
use std::sync::Arc;

use tracing::debug;

use linetrack_diff::{LineComparator, TextLines};
use linetrack_types::{LineOffsets, Side};

use crate::store::BlockStore;

/// Text of one side captured when it was first frozen, plus the nesting count.
#[derive(Clone, Debug)]
pub(crate) struct FreezeRecord {
    snapshot: Arc<str>,
    count: usize,
}

/// Outcome of releasing one freeze level.
#[derive(Debug)]
pub(crate) enum Release {
    /// The side was not frozen.
    NotFrozen,
    StillFrozen(usize),
    /// Last level released; carries the snapshot taken at freeze time.
    Thawed(Arc<str>),
}

#[derive(Debug, Default)]
pub(crate) struct FreezeState {
    records: RefCell<[Option<FreezeRecord>; 2]>,
}

impl FreezeState {
    pub(crate) fn is_frozen(&self, side: Side) -> bool {
        self.records.borrow()[side.index()].is_some()
    }

    pub(crate) fn is_any_frozen(&self) -> bool {
        Side::BOTH.iter().any(|side| self.is_frozen(*side))
    }

    /// Add one freeze level. `capture` is only called on the first level.
    /// Returns `true` when the side went from unfrozen to frozen.
    pub(crate) fn acquire(&self, side: Side, capture: impl FnOnce() -> Arc<str>) -> bool {
        let mut records = self.records.borrow_mut();
        match &mut records[side.index()] {
            Some(record) => {
                record.count += 1;
                false
            }
            slot @ None => {
                *slot = Some(FreezeRecord {
                    snapshot: capture(),
                    count: 1,
                });
                true
            }
        }
    }

    pub(crate) fn release(&self, side: Side) -> Release {
        let mut records = self.records.borrow_mut();
        let slot = &mut records[side.index()];
        let Some(record) = slot.as_mut() else {
            return Release::NotFrozen;
        };
        if record.count > 1 {
            record.count -= 1;
            return Release::StillFrozen(record.count);
        }
        slot.take()
            .map_or(Release::NotFrozen, |record| Release::Thawed(record.snapshot))
    }

    pub(crate) fn count(&self, side: Side) -> usize {
        self.records.borrow()[side.index()]
            .as_ref()
            .map_or(0, |record| record.count)
    }

    pub(crate) fn snapshot(&self, side: Side) -> Option<Arc<str>> {
        self.records.borrow()[side.index()]
            .as_ref()
            .map(|record| Arc::clone(&record.snapshot))
    }

    /// Replace the snapshot of a frozen side, keeping its count.
    /// Returns `false` if the side is not frozen.
    pub(crate) fn set_snapshot(&self, side: Side, snapshot: Arc<str>) -> bool {
        match &mut self.records.borrow_mut()[side.index()] {
            Some(record) => {
                record.snapshot = snapshot;
                true
            }
            None => false,
        }
    }
}

/// Replay the difference between `snapshot` and `live` on `side` as a series
/// of incremental edits, as if every frozen edit had been seen live.
pub(crate) fn reconcile(
    store: &BlockStore,
    comparator: &dyn LineComparator,
    side: Side,
    snapshot: &str,
    live: &str,
) {
    if snapshot == live {
        return;
    }

    let (old_offsets, new_offsets) = (LineOffsets::new(snapshot), LineOffsets::new(live));
    let diff = comparator.compare(
        TextLines::new(snapshot, &old_offsets),
        TextLines::new(live, &new_offsets),
        None,
    );

    let mut shift = 0isize;
    let mut replayed = 0usize;
    for change in diff.changes() {
        let before_len = change.end1 - change.start1;
        let after_len = change.end2 - change.start2;
        store.range_changed(side, change.start1.saturating_add_signed(shift), before_len, after_len);
        shift += after_len as isize - before_len as isize;
        replayed += 1;
    }
    debug!(%side, replayed, net_shift = shift, "frozen edits reconciled");
}
