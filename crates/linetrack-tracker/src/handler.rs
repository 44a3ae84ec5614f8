use linetrack_types::{Block, Side};

/// Observer of block list changes made by a [`DocumentTracker`](crate::DocumentTracker).
///
/// Every hook has a no-op default. Hooks run while the tracker lock is held;
/// they may call back into the tracker on the same thread, but must not edit
/// the tracked documents.
///
/// Blocks lose their annotation whenever they are shifted, merged or
/// re-diffed. Hooks that receive `&mut Block` may attach one to the new block.
pub trait TrackerHandler: Send + Sync {
    /// A merged dirty span was re-compared; `after` replaces `before`.
    fn on_range_refreshed(&self, _before: &Block, _after: &mut [Block]) {}

    /// An edit absorbed `before` (possibly none) into the single dirty block `after`.
    fn on_ranges_changed(&self, _before: &[Block], _after: &mut Block) {}

    /// A block was moved without changing its size.
    fn on_range_shifted(&self, _before: &Block, _after: &mut Block) {}

    /// Gate for combining two adjacent blocks during a refresh. Returning
    /// `false` keeps them apart and compares each on its own.
    fn on_ranges_merged(&self, _first: &Block, _second: &Block, _merged: &mut Block) -> bool {
        true
    }

    /// Called after each incremental edit has been projected.
    fn after_range_change(&self) {}

    /// Called after the block list was replaced wholesale.
    fn after_bulk_range_change(&self) {}

    fn on_freeze(&self, _side: Side) {}

    fn on_unfreeze(&self, _side: Side) {}

    /// The tracker went from no side frozen to some side frozen.
    fn on_tracker_frozen(&self) {}

    /// The tracker went from some side frozen to no side frozen.
    fn on_tracker_unfrozen(&self) {}
}

/// Handler that ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHandler;

impl TrackerHandler for NoopHandler {}
