use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use linetrack_diff::{
    apply_modification, replace_lines, DiffIterable, LineComparator, SimilarComparator, TextLines,
};
use linetrack_document::{Document, DocumentListener, DocumentSnapshot, SubscriptionId};
use linetrack_types::{Block, LineOffsets, LineRange, Side};

use crate::error::TrackerResult;
use crate::freeze::{self, FreezeState, Release};
use crate::handler::TrackerHandler;
use crate::listener::SideListener;
use crate::lock::TrackerLock;
use crate::store::BlockStore;

struct TrackerState {
    store: BlockStore,
    freeze: FreezeState,
}

/// Keeps the changed blocks between two documents up to date as either is
/// edited.
///
/// Ordinary edits shift or dirty blocks with line arithmetic; dirty regions
/// are re-compared exactly after each edit transaction. A frozen side stops
/// tracking edits and is reconciled against its freeze-time snapshot when the
/// last freeze level is released.
///
/// All state sits behind one reentrant lock. Callers must not edit or query
/// the documents from inside [`read_lock`](Self::read_lock) /
/// [`write_lock`](Self::write_lock) or a handler hook.
pub struct DocumentTracker {
    documents: [Arc<dyn Document>; 2],
    comparator: Arc<dyn LineComparator>,
    handler: Arc<dyn TrackerHandler>,
    state: TrackerLock<TrackerState>,
    disposed: AtomicBool,
    listeners: [Arc<SideListener>; 2],
    subscriptions: Mutex<Vec<(Side, SubscriptionId)>>,
}

impl DocumentTracker {
    /// Track `left` against `right` with the default comparator.
    ///
    /// # Panics
    ///
    /// Panics if both handles point to the same document.
    pub fn new(
        left: Arc<dyn Document>,
        right: Arc<dyn Document>,
        handler: Arc<dyn TrackerHandler>,
    ) -> Arc<Self> {
        Self::with_comparator(left, right, handler, Arc::new(SimilarComparator::default()))
    }

    pub fn with_comparator(
        left: Arc<dyn Document>,
        right: Arc<dyn Document>,
        handler: Arc<dyn TrackerHandler>,
        comparator: Arc<dyn LineComparator>,
    ) -> Arc<Self> {
        assert!(
            !Arc::ptr_eq(&left, &right),
            "a document cannot be tracked against itself"
        );

        let blocks = compare_texts(comparator.as_ref(), &left.text(), &right.text());
        let initial = blocks.len();

        let tracker = Arc::new_cyclic(|weak: &Weak<Self>| Self {
            documents: [left, right],
            state: TrackerLock::new(TrackerState {
                store: BlockStore::new(Arc::clone(&handler), blocks),
                freeze: FreezeState::default(),
            }),
            comparator,
            handler,
            disposed: AtomicBool::new(false),
            listeners: [
                Arc::new(SideListener::new(weak.clone(), Side::Left)),
                Arc::new(SideListener::new(weak.clone(), Side::Right)),
            ],
            subscriptions: Mutex::new(Vec::with_capacity(2)),
        });

        for side in Side::BOTH {
            let listener = Arc::downgrade(&tracker.listeners[side.index()]) as Weak<dyn DocumentListener>;
            let id = tracker.document(side).subscribe(listener);
            tracker.subscriptions.lock().push((side, id));

            if tracker.document(side).is_in_bulk_update() {
                tracker.freeze(side);
            }
        }

        info!(
            left_lines = tracker.documents[0].line_count(),
            right_lines = tracker.documents[1].line_count(),
            blocks = initial,
            "document tracker created"
        );
        tracker
    }

    /// Stop tracking. Clears the blocks and unsubscribes from both documents;
    /// every later call is a no-op. Idempotent.
    pub fn dispose(&self) {
        let first = self.state.with(|state| {
            if self.disposed.load(Ordering::SeqCst) {
                return false;
            }
            state.store.destroy();
            self.disposed.store(true, Ordering::SeqCst);
            true
        });
        if !first {
            return;
        }

        let subscriptions: Vec<_> = self.subscriptions.lock().drain(..).collect();
        for (side, id) in subscriptions {
            self.document(side).unsubscribe(id);
        }
        info!("document tracker disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn document(&self, side: Side) -> &Arc<dyn Document> {
        &self.documents[side.index()]
    }

    /// Snapshot of the current blocks.
    pub fn blocks(&self) -> Vec<Block> {
        self.state.with(|state| state.store.blocks())
    }

    /// Run `f` with the tracker lock held.
    pub fn read_lock<R>(&self, f: impl FnOnce() -> R) -> R {
        self.state.with(|_| f())
    }

    /// Run `f` with the tracker lock held. There is a single lock, so this is
    /// the same as [`read_lock`](Self::read_lock).
    pub fn write_lock<R>(&self, f: impl FnOnce() -> R) -> R {
        self.state.with(|_| f())
    }

    pub fn is_lock_held_by_current_thread(&self) -> bool {
        self.state.is_held_by_current_thread()
    }

    /// Whether either side is frozen.
    pub fn is_frozen(&self) -> bool {
        self.state.with(|state| state.freeze.is_any_frozen())
    }

    pub fn is_side_frozen(&self, side: Side) -> bool {
        self.state.with(|state| state.freeze.is_frozen(side))
    }

    /// Stop tracking edits on `side` until a matching [`unfreeze`](Self::unfreeze).
    /// Nested calls are counted.
    pub fn freeze(&self, side: Side) {
        if self.is_disposed() {
            return;
        }
        let document = self.document(side);
        self.state.with(|state| {
            let was_frozen = state.freeze.is_any_frozen();
            if !state.freeze.acquire(side, || document.text()) {
                return;
            }
            debug!(%side, "side frozen");
            self.handler.on_freeze(side);
            if !was_frozen {
                self.handler.on_tracker_frozen();
            }
        });
    }

    /// Release one freeze level on `side`. Releasing the last level replays
    /// the edits made while frozen and refreshes dirty blocks.
    pub fn unfreeze(&self, side: Side) {
        if self.is_disposed() {
            return;
        }
        self.state.with(|state| match state.freeze.release(side) {
            Release::NotFrozen => {
                error!(
                    %side,
                    left = state.freeze.count(Side::Left),
                    right = state.freeze.count(Side::Right),
                    "unfreeze without matching freeze"
                );
            }
            Release::StillFrozen(remaining) => {
                debug!(%side, remaining, "freeze level released");
            }
            Release::Thawed(snapshot) => {
                let live = self.document(side).text();
                freeze::reconcile(&state.store, self.comparator.as_ref(), side, &snapshot, &live);
                debug!(%side, "side unfrozen");

                self.refresh_dirty(false, false);
                self.handler.on_unfreeze(side);
                if !state.freeze.is_any_frozen() {
                    self.handler.on_tracker_unfrozen();
                }
            }
        });
    }

    /// Freeze `side` for as long as the returned guard lives.
    pub fn freeze_guard(&self, side: Side) -> FreezeGuard<'_> {
        self.freeze(side);
        FreezeGuard {
            tracker: self,
            sides: vec![side],
        }
    }

    /// Freeze both sides for as long as the returned guard lives.
    pub fn freeze_guard_both(&self) -> FreezeGuard<'_> {
        Side::BOTH.iter().for_each(|side| self.freeze(*side));
        FreezeGuard {
            tracker: self,
            sides: Side::BOTH.to_vec(),
        }
    }

    /// Run `task` with `side` frozen. The side is unfrozen on every exit path.
    pub fn do_frozen<R>(&self, side: Side, task: impl FnOnce() -> R) -> R {
        let _guard = self.freeze_guard(side);
        task()
    }

    /// Run `task` with both sides frozen.
    pub fn do_frozen_both<R>(&self, task: impl FnOnce() -> R) -> R {
        let _guard = self.freeze_guard_both();
        task()
    }

    /// The freeze-time snapshot of a frozen side, or the live text.
    pub fn get_content(&self, side: Side) -> Arc<str> {
        self.state.with(|state| self.content_locked(state, side))
    }

    /// Re-compare dirty blocks against [`get_content`](Self::get_content).
    /// Does nothing while a side is frozen unless `force_in_frozen` is set;
    /// a forced refresh still compares the freeze-time snapshots.
    pub fn refresh_dirty(&self, fast_refresh: bool, force_in_frozen: bool) {
        if self.is_disposed() {
            return;
        }
        self.state.with(|state| {
            if state.freeze.is_any_frozen() && !force_in_frozen {
                return;
            }
            self.refresh_locked(state, fast_refresh);
        });
    }

    /// Bring frozen snapshots up to the live text and refresh, so the blocks
    /// describe the documents as they are now.
    pub fn update_frozen_content_if_needed(&self) {
        if self.is_disposed() {
            return;
        }
        self.state.with(|state| {
            self.sync_frozen_sides(state);
            self.refresh_locked(state, false);
        });
    }

    /// Apply the blocks matching `predicate` to `side`: each one's `side`
    /// lines are replaced with the other side's lines, and the block is
    /// removed. `on_applied` receives each applied block with the line shift
    /// on `side` caused by the blocks applied before it.
    pub fn partially_apply_blocks(
        &self,
        side: Side,
        mut predicate: impl FnMut(&Block) -> bool,
        mut on_applied: impl FnMut(&Block, isize),
    ) -> TrackerResult<()> {
        if self.is_disposed() {
            return Ok(());
        }
        let other = side.other();
        let _guard = self.freeze_guard_both();

        let applied = self.state.with(|state| {
            self.sync_frozen_sides(state);
            self.refresh_locked(state, false);
            state.store.partially_apply(side, &mut predicate)
        });

        let target = self.document(side);
        let source = self.document(other).snapshot();
        let mut shift = 0isize;
        for block in &applied {
            let range = block.range();
            let current = target.snapshot();
            let edit = replace_lines(
                TextLines::new(&current.text, &current.offsets),
                range.start(side).saturating_add_signed(shift),
                range.end(side).saturating_add_signed(shift),
                TextLines::new(&source.text, &source.offsets),
                range.start(other),
                range.end(other),
            );
            if let Some(edit) = edit {
                if let Err(err) = target.replace(edit.range, &edit.text) {
                    error!(%side, %err, "partial application failed");
                    self.rebuild_after_failed_apply(side);
                    return Err(err.into());
                }
            }
            on_applied(block, shift);
            shift += range.delta(side);
        }

        self.state.with(|state| {
            state.freeze.set_snapshot(side, target.text());
        });
        debug!(%side, applied = applied.len(), "blocks applied");
        Ok(())
    }

    /// The text `side` would have after applying the blocks matching
    /// `predicate`, without touching either document.
    pub fn get_content_with_partially_applied_blocks(
        &self,
        side: Side,
        mut predicate: impl FnMut(&Block) -> bool,
    ) -> String {
        let other = side.other();
        let (blocks, content, other_content) = self.state.with(|state| {
            if !self.is_disposed() {
                self.sync_frozen_sides(state);
                self.refresh_locked(state, false);
            }
            let blocks: Vec<Block> = state
                .store
                .blocks()
                .into_iter()
                .filter(|block| predicate(block))
                .collect();
            (
                blocks,
                self.content_locked(state, side),
                self.content_locked(state, other),
            )
        });

        let ranges: Vec<LineRange> = blocks
            .iter()
            .map(|block| {
                let range = block.range();
                LineRange::new(
                    range.start(side),
                    range.end(side),
                    range.start(other),
                    range.end(other),
                )
            })
            .collect();
        let (offsets, other_offsets) = (LineOffsets::new(&content), LineOffsets::new(&other_content));
        apply_modification(
            TextLines::new(&content, &offsets),
            TextLines::new(&other_content, &other_offsets),
            &ranges,
        )
    }

    /// Install `ranges` as the blocks for the given contents, which become
    /// the frozen snapshots. Both sides must be frozen. Returns `false`, and
    /// changes nothing, if a range is out of bounds or the text between the
    /// ranges differs.
    pub fn set_frozen_state(&self, content1: &str, content2: &str, ranges: &[LineRange]) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.state.with(|state| {
            if !self.is_fully_frozen(state) {
                return false;
            }
            if !is_valid_state(content1, content2, ranges) {
                warn!(ranges = ranges.len(), "frozen state rejected");
                return false;
            }
            state.freeze.set_snapshot(Side::Left, Arc::from(content1));
            state.freeze.set_snapshot(Side::Right, Arc::from(content2));
            state.store.set_ranges(ranges, true);
            true
        })
    }

    /// [`set_frozen_state`](Self::set_frozen_state) against the current
    /// frozen snapshots.
    pub fn set_frozen_state_ranges(&self, ranges: &[LineRange]) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.state.with(|state| {
            if !self.is_fully_frozen(state) {
                return false;
            }
            let content1 = self.content_locked(state, Side::Left);
            let content2 = self.content_locked(state, Side::Right);
            if !is_valid_state(&content1, &content2, ranges) {
                warn!(ranges = ranges.len(), "frozen state rejected");
                return false;
            }
            state.store.set_ranges(ranges, true);
            true
        })
    }

    /// Attach or replace annotations on the current blocks.
    pub fn annotate_blocks(&self, mut f: impl FnMut(&mut Block)) {
        self.state.with(|state| state.store.annotate(&mut f));
    }

    pub(crate) fn range_changed(&self, side: Side, start_line: usize, before_len: usize, after_len: usize) {
        self.state.with(|state| {
            if self.is_disposed() || state.freeze.is_frozen(side) {
                return;
            }
            state.store.range_changed(side, start_line, before_len, after_len);
        });
    }

    fn content_locked(&self, state: &TrackerState, side: Side) -> Arc<str> {
        state
            .freeze
            .snapshot(side)
            .unwrap_or_else(|| self.document(side).text())
    }

    fn is_fully_frozen(&self, state: &TrackerState) -> bool {
        let frozen = Side::BOTH.iter().all(|side| state.freeze.is_frozen(*side));
        if !frozen {
            warn!("frozen state requires both sides frozen");
        }
        frozen
    }

    /// Replay edits made on frozen sides and adopt the live text as snapshot.
    fn sync_frozen_sides(&self, state: &TrackerState) {
        for side in Side::BOTH {
            let Some(snapshot) = state.freeze.snapshot(side) else {
                continue;
            };
            let live = self.document(side).text();
            freeze::reconcile(&state.store, self.comparator.as_ref(), side, &snapshot, &live);
            state.freeze.set_snapshot(side, live);
        }
    }

    /// The text and line index the blocks currently describe for `side`.
    fn snapshot_locked(&self, state: &TrackerState, side: Side) -> DocumentSnapshot {
        match state.freeze.snapshot(side) {
            Some(text) => DocumentSnapshot {
                offsets: Arc::new(LineOffsets::new(&text)),
                text,
            },
            None => self.document(side).snapshot(),
        }
    }

    fn refresh_locked(&self, state: &TrackerState, fast_refresh: bool) {
        let left = self.snapshot_locked(state, Side::Left);
        let right = self.snapshot_locked(state, Side::Right);

        if state.store.is_dirty() && !state.store.is_empty() && left.text == right.text {
            debug!("documents identical, dropping blocks");
            state.store.set_ranges(&[], false);
            return;
        }

        state.store.refresh_dirty(
            self.comparator.as_ref(),
            TextLines::new(&left.text, &left.offsets),
            TextLines::new(&right.text, &right.offsets),
            fast_refresh,
        );
    }

    /// After a failed write the blocks no longer match the documents; adopt
    /// the written side's live text and compare from scratch.
    fn rebuild_after_failed_apply(&self, side: Side) {
        self.state.with(|state| {
            state.freeze.set_snapshot(side, self.document(side).text());
            let left = self.content_locked(state, Side::Left);
            let right = self.content_locked(state, Side::Right);
            state
                .store
                .set_blocks(compare_texts(self.comparator.as_ref(), &left, &right));
        });
    }
}

impl std::fmt::Debug for DocumentTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentTracker")
            .field("disposed", &self.is_disposed())
            .field("frozen", &self.is_frozen())
            .field("blocks", &self.blocks().len())
            .finish()
    }
}

/// Keeps one or both sides of a tracker frozen until dropped.
#[must_use = "the sides are unfrozen as soon as the guard is dropped"]
pub struct FreezeGuard<'a> {
    tracker: &'a DocumentTracker,
    sides: Vec<Side>,
}

impl Drop for FreezeGuard<'_> {
    fn drop(&mut self) {
        for side in self.sides.iter().rev() {
            self.tracker.unfreeze(*side);
        }
    }
}

/// Full comparison of two texts into blocks. Blocks from the approximate
/// comparator are marked too big.
fn compare_texts(comparator: &dyn LineComparator, left: &str, right: &str) -> Vec<Block> {
    let (left_offsets, right_offsets) = (LineOffsets::new(left), LineOffsets::new(right));
    let (left, right) = (
        TextLines::new(left, &left_offsets),
        TextLines::new(right, &right_offsets),
    );
    let (diff, too_big) = match comparator.try_compare(left, right, None) {
        Some(diff) => (diff, false),
        None => (comparator.fast_compare(left, right, None), true),
    };
    diff.changes()
        .map(|range| Block::new(range, false, too_big))
        .collect()
}

/// Whether `ranges` fit both contents, are sorted and disjoint, and every
/// line between them is equal on both sides.
fn is_valid_state(content1: &str, content2: &str, ranges: &[LineRange]) -> bool {
    let (offsets1, offsets2) = (LineOffsets::new(content1), LineOffsets::new(content2));
    let (count1, count2) = (offsets1.line_count(), offsets2.line_count());

    let in_bounds = ranges.iter().all(|range| {
        range.start1 <= range.end1
            && range.end1 <= count1
            && range.start2 <= range.end2
            && range.end2 <= count2
    });
    let ordered = ranges
        .windows(2)
        .all(|pair| pair[0].end1 <= pair[1].start1 && pair[0].end2 <= pair[1].start2);
    if !in_bounds || !ordered {
        return false;
    }

    DiffIterable::from_ranges(ranges, count1, count2)
        .unchanged()
        .all(|gap| {
            offsets1.lines(content1, gap.start1, gap.end1)
                == offsets2.lines(content2, gap.start2, gap.end2)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::NoopHandler;
    use linetrack_diff::ComparisonPolicy;
    use linetrack_document::MemoryDocument;
    use proptest::prelude::*;
    use std::sync::OnceLock;

    fn ranges(blocks: &[Block]) -> Vec<LineRange> {
        blocks.iter().map(Block::range).collect()
    }

    fn setup_with(
        left: &str,
        right: &str,
        handler: Arc<dyn TrackerHandler>,
    ) -> (Arc<MemoryDocument>, Arc<MemoryDocument>, Arc<DocumentTracker>) {
        let d1 = Arc::new(MemoryDocument::new(left));
        let d2 = Arc::new(MemoryDocument::new(right));
        let tracker = DocumentTracker::new(d1.clone(), d2.clone(), handler);
        (d1, d2, tracker)
    }

    fn setup(left: &str, right: &str) -> (Arc<MemoryDocument>, Arc<MemoryDocument>, Arc<DocumentTracker>) {
        setup_with(left, right, Arc::new(NoopHandler))
    }

    /// Blocks sorted and disjoint on both sides, and every gap equal text.
    fn assert_consistent(tracker: &DocumentTracker) {
        let blocks = tracker.blocks();
        let (left, right) = (tracker.get_content(Side::Left), tracker.get_content(Side::Right));
        assert!(
            is_valid_state(&left, &right, &ranges(&blocks)),
            "inconsistent blocks {:?} for {left:?} / {right:?}",
            ranges(&blocks)
        );
    }

    #[derive(Default)]
    struct Log(Mutex<Vec<String>>);

    impl Log {
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.0.lock())
        }
    }

    impl TrackerHandler for Log {
        fn on_freeze(&self, side: Side) {
            self.0.lock().push(format!("freeze {side}"));
        }

        fn on_unfreeze(&self, side: Side) {
            self.0.lock().push(format!("unfreeze {side}"));
        }

        fn on_tracker_frozen(&self) {
            self.0.lock().push("frozen".into());
        }

        fn on_tracker_unfrozen(&self) {
            self.0.lock().push("unfrozen".into());
        }
    }

    #[test]
    fn initial_comparison() {
        let (_d1, _d2, tracker) = setup("a\nb\nc", "a\nB\nc\nd");
        assert_eq!(
            ranges(&tracker.blocks()),
            vec![LineRange::new(1, 2, 1, 2), LineRange::new(3, 3, 3, 4)]
        );
        assert!(tracker.blocks().iter().all(|b| !b.is_dirty() && !b.is_too_big()));
    }

    #[test]
    fn initial_blocks_with_blank_lines_are_disjoint() {
        let (_d1, _d2, tracker) = setup("\nb\n \n\n ", "b\nb\nx\nb\nx");
        assert_eq!(
            ranges(&tracker.blocks()),
            vec![LineRange::new(0, 1, 0, 0), LineRange::new(2, 5, 1, 5)]
        );
        assert_consistent(&tracker);
    }

    #[test]
    fn declined_initial_comparison_is_too_big() {
        let d1: Arc<dyn Document> = Arc::new(MemoryDocument::new("a\nb"));
        let d2: Arc<dyn Document> = Arc::new(MemoryDocument::new("x\ny"));
        let tracker = DocumentTracker::with_comparator(
            d1,
            d2,
            Arc::new(NoopHandler),
            Arc::new(SimilarComparator::new(ComparisonPolicy::approximate_only())),
        );
        let blocks = tracker.blocks();
        assert_eq!(ranges(&blocks), vec![LineRange::new(0, 2, 0, 2)]);
        assert!(blocks[0].is_too_big());
    }

    #[test]
    #[should_panic(expected = "against itself")]
    fn same_document_twice_panics() {
        let document: Arc<dyn Document> = Arc::new(MemoryDocument::new("a"));
        DocumentTracker::new(document.clone(), document, Arc::new(NoopHandler));
    }

    #[test]
    fn insert_then_delete_line() {
        let (_d1, d2, tracker) = setup("a", "a");
        assert!(tracker.blocks().is_empty());

        d2.insert(0, "b\n").unwrap();
        assert_eq!(ranges(&tracker.blocks()), vec![LineRange::new(0, 0, 0, 1)]);
        assert!(!tracker.blocks()[0].is_dirty());

        d2.delete(0..2).unwrap();
        assert!(tracker.blocks().is_empty());
    }

    #[test]
    fn edit_above_block_shifts_it() {
        let (d1, _d2, tracker) = setup("a\nb\nc\nd", "a\nb\nX\nd");
        assert_eq!(ranges(&tracker.blocks()), vec![LineRange::new(2, 3, 2, 3)]);

        d1.insert(0, "new\nlines\nhere\n").unwrap();
        assert_eq!(
            ranges(&tracker.blocks()),
            vec![LineRange::new(0, 3, 0, 0), LineRange::new(5, 6, 2, 3)]
        );
    }

    #[test]
    fn dirty_until_transaction_finishes() {
        let (d1, _d2, tracker) = setup("a\nb", "a\nb");
        d1.transact(|doc| {
            doc.insert(0, "x").unwrap();
            let blocks = tracker.blocks();
            assert_eq!(blocks.len(), 1);
            assert!(blocks[0].is_dirty());
        });
        let blocks = tracker.blocks();
        assert_eq!(ranges(&blocks), vec![LineRange::new(0, 1, 0, 1)]);
        assert!(!blocks[0].is_dirty());
    }

    #[test]
    fn refresh_is_idempotent() {
        let (d1, d2, tracker) = setup("a\nb\nc", "a\nb\nc");
        d1.transact(|doc| {
            doc.insert(0, "q\n").unwrap();
            d2.replace(4..5, "Z").unwrap();
        });
        tracker.refresh_dirty(false, false);
        let first = ranges(&tracker.blocks());
        tracker.refresh_dirty(false, false);
        assert_eq!(first, ranges(&tracker.blocks()));
        assert_consistent(&tracker);
    }

    #[test]
    fn frozen_edits_match_live_edits() {
        let edits: [(usize, usize, &str); 3] = [(0, 1, "A"), (4, 0, "new\n"), (9, 3, "")];

        let (live_doc, _, live) = setup("a\nb\nc\nd\ne\nf", "a\nb\nc\nd\ne\nf");
        for (offset, remove, insert) in edits {
            live_doc.replace(offset..offset + remove, insert).unwrap();
        }
        live.refresh_dirty(false, false);

        let (frozen_doc, _, frozen) = setup("a\nb\nc\nd\ne\nf", "a\nb\nc\nd\ne\nf");
        frozen.do_frozen(Side::Left, || {
            for (offset, remove, insert) in edits {
                frozen_doc.replace(offset..offset + remove, insert).unwrap();
            }
            assert!(frozen.blocks().is_empty());
        });
        frozen.refresh_dirty(false, false);

        assert_eq!(&*live_doc.text(), &*frozen_doc.text());
        assert_eq!(ranges(&live.blocks()), ranges(&frozen.blocks()));
        assert_consistent(&frozen);
    }

    #[test]
    fn merge_veto_refreshes_blocks_separately() {
        struct Veto(Mutex<Vec<LineRange>>);

        impl TrackerHandler for Veto {
            fn on_range_refreshed(&self, before: &Block, _after: &mut [Block]) {
                self.0.lock().push(before.range());
            }

            fn on_ranges_merged(&self, _first: &Block, _second: &Block, _merged: &mut Block) -> bool {
                false
            }
        }

        let handler = Arc::new(Veto(Mutex::new(Vec::new())));
        let (d1, _d2, tracker) = setup_with("a\n \nc", "a\n \nc", handler.clone());
        d1.transact(|doc| {
            doc.replace(0..1, "A").unwrap();
            doc.replace(4..5, "C").unwrap();
        });

        assert_eq!(
            ranges(&tracker.blocks()),
            vec![LineRange::new(0, 1, 0, 1), LineRange::new(2, 3, 2, 3)]
        );
        let refreshed = handler.0.lock();
        assert!(refreshed.iter().all(|range| *range != LineRange::new(0, 3, 0, 3)));
    }

    #[test]
    fn set_frozen_state_round_trip() {
        let (_d1, _d2, tracker) = setup("a\nb\nc", "a\nx\nc");
        let installed = [LineRange::new(1, 2, 1, 2)];

        assert!(!tracker.set_frozen_state("a\nb\nc", "a\nx\nc", &installed));

        tracker.do_frozen_both(|| {
            assert!(tracker.set_frozen_state("a\nb\nc", "a\nx\nc", &installed));
            assert_eq!(ranges(&tracker.blocks()), installed.to_vec());

            // Gap line 2 differs ("c" vs "C").
            let before = ranges(&tracker.blocks());
            assert!(!tracker.set_frozen_state("a\nb\nc", "a\nx\nC", &installed));
            assert_eq!(ranges(&tracker.blocks()), before);

            // Out of bounds.
            assert!(!tracker.set_frozen_state_ranges(&[LineRange::new(1, 9, 1, 2)]));
            // Overlapping.
            assert!(!tracker.set_frozen_state_ranges(&[
                LineRange::new(0, 2, 0, 2),
                LineRange::new(1, 3, 1, 3),
            ]));
            assert!(tracker.set_frozen_state_ranges(&[LineRange::new(0, 3, 0, 3)]));
        });

        assert_eq!(ranges(&tracker.blocks()), vec![LineRange::new(1, 2, 1, 2)]);
    }

    #[test]
    fn partially_apply_all_blocks() {
        let (d1, d2, tracker) = setup("a\nb\nc\nd\ne", "a\nB\nB2\nc\nd\nE");
        assert_eq!(tracker.blocks().len(), 2);

        let mut shifts = Vec::new();
        tracker
            .partially_apply_blocks(Side::Left, |_| true, |block, shift| {
                shifts.push((block.range(), shift));
            })
            .unwrap();

        assert_eq!(&*d1.text(), &*d2.text());
        assert!(tracker.blocks().is_empty());
        assert!(!tracker.is_frozen());
        assert_eq!(
            shifts,
            vec![
                (LineRange::new(1, 2, 1, 3), 0),
                (LineRange::new(4, 5, 5, 6), 1),
            ]
        );
    }

    #[test]
    fn partially_apply_first_block_only() {
        let (d1, _d2, tracker) = setup("a\nb\nc\nd\ne", "a\nB\nB2\nc\nd\nE");
        tracker
            .partially_apply_blocks(Side::Left, |block| block.range().start1 == 1, |_, _| {})
            .unwrap();

        assert_eq!(&*d1.text(), "a\nB\nB2\nc\nd\ne");
        assert_eq!(ranges(&tracker.blocks()), vec![LineRange::new(5, 6, 5, 6)]);
        assert_consistent(&tracker);
    }

    #[test]
    fn revert_into_right_side() {
        let (d1, d2, tracker) = setup("a\nb\nc", "a\nc");
        tracker
            .partially_apply_blocks(Side::Right, |_| true, |_, _| {})
            .unwrap();
        assert_eq!(&*d2.text(), &*d1.text());
        assert!(tracker.blocks().is_empty());
    }

    #[test]
    fn preview_leaves_documents_alone() {
        let (d1, d2, tracker) = setup("a\nb\nc\nd\ne", "a\nB\nB2\nc\nd\nE");
        let preview = tracker.get_content_with_partially_applied_blocks(Side::Left, |block| {
            block.range().start1 == 4
        });
        assert_eq!(preview, "a\nb\nc\nd\nE");
        assert_eq!(&*d1.text(), "a\nb\nc\nd\ne");
        assert_eq!(&*d2.text(), "a\nB\nB2\nc\nd\nE");
        assert_eq!(tracker.blocks().len(), 2);
    }

    #[test]
    fn freeze_hooks_fire_on_transitions() {
        let log = Arc::new(Log::default());
        let (_d1, _d2, tracker) = setup_with("a", "a", log.clone());

        tracker.freeze(Side::Left);
        tracker.freeze(Side::Left);
        tracker.freeze(Side::Right);
        assert_eq!(log.take(), vec!["freeze left", "frozen", "freeze right"]);

        tracker.unfreeze(Side::Left);
        assert!(log.take().is_empty());
        tracker.unfreeze(Side::Right);
        tracker.unfreeze(Side::Left);
        assert_eq!(log.take(), vec!["unfreeze right", "unfreeze left", "unfrozen"]);
        assert!(!tracker.is_frozen());
    }

    #[test]
    fn unbalanced_unfreeze_is_ignored() {
        let log = Arc::new(Log::default());
        let (_d1, _d2, tracker) = setup_with("a", "b", log.clone());
        tracker.unfreeze(Side::Right);
        assert!(log.take().is_empty());
        assert!(!tracker.is_frozen());
        assert_eq!(tracker.blocks().len(), 1);
    }

    #[test]
    fn content_while_frozen_is_snapshot() {
        let (d1, _d2, tracker) = setup("a", "a");
        let _guard = tracker.freeze_guard(Side::Left);
        d1.insert(1, "bc").unwrap();
        assert_eq!(&*tracker.get_content(Side::Left), "a");
        assert_eq!(&*tracker.get_content(Side::Right), "a");

        tracker.update_frozen_content_if_needed();
        assert_eq!(&*tracker.get_content(Side::Left), "abc");
        assert_eq!(ranges(&tracker.blocks()), vec![LineRange::new(0, 1, 0, 1)]);
        assert!(tracker.is_side_frozen(Side::Left));
    }

    #[test]
    fn forced_refresh_keeps_frozen_snapshot() {
        let (d1, _d2, tracker) = setup("a", "a");
        let _guard = tracker.freeze_guard(Side::Left);
        d1.insert(1, "bc").unwrap();

        tracker.refresh_dirty(false, true);
        assert_eq!(&*tracker.get_content(Side::Left), "a");
        assert!(tracker.blocks().is_empty());
        assert_consistent(&tracker);
    }

    #[test]
    fn do_frozen_unfreezes_when_task_panics() {
        let (d1, _d2, tracker) = setup("a", "a");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tracker.do_frozen(Side::Left, || {
                d1.insert(0, "x\n").unwrap();
                panic!("task failed");
            })
        }));

        assert!(result.is_err());
        assert!(!tracker.is_frozen());
        tracker.refresh_dirty(false, false);
        assert_eq!(ranges(&tracker.blocks()), vec![LineRange::new(0, 1, 0, 0)]);
        assert_consistent(&tracker);
    }

    #[test]
    fn do_frozen_unfreezes_when_task_fails() {
        let (_d1, d2, tracker) = setup("a", "a");
        let result: linetrack_document::DocumentResult<()> = tracker.do_frozen_both(|| {
            d2.insert(0, "y\n")?;
            d2.insert(99, "z")?;
            Ok(())
        });

        assert!(result.is_err());
        assert!(!tracker.is_frozen());
        tracker.refresh_dirty(false, false);
        assert_eq!(ranges(&tracker.blocks()), vec![LineRange::new(0, 0, 0, 1)]);
    }

    #[test]
    fn bulk_update_acts_as_freeze() {
        let (d1, _d2, tracker) = setup("a\nb", "a\nb");
        d1.bulk_update(|doc| {
            assert!(tracker.is_side_frozen(Side::Left));
            doc.set_text("a\nX\nb").unwrap();
            assert!(tracker.blocks().is_empty());
        });
        assert!(!tracker.is_frozen());
        assert_eq!(ranges(&tracker.blocks()), vec![LineRange::new(1, 2, 1, 1)]);
    }

    #[test]
    fn document_in_bulk_update_starts_frozen() {
        let d1 = Arc::new(MemoryDocument::new("a"));
        let d2 = Arc::new(MemoryDocument::new("a"));
        let tracker = d1.bulk_update(|doc| {
            let tracker = DocumentTracker::new(d1.clone(), d2.clone(), Arc::new(NoopHandler));
            assert!(tracker.is_side_frozen(Side::Left));
            doc.set_text("b").unwrap();
            tracker
        });
        assert!(!tracker.is_frozen());
        assert_eq!(ranges(&tracker.blocks()), vec![LineRange::new(0, 1, 0, 1)]);
    }

    #[test]
    fn dispose_is_idempotent_and_detaches() {
        let (d1, d2, tracker) = setup("a", "b");
        assert_eq!(d1.listener_count(), 1);

        tracker.dispose();
        tracker.dispose();
        assert!(tracker.is_disposed());
        assert!(tracker.blocks().is_empty());
        assert_eq!(d1.listener_count(), 0);
        assert_eq!(d2.listener_count(), 0);

        d1.insert(0, "x\n").unwrap();
        tracker.refresh_dirty(false, false);
        assert!(tracker.blocks().is_empty());
        assert!(!tracker.set_frozen_state_ranges(&[]));
    }

    #[test]
    fn handler_may_reenter_tracker() {
        struct Reentrant {
            tracker: OnceLock<Weak<DocumentTracker>>,
            seen: Mutex<Vec<(bool, usize)>>,
        }

        impl TrackerHandler for Reentrant {
            fn after_range_change(&self) {
                if let Some(tracker) = self.tracker.get().and_then(Weak::upgrade) {
                    let held = tracker.is_lock_held_by_current_thread();
                    self.seen.lock().push((held, tracker.blocks().len()));
                }
            }
        }

        let handler = Arc::new(Reentrant {
            tracker: OnceLock::new(),
            seen: Mutex::new(Vec::new()),
        });
        let (d1, _d2, tracker) = setup_with("a", "a", handler.clone());
        let _ = handler.tracker.set(Arc::downgrade(&tracker));

        d1.insert(0, "z").unwrap();
        assert_eq!(*handler.seen.lock(), vec![(true, 1)]);
    }

    #[test]
    fn lock_is_reentrant_and_scoped() {
        let (_d1, _d2, tracker) = setup("a", "b");
        assert!(!tracker.is_lock_held_by_current_thread());
        let count = tracker.write_lock(|| {
            assert!(tracker.is_lock_held_by_current_thread());
            tracker.read_lock(|| tracker.blocks().len())
        });
        assert_eq!(count, 1);
        assert!(!tracker.is_lock_held_by_current_thread());
    }

    #[test]
    fn annotations_attach_until_blocks_move() {
        let (d1, _d2, tracker) = setup("a\nb", "a\nB");
        let note: linetrack_types::BlockData = Arc::new(7u32);
        tracker.annotate_blocks(|block| block.set_data(Some(Arc::clone(&note))));
        assert_eq!(tracker.blocks()[0].data_as::<u32>(), Some(&7));

        d1.insert(0, "top\n").unwrap();
        assert!(tracker.blocks().iter().all(|block| block.data().is_none()));
    }

    fn edit_strategy() -> impl Strategy<Value = (bool, usize, usize, String)> {
        (
            any::<bool>(),
            0usize..40,
            0usize..4,
            prop::sample::select(vec!["", "x", "\n", "y\n", "\nz", "a\nb\n"]).prop_map(String::from),
        )
    }

    proptest! {
        #[test]
        fn blocks_stay_consistent_under_edits(
            edits in prop::collection::vec(edit_strategy(), 1..12),
            frozen in any::<bool>(),
        ) {
            let base = "a\nb\nc\nd\ne\nf\ng";
            let (d1, d2, tracker) = setup(base, base);

            let apply = || {
                for (left, offset, remove, insert) in &edits {
                    let document = if *left { &d1 } else { &d2 };
                    let len = document.len();
                    let start = (*offset).min(len);
                    let end = (start + remove).min(len);
                    document.replace(start..end, insert).unwrap();
                }
            };
            if frozen {
                tracker.do_frozen_both(apply);
            } else {
                apply();
            }
            tracker.refresh_dirty(false, false);

            let blocks = tracker.blocks();
            prop_assert!(blocks.iter().all(|block| !block.is_dirty()));
            prop_assert!(is_valid_state(&d1.text(), &d2.text(), &ranges(&blocks)));
        }
    }
}
