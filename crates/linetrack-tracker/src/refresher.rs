//! Exact re-comparison of dirty regions.
//!
//! Blocks separated only by whitespace on the left side are grouped; a group
//! with no dirty block is kept as is. Inside a dirty group, neighbours are
//! merged (unless the handler vetoes) and each merged span is re-compared on
//! exactly its own lines, replacing it with clean blocks.

use tracing::debug;

use linetrack_diff::{LineComparator, TextLines};
use linetrack_types::{Block, LineRange};

use crate::handler::TrackerHandler;

pub(crate) struct DirtyRegionRefresher<'a> {
    handler: &'a dyn TrackerHandler,
    comparator: &'a dyn LineComparator,
    left: TextLines<'a>,
    right: TextLines<'a>,
}

impl<'a> DirtyRegionRefresher<'a> {
    pub(crate) fn new(
        handler: &'a dyn TrackerHandler,
        comparator: &'a dyn LineComparator,
        left: TextLines<'a>,
        right: TextLines<'a>,
    ) -> Self {
        Self {
            handler,
            comparator,
            left,
            right,
        }
    }

    pub(crate) fn refresh(&self, blocks: &[Block], fast_refresh: bool) -> Vec<Block> {
        let mut refreshed = Vec::with_capacity(blocks.len());
        let mut group_start = 0;
        for i in 0..blocks.len() {
            let group_ends = blocks
                .get(i + 1)
                .map_or(true, |next| !self.is_whitespace_separated(&blocks[i], next));
            if group_ends {
                self.process_group(&blocks[group_start..=i], fast_refresh, &mut refreshed);
                group_start = i + 1;
            }
        }
        refreshed
    }

    fn process_group(&self, group: &[Block], fast_refresh: bool, out: &mut Vec<Block>) {
        if !group.iter().any(Block::is_dirty) {
            out.extend_from_slice(group);
            return;
        }

        let mut merged: Option<Block> = None;
        for block in group {
            merged = Some(match merged {
                None => block.clone(),
                Some(current) => match self.merge(&current, block) {
                    Some(combined) => combined,
                    None => {
                        self.refresh_merged(&current, fast_refresh, out);
                        block.clone()
                    }
                },
            });
        }
        if let Some(last) = merged {
            self.refresh_merged(&last, fast_refresh, out);
        }
    }

    fn merge(&self, first: &Block, second: &Block) -> Option<Block> {
        let (a, b) = (first.range(), second.range());
        let mut merged = Block::new(
            LineRange::new(a.start1, b.end1, a.start2, b.end2),
            first.is_dirty() || second.is_dirty(),
            first.is_too_big() || second.is_too_big(),
        );
        if self.handler.on_ranges_merged(first, second, &mut merged) {
            Some(merged)
        } else {
            debug!(first = %a, second = %b, "merge vetoed");
            None
        }
    }

    fn refresh_merged(&self, merged: &Block, fast_refresh: bool, out: &mut Vec<Block>) {
        let mut fresh = self.compare(merged, fast_refresh);
        self.handler.on_range_refreshed(merged, &mut fresh);
        out.extend(fresh);
    }

    fn compare(&self, block: &Block, fast_refresh: bool) -> Vec<Block> {
        let range = block.range();
        if range.is_empty() {
            return Vec::new();
        }

        let (diff, too_big) = if block.is_too_big() && fast_refresh {
            (self.comparator.fast_compare(self.left, self.right, Some(range)), true)
        } else {
            match self.comparator.try_compare(self.left, self.right, Some(range)) {
                Some(diff) => (diff, false),
                None => (self.comparator.fast_compare(self.left, self.right, Some(range)), true),
            }
        };

        let (shift1, shift2) = (range.start1 as isize, range.start2 as isize);
        diff.changes()
            .map(|change| Block::new(change.shifted(shift1, shift2), false, too_big))
            .collect()
    }

    /// Whether only whitespace lies between `first` and `second` on the left side.
    fn is_whitespace_separated(&self, first: &Block, second: &Block) -> bool {
        let offsets = self.left.offsets;
        let (a, b) = (first.range(), second.range());
        let start = offsets.lines_range(a.start1, a.end1, false).end;
        let end = offsets.lines_range(b.start1, b.end1, false).start;
        start >= end || self.left.text[start..end].trim_start().is_empty()
    }
}
