//! Projection of one incremental edit onto the block list.
//!
//! An edit on `side` replaces lines `[start, start + before_len)` with
//! `after_len` lines. Blocks ending before the edit keep their place, blocks
//! starting after it shift on `side` only, and every block touching it is
//! absorbed, together with the edited lines, into exactly one new dirty block.

use linetrack_types::{Block, LineRange, Side};

/// The partitioned block list and its projection.
#[derive(Debug)]
pub struct RangeChange {
    pub before: Vec<Block>,
    pub affected: Vec<Block>,
    pub after: Vec<Block>,
    pub new_affected: Block,
    pub new_after: Vec<Block>,
}

impl RangeChange {
    /// The projected block list: before, the new dirty block, shifted after.
    pub fn into_blocks(self) -> Vec<Block> {
        let mut blocks = Vec::with_capacity(self.before.len() + self.new_after.len() + 1);
        blocks.extend(self.before);
        blocks.push(self.new_affected);
        blocks.extend(self.new_after);
        blocks
    }
}

/// Project the edit onto `blocks` in one linear pass.
pub fn project_range_change(
    blocks: &[Block],
    side: Side,
    start_line: usize,
    before_len: usize,
    after_len: usize,
) -> RangeChange {
    let end_line = start_line + before_len;
    let delta = after_len as isize - before_len as isize;

    let mut before = Vec::new();
    let mut affected = Vec::new();
    let mut after = Vec::new();
    for block in blocks {
        let range = block.range();
        if range.end(side) < start_line {
            before.push(block.clone());
        } else if range.start(side) > end_line {
            after.push(block.clone());
        } else {
            affected.push(block.clone());
        }
    }

    let our_to_other = before
        .last()
        .map_or(0, |block| offset_between(block.range().end(side.other()), block.range().end(side)));

    let new_affected = absorb(side, start_line, end_line, delta, our_to_other, &affected);
    let new_after = after.iter().map(|block| block.shift(side, delta)).collect();

    RangeChange {
        before,
        affected,
        after,
        new_affected,
        new_after,
    }
}

fn absorb(
    side: Side,
    start_line: usize,
    end_line: usize,
    delta: isize,
    our_to_other: isize,
    affected: &[Block],
) -> Block {
    let other = side.other();

    let (start, end, other_start, other_end) = match (affected.first(), affected.last()) {
        (Some(first), Some(last)) => {
            let (first, last) = (first.range(), last.range());

            let (start, other_start) = if first.start(side) <= start_line {
                (first.start(side), first.start(other))
            } else {
                let shift = offset_between(first.start(other), first.start(side));
                (start_line, start_line.saturating_add_signed(shift))
            };

            let (end, other_end) = if last.end(side) >= end_line {
                (last.end(side).saturating_add_signed(delta), last.end(other))
            } else {
                let shift = offset_between(last.end(other), last.end(side));
                (
                    end_line.saturating_add_signed(delta),
                    end_line.saturating_add_signed(shift),
                )
            };

            (start, end, other_start, other_end)
        }
        _ => (
            start_line,
            end_line.saturating_add_signed(delta),
            start_line.saturating_add_signed(our_to_other),
            end_line.saturating_add_signed(our_to_other),
        ),
    };

    let too_big = affected.iter().any(Block::is_too_big);
    Block::new(
        LineRange::from_side(side, start, end, other_start, other_end),
        true,
        too_big,
    )
}

fn offset_between(to: usize, from: usize) -> isize {
    to as isize - from as isize
}
