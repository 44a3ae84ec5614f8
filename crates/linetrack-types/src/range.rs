use std::fmt;

use serde::{Deserialize, Serialize};

use crate::side::Side;

/// A correspondence between lines `[start1, end1)` of buffer 1 and lines
/// `[start2, end2)` of buffer 2.
///
/// Either side may be empty (a pure insertion or deletion), but a range is
/// only [`is_empty`](Self::is_empty) when both sides are.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start1: usize,
    pub end1: usize,
    pub start2: usize,
    pub end2: usize,
}

impl LineRange {
    pub const fn new(start1: usize, end1: usize, start2: usize, end2: usize) -> Self {
        Self {
            start1,
            end1,
            start2,
            end2,
        }
    }

    /// Build a range from bounds expressed relative to `side`.
    pub fn from_side(side: Side, start: usize, end: usize, other_start: usize, other_end: usize) -> Self {
        match side {
            Side::Left => Self::new(start, end, other_start, other_end),
            Side::Right => Self::new(other_start, other_end, start, end),
        }
    }

    pub fn start(&self, side: Side) -> usize {
        side.select(self.start1, self.start2)
    }

    pub fn end(&self, side: Side) -> usize {
        side.select(self.end1, self.end2)
    }

    /// Number of lines covered on `side`.
    pub fn len(&self, side: Side) -> usize {
        self.end(side) - self.start(side)
    }

    /// Returns `true` if neither side covers any line.
    pub fn is_empty(&self) -> bool {
        self.start1 == self.end1 && self.start2 == self.end2
    }

    /// Net line count change when `side`'s lines are replaced by the other side's.
    pub fn delta(&self, side: Side) -> isize {
        self.len(side.other()) as isize - self.len(side) as isize
    }

    /// Move both bounds on `side` by `delta`; the other side is untouched.
    pub fn shift(&self, side: Side, delta: isize) -> Self {
        match side {
            Side::Left => self.shifted(delta, 0),
            Side::Right => self.shifted(0, delta),
        }
    }

    /// Move side 1 by `delta1` and side 2 by `delta2`.
    pub fn shifted(&self, delta1: isize, delta2: isize) -> Self {
        Self {
            start1: self.start1.saturating_add_signed(delta1),
            end1: self.end1.saturating_add_signed(delta1),
            start2: self.start2.saturating_add_signed(delta2),
            end2: self.end2.saturating_add_signed(delta2),
        }
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}) -> [{}, {})",
            self.start1, self.end1, self.start2, self.end2
        )
    }
}
