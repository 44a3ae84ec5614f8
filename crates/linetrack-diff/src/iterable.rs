use linetrack_types::LineRange;

/// The outcome of comparing two line sequences of lengths `len1` and `len2`.
///
/// Changed ranges are sorted and never overlap or touch; the unchanged ranges
/// are the gaps between them. Both views can be iterated any number of times.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffIterable {
    changes: Vec<LineRange>,
    len1: usize,
    len2: usize,
}

impl DiffIterable {
    pub fn new(changes: Vec<LineRange>, len1: usize, len2: usize) -> Self {
        debug_assert!(changes
            .windows(2)
            .all(|w| w[0].end1 <= w[1].start1 && w[0].end2 <= w[1].start2));
        Self {
            changes,
            len1,
            len2,
        }
    }

    /// Build an iterable from an externally supplied skeleton of changed ranges.
    pub fn from_ranges(changes: &[LineRange], len1: usize, len2: usize) -> Self {
        Self {
            changes: changes.to_vec(),
            len1,
            len2,
        }
    }

    pub fn len1(&self) -> usize {
        self.len1
    }

    pub fn len2(&self) -> usize {
        self.len2
    }

    pub fn changes(&self) -> impl Iterator<Item = LineRange> + '_ {
        self.changes.iter().copied()
    }

    pub fn unchanged(&self) -> Unchanged<'_> {
        Unchanged {
            iterable: self,
            index: 0,
            last1: 0,
            last2: 0,
            done: false,
        }
    }

    pub fn into_changes(self) -> Vec<LineRange> {
        self.changes
    }
}

/// Iterator over the equal ranges between the changes of a [`DiffIterable`].
pub struct Unchanged<'a> {
    iterable: &'a DiffIterable,
    index: usize,
    last1: usize,
    last2: usize,
    done: bool,
}

impl Iterator for Unchanged<'_> {
    type Item = LineRange;

    fn next(&mut self) -> Option<LineRange> {
        while let Some(change) = self.iterable.changes.get(self.index) {
            self.index += 1;
            let gap = LineRange::new(self.last1, change.start1, self.last2, change.start2);
            self.last1 = change.end1;
            self.last2 = change.end2;
            if gap.start1 < gap.end1 || gap.start2 < gap.end2 {
                return Some(gap);
            }
        }
        if self.done {
            return None;
        }
        self.done = true;
        let tail = LineRange::new(self.last1, self.iterable.len1, self.last2, self.iterable.len2);
        (tail.start1 < tail.end1 || tail.start2 < tail.end2).then_some(tail)
    }
}
