//! Line comparison: exact via `similar`, approximate via prefix/suffix trimming.

use similar::DiffTag;
use tracing::debug;

use linetrack_types::{LineOffsets, LineRange};

use crate::iterable::DiffIterable;
use crate::policy::ComparisonPolicy;

/// A text paired with its line index.
#[derive(Clone, Copy, Debug)]
pub struct TextLines<'a> {
    pub text: &'a str,
    pub offsets: &'a LineOffsets,
}

impl<'a> TextLines<'a> {
    pub fn new(text: &'a str, offsets: &'a LineOffsets) -> Self {
        Self { text, offsets }
    }

    pub fn line_count(&self) -> usize {
        self.offsets.line_count()
    }

    pub fn lines(&self, start: usize, end: usize) -> Vec<&'a str> {
        self.offsets.lines(self.text, start, end)
    }

    pub fn content(&self, start: usize, end: usize) -> &'a str {
        self.offsets.lines_content(self.text, start, end)
    }
}

/// Produces changed line ranges between two texts.
///
/// When `range` is given, only lines `[start1, end1)` of the left text and
/// `[start2, end2)` of the right text are compared, and the result is local to
/// that range (line 0 is `start1` / `start2`).
pub trait LineComparator: Send + Sync {
    /// Exact comparison. Returns `None` when the cost policy declines.
    fn try_compare(
        &self,
        left: TextLines<'_>,
        right: TextLines<'_>,
        range: Option<LineRange>,
    ) -> Option<DiffIterable>;

    /// Approximate comparison. Always succeeds.
    fn fast_compare(
        &self,
        left: TextLines<'_>,
        right: TextLines<'_>,
        range: Option<LineRange>,
    ) -> DiffIterable;

    /// Exact comparison, falling back to the approximate one.
    fn compare(
        &self,
        left: TextLines<'_>,
        right: TextLines<'_>,
        range: Option<LineRange>,
    ) -> DiffIterable {
        self.try_compare(left, right, range)
            .unwrap_or_else(|| self.fast_compare(left, right, range))
    }
}

/// [`LineComparator`] backed by the `similar` crate.
#[derive(Clone, Debug, Default)]
pub struct SimilarComparator {
    policy: ComparisonPolicy,
}

impl SimilarComparator {
    pub fn new(policy: ComparisonPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ComparisonPolicy {
        &self.policy
    }
}

/// Lines selected for comparison, with the common prefix and suffix measured.
struct Selection<'a> {
    lines1: Vec<&'a str>,
    lines2: Vec<&'a str>,
    prefix: usize,
    suffix: usize,
}

impl<'a> Selection<'a> {
    fn new(left: TextLines<'a>, right: TextLines<'a>, range: Option<LineRange>) -> Self {
        let range =
            range.unwrap_or_else(|| LineRange::new(0, left.line_count(), 0, right.line_count()));
        let lines1 = left.lines(range.start1, range.end1);
        let lines2 = right.lines(range.start2, range.end2);

        let prefix = lines1
            .iter()
            .zip(&lines2)
            .take_while(|(a, b)| a == b)
            .count();
        let max_suffix = lines1.len().min(lines2.len()) - prefix;
        let suffix = lines1
            .iter()
            .rev()
            .zip(lines2.iter().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();

        Self {
            lines1,
            lines2,
            prefix,
            suffix,
        }
    }

    fn middle1(&self) -> &[&'a str] {
        &self.lines1[self.prefix..self.lines1.len() - self.suffix]
    }

    fn middle2(&self) -> &[&'a str] {
        &self.lines2[self.prefix..self.lines2.len() - self.suffix]
    }

    fn middle_len(&self) -> usize {
        self.middle1().len() + self.middle2().len()
    }

    fn into_iterable(self, changes: Vec<LineRange>) -> DiffIterable {
        DiffIterable::new(changes, self.lines1.len(), self.lines2.len())
    }
}

impl LineComparator for SimilarComparator {
    fn try_compare(
        &self,
        left: TextLines<'_>,
        right: TextLines<'_>,
        range: Option<LineRange>,
    ) -> Option<DiffIterable> {
        let selection = Selection::new(left, right, range);
        let middle = selection.middle_len();
        if middle > self.policy.exact_line_limit {
            debug!(
                lines = middle,
                limit = self.policy.exact_line_limit,
                "exact comparison declined"
            );
            return None;
        }
        if middle == 0 {
            return Some(selection.into_iterable(Vec::new()));
        }

        let ops = similar::capture_diff_slices(
            self.policy.algorithm.into(),
            selection.middle1(),
            selection.middle2(),
        );

        // Coalesce runs of non-equal ops so that changed ranges never touch.
        // Bounds come from running cursors: a delete's new index is not
        // always the position of the change in the new sequence.
        let prefix = selection.prefix;
        let (mut cursor1, mut cursor2) = (prefix, prefix);
        let mut changes: Vec<LineRange> = Vec::new();
        let mut pending: Option<LineRange> = None;
        for op in &ops {
            let (tag, old, new) = op.as_tag_tuple();
            let (end1, end2) = (cursor1 + old.len(), cursor2 + new.len());
            if tag == DiffTag::Equal {
                changes.extend(pending.take());
            } else {
                pending = Some(match pending {
                    Some(range) => LineRange::new(range.start1, end1, range.start2, end2),
                    None => LineRange::new(cursor1, end1, cursor2, end2),
                });
            }
            (cursor1, cursor2) = (end1, end2);
        }
        changes.extend(pending);

        Some(selection.into_iterable(changes))
    }

    fn fast_compare(
        &self,
        left: TextLines<'_>,
        right: TextLines<'_>,
        range: Option<LineRange>,
    ) -> DiffIterable {
        let selection = Selection::new(left, right, range);
        if selection.middle_len() == 0 {
            return selection.into_iterable(Vec::new());
        }
        let change = LineRange::new(
            selection.prefix,
            selection.prefix + selection.middle1().len(),
            selection.prefix,
            selection.prefix + selection.middle2().len(),
        );
        selection.into_iterable(vec![change])
    }
}
