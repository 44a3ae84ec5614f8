//! Whole-line text application.

use std::ops::Range;

use linetrack_types::LineRange;

use crate::comparator::TextLines;

/// Replace, for each range, lines `[start1, end1)` of `text` with lines
/// `[start2, end2)` of `other`, returning the resulting text.
///
/// `ranges` must be sorted by `start1` and non-overlapping.
pub fn apply_modification(text: TextLines<'_>, other: TextLines<'_>, ranges: &[LineRange]) -> String {
    let mut lines: Vec<&str> = Vec::with_capacity(text.line_count());
    let mut last = 0;
    for range in ranges {
        lines.extend(text.lines(last, range.start1));
        lines.extend(other.lines(range.start2, range.end2));
        last = range.end1;
    }
    lines.extend(text.lines(last, text.line_count()));
    lines.join("\n")
}

/// A byte-level replacement within a text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineEdit {
    pub range: Range<usize>,
    pub text: String,
}

/// The edit that replaces lines `[line1, line2)` of `target` with lines
/// `[other1, other2)` of `source`, or `None` if both ranges are empty.
pub fn replace_lines(
    target: TextLines<'_>,
    line1: usize,
    line2: usize,
    source: TextLines<'_>,
    other1: usize,
    other2: usize,
) -> Option<LineEdit> {
    if line1 == line2 && other1 == other2 {
        return None;
    }
    let content = source.content(other1, other2);

    if line1 == line2 {
        return Some(if line1 == target.line_count() {
            let end = target.offsets.text_len();
            LineEdit {
                range: end..end,
                text: format!("\n{content}"),
            }
        } else {
            let start = target.offsets.line_start(line1);
            LineEdit {
                range: start..start,
                text: format!("{content}\n"),
            }
        });
    }

    let mut range = target.offsets.lines_range(line1, line2, false);
    if other1 == other2 {
        // Take one adjacent newline along with the deleted lines.
        if range.start > 0 {
            range.start -= 1;
        } else if range.end < target.offsets.text_len() {
            range.end += 1;
        }
        return Some(LineEdit {
            range,
            text: String::new(),
        });
    }

    Some(LineEdit {
        range,
        text: content.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use linetrack_types::LineOffsets;

    fn edit(target: &str, line1: usize, line2: usize, source: &str, other1: usize, other2: usize) -> String {
        let (ot, os) = (LineOffsets::new(target), LineOffsets::new(source));
        let mut result = target.to_string();
        if let Some(edit) = replace_lines(
            TextLines::new(target, &ot),
            line1,
            line2,
            TextLines::new(source, &os),
            other1,
            other2,
        ) {
            result.replace_range(edit.range, &edit.text);
        }
        result
    }

    #[test]
    fn replace_middle_line() {
        assert_eq!(edit("a\nb\nc", 1, 2, "X\nY", 0, 2), "a\nX\nY\nc");
    }

    #[test]
    fn insert_before_and_after_last_line() {
        assert_eq!(edit("a\nb\nc", 1, 1, "X", 0, 1), "a\nX\nb\nc");
        assert_eq!(edit("a\nb\nc", 3, 3, "X", 0, 1), "a\nb\nc\nX");
    }

    #[test]
    fn delete_takes_a_newline() {
        assert_eq!(edit("a\nb\nc", 1, 2, "", 0, 0), "a\nc");
        assert_eq!(edit("a\nb\nc", 0, 1, "", 0, 0), "b\nc");
        assert_eq!(edit("a\nb\nc", 2, 3, "", 0, 0), "a\nb");
        assert_eq!(edit("a\nb\nc", 0, 3, "", 0, 0), "");
    }

    #[test]
    fn empty_ranges_are_no_edit() {
        let offsets = LineOffsets::new("a");
        let lines = TextLines::new("a", &offsets);
        assert_eq!(replace_lines(lines, 0, 0, lines, 1, 1), None);
    }

    #[test]
    fn apply_modification_merges_ranges() {
        let (a, b) = ("a\nb\nc\nd", "a\nB\nc\nD\nE");
        let (oa, ob) = (LineOffsets::new(a), LineOffsets::new(b));
        let (la, lb) = (TextLines::new(a, &oa), TextLines::new(b, &ob));

        let first_only = apply_modification(la, lb, &[LineRange::new(1, 2, 1, 2)]);
        assert_eq!(first_only, "a\nB\nc\nd");

        let both = apply_modification(
            la,
            lb,
            &[LineRange::new(1, 2, 1, 2), LineRange::new(3, 4, 3, 5)],
        );
        assert_eq!(both, b);

        assert_eq!(apply_modification(la, lb, &[]), a);
    }
}
