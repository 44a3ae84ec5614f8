use std::ops::Range;

/// Line index of a text.
///
/// A text containing *n* newline characters has *n + 1* lines; the empty text
/// has exactly one empty line, and a trailing newline starts a final empty
/// line. Line ends exclude the newline character.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineOffsets {
    line_ends: Vec<usize>,
    text_len: usize,
}

impl LineOffsets {
    pub fn new(text: &str) -> Self {
        let mut line_ends: Vec<usize> = text
            .bytes()
            .enumerate()
            .filter(|&(_, b)| b == b'\n')
            .map(|(i, _)| i)
            .collect();
        line_ends.push(text.len());
        Self {
            line_ends,
            text_len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_ends.len()
    }

    pub fn text_len(&self) -> usize {
        self.text_len
    }

    /// Byte offset of the first character of `line`.
    pub fn line_start(&self, line: usize) -> usize {
        if line == 0 {
            0
        } else {
            self.line_ends[line - 1] + 1
        }
    }

    /// Byte offset just past the last character of `line`, before its newline.
    pub fn line_end(&self, line: usize) -> usize {
        self.line_ends[line]
    }

    /// The line containing `offset`. A newline belongs to the line it ends.
    pub fn line_number(&self, offset: usize) -> usize {
        let line = self.line_ends.partition_point(|&end| end < offset);
        line.min(self.line_count() - 1)
    }

    /// Byte range covered by lines `[start, end)`.
    ///
    /// An empty line range maps to an empty byte range at the start of
    /// `start`, or at the end of the text when `start` is past the last line.
    pub fn lines_range(&self, start: usize, end: usize, include_newline: bool) -> Range<usize> {
        if start == end {
            let offset = if start < self.line_count() {
                self.line_start(start)
            } else {
                self.text_len
            };
            return offset..offset;
        }
        let start_offset = self.line_start(start);
        let mut end_offset = self.line_end(end - 1);
        if include_newline && end_offset < self.text_len {
            end_offset += 1;
        }
        start_offset..end_offset
    }

    /// Text of lines `[start, end)` without the final newline.
    pub fn lines_content<'a>(&self, text: &'a str, start: usize, end: usize) -> &'a str {
        &text[self.lines_range(start, end, false)]
    }

    /// The individual lines `[start, end)` of `text`.
    pub fn lines<'a>(&self, text: &'a str, start: usize, end: usize) -> Vec<&'a str> {
        (start..end)
            .map(|line| &text[self.line_start(line)..self.line_end(line)])
            .collect()
    }
}
