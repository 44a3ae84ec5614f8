//! Translation of raw document edits into line-based range changes.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use linetrack_document::{Document, DocumentEvent, DocumentListener};
use linetrack_types::Side;

use crate::tracker::DocumentTracker;

/// A line-based edit: `before_len` lines at `start_line` became `after_len` lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LineChange {
    pub start_line: usize,
    pub before_len: usize,
    pub after_len: usize,
}

/// Document listener for one side of a tracker.
///
/// Holds the tracker weakly; the tracker owns its listeners.
pub(crate) struct SideListener {
    tracker: Weak<DocumentTracker>,
    side: Side,
    /// Lines `[line1, line2)` touched by the pending edit, captured before it applies.
    pending: Mutex<(usize, usize)>,
}

impl SideListener {
    pub(crate) fn new(tracker: Weak<DocumentTracker>, side: Side) -> Self {
        Self {
            tracker,
            side,
            pending: Mutex::new((0, 0)),
        }
    }

    /// The tracker, unless it is gone or ignores edits on this side.
    fn live_tracker(&self) -> Option<Arc<DocumentTracker>> {
        self.tracker
            .upgrade()
            .filter(|tracker| !tracker.is_disposed() && !tracker.is_side_frozen(self.side))
    }
}

impl DocumentListener for SideListener {
    fn before_document_change(&self, document: &dyn Document, event: &DocumentEvent) {
        if self.live_tracker().is_none() {
            return;
        }
        let line1 = document.line_number(event.offset);
        let line2 = if event.old_len() == 0 {
            line1 + 1
        } else {
            document.line_number(event.offset + event.old_len()) + 1
        };
        *self.pending.lock() = (line1, line2);
    }

    fn document_changed(&self, document: &dyn Document, event: &DocumentEvent) {
        let Some(tracker) = self.live_tracker() else {
            return;
        };
        let (line1, line2) = *self.pending.lock();
        let new_line2 = if event.new_len() == 0 {
            line1 + 1
        } else {
            document.line_number(event.offset + event.new_len()) + 1
        };

        let change = affected_range(document, event, line1, line2, new_line2);
        trace!(side = %self.side, ?change, "document edit");
        tracker.range_changed(self.side, change.start_line, change.before_len, change.after_len);
    }

    fn bulk_update_starting(&self, _document: &dyn Document) {
        if let Some(tracker) = self.tracker.upgrade() {
            tracker.freeze(self.side);
        }
    }

    fn bulk_update_finished(&self, _document: &dyn Document) {
        if let Some(tracker) = self.tracker.upgrade() {
            tracker.unfreeze(self.side);
        }
    }

    fn edit_transaction_finished(&self, _document: &dyn Document) {
        if let Some(tracker) = self.tracker.upgrade() {
            tracker.refresh_dirty(true, false);
        }
    }
}

/// Line span of an edit, with whole-line insertions and deletions reduced to
/// the inserted or removed lines alone.
///
/// `document` holds the text after the edit.
pub(crate) fn affected_range(
    document: &dyn Document,
    event: &DocumentEvent,
    line1: usize,
    old_line2: usize,
    new_line2: usize,
) -> LineChange {
    let before_len = old_line2 - line1;
    let after_len = new_line2 - line1;

    let fragment = match (event.old_len(), event.new_len()) {
        (0, n) if n > 0 => Some(event.new_fragment.as_str()),
        (n, 0) if n > 0 => Some(event.old_fragment.as_str()),
        _ => None,
    };
    if let Some(fragment) = fragment {
        if fragment.ends_with('\n') && is_newline_before(document, event) {
            return LineChange {
                start_line: line1,
                before_len: before_len - 1,
                after_len: after_len - 1,
            };
        }
        if fragment.starts_with('\n') && is_newline_after(document, event) {
            return LineChange {
                start_line: line1 + 1,
                before_len: before_len - 1,
                after_len: after_len - 1,
            };
        }
    }

    LineChange {
        start_line: line1,
        before_len,
        after_len,
    }
}

fn is_newline_before(document: &dyn Document, event: &DocumentEvent) -> bool {
    event.offset == 0 || document.byte_at(event.offset - 1) == Some(b'\n')
}

fn is_newline_after(document: &dyn Document, event: &DocumentEvent) -> bool {
    let offset = event.offset + event.new_len();
    offset == document.len() || document.byte_at(offset) == Some(b'\n')
}
