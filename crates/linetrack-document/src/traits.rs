use std::fmt;
use std::ops::Range;
use std::sync::{Arc, Weak};

use linetrack_types::LineOffsets;

use crate::error::DocumentResult;

/// Handle returned by [`Document::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// One edit: `old_fragment` at `offset` is replaced by `new_fragment`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentEvent {
    pub offset: usize,
    pub old_fragment: String,
    pub new_fragment: String,
}

impl DocumentEvent {
    pub fn old_len(&self) -> usize {
        self.old_fragment.len()
    }

    pub fn new_len(&self) -> usize {
        self.new_fragment.len()
    }
}

/// An immutable view of a document's text together with its line index.
#[derive(Clone, Debug)]
pub struct DocumentSnapshot {
    pub text: Arc<str>,
    pub offsets: Arc<LineOffsets>,
}

/// Receives change notifications from a [`Document`].
///
/// Notifications are delivered with no document-internal lock held, so a
/// listener may query the document it is observing. All methods default to
/// no-ops.
pub trait DocumentListener: Send + Sync {
    /// Called before `event` is applied; the document still holds the old text.
    fn before_document_change(&self, _document: &dyn Document, _event: &DocumentEvent) {}

    /// Called after `event` has been applied.
    fn document_changed(&self, _document: &dyn Document, _event: &DocumentEvent) {}

    fn bulk_update_starting(&self, _document: &dyn Document) {}

    fn bulk_update_finished(&self, _document: &dyn Document) {}

    /// Called once the outermost edit transaction has completed.
    fn edit_transaction_finished(&self, _document: &dyn Document) {}
}

/// Read and write boundary of a mutable text buffer.
pub trait Document: Send + Sync {
    fn snapshot(&self) -> DocumentSnapshot;

    fn text(&self) -> Arc<str> {
        self.snapshot().text
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn line_count(&self) -> usize;

    /// The line containing byte `offset`.
    fn line_number(&self, offset: usize) -> usize;

    fn byte_at(&self, offset: usize) -> Option<u8>;

    /// Whether the document is inside a bulk update.
    fn is_in_bulk_update(&self) -> bool;

    /// Replace the bytes in `range` with `text`, notifying listeners.
    fn replace(&self, range: Range<usize>, text: &str) -> DocumentResult<()>;

    /// Register a listener. The document holds it weakly.
    fn subscribe(&self, listener: Weak<dyn DocumentListener>) -> SubscriptionId;

    /// Remove a listener. Returns `false` if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
