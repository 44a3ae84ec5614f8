use std::ops::Range;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use linetrack_types::LineOffsets;

use crate::error::{DocumentError, DocumentResult};
use crate::traits::{Document, DocumentEvent, DocumentListener, DocumentSnapshot, SubscriptionId};

/// In-memory document.
///
/// Intended for tests and embedding. The text is held behind a `RwLock` as an
/// immutable `Arc<str>` that is swapped on every edit, so snapshots are cheap
/// and never observe a half-applied change.
pub struct MemoryDocument {
    state: RwLock<DocumentSnapshot>,
    listeners: Mutex<Vec<(SubscriptionId, Weak<dyn DocumentListener>)>>,
    next_subscription: AtomicU64,
    transaction_depth: AtomicUsize,
    bulk_depth: AtomicUsize,
}

impl MemoryDocument {
    pub fn new(text: &str) -> Self {
        Self {
            state: RwLock::new(DocumentSnapshot {
                text: Arc::from(text),
                offsets: Arc::new(LineOffsets::new(text)),
            }),
            listeners: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            transaction_depth: AtomicUsize::new(0),
            bulk_depth: AtomicUsize::new(0),
        }
    }

    /// Insert `text` at `offset`.
    pub fn insert(&self, offset: usize, text: &str) -> DocumentResult<()> {
        self.replace(offset..offset, text)
    }

    /// Delete the bytes in `range`.
    pub fn delete(&self, range: Range<usize>) -> DocumentResult<()> {
        self.replace(range, "")
    }

    /// Replace the whole text.
    pub fn set_text(&self, text: &str) -> DocumentResult<()> {
        let len = self.len();
        self.replace(0..len, text)
    }

    /// Run `f` as one edit transaction. Listeners hear
    /// `edit_transaction_finished` once, when the outermost transaction ends.
    pub fn transact<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        self.transaction_depth.fetch_add(1, Ordering::SeqCst);
        let result = f(self);
        if self.transaction_depth.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify(|listener| listener.edit_transaction_finished(self));
        }
        result
    }

    /// Run `f` in bulk-update mode, bracketed by bulk start/finish notifications.
    pub fn bulk_update<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        if self.bulk_depth.fetch_add(1, Ordering::SeqCst) == 0 {
            self.notify(|listener| listener.bulk_update_starting(self));
        }
        let result = f(self);
        if self.bulk_depth.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify(|listener| listener.bulk_update_finished(self));
        }
        result
    }

    /// Number of registered listeners that are still alive.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .iter()
            .filter(|(_, listener)| listener.strong_count() > 0)
            .count()
    }

    fn validate(&self, text: &str, range: &Range<usize>) -> DocumentResult<()> {
        if range.start > range.end {
            return Err(DocumentError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        if range.end > text.len() {
            return Err(DocumentError::OffsetOutOfBounds {
                offset: range.end,
                len: text.len(),
            });
        }
        for offset in [range.start, range.end] {
            if !text.is_char_boundary(offset) {
                return Err(DocumentError::NotCharBoundary(offset));
            }
        }
        Ok(())
    }

    /// Deliver a notification to every live listener, pruning dead ones.
    /// The listener list lock is released before any callback runs.
    fn notify(&self, f: impl Fn(&dyn DocumentListener)) {
        let live: Vec<Arc<dyn DocumentListener>> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|(_, listener)| listener.strong_count() > 0);
            listeners
                .iter()
                .filter_map(|(_, listener)| listener.upgrade())
                .collect()
        };
        for listener in &live {
            f(listener.as_ref());
        }
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new("")
    }
}

impl Document for MemoryDocument {
    fn snapshot(&self) -> DocumentSnapshot {
        self.state.read().clone()
    }

    fn len(&self) -> usize {
        self.state.read().text.len()
    }

    fn line_count(&self) -> usize {
        self.state.read().offsets.line_count()
    }

    fn line_number(&self, offset: usize) -> usize {
        self.state.read().offsets.line_number(offset)
    }

    fn byte_at(&self, offset: usize) -> Option<u8> {
        self.state.read().text.as_bytes().get(offset).copied()
    }

    fn is_in_bulk_update(&self) -> bool {
        self.bulk_depth.load(Ordering::SeqCst) > 0
    }

    fn replace(&self, range: Range<usize>, text: &str) -> DocumentResult<()> {
        let event = {
            let state = self.state.read();
            self.validate(&state.text, &range)?;
            DocumentEvent {
                offset: range.start,
                old_fragment: state.text[range.clone()].to_string(),
                new_fragment: text.to_string(),
            }
        };
        if event.old_fragment.is_empty() && event.new_fragment.is_empty() {
            return Ok(());
        }

        self.notify(|listener| listener.before_document_change(self, &event));

        {
            let mut state = self.state.write();
            let mut updated = String::with_capacity(state.text.len() + text.len());
            updated.push_str(&state.text[..range.start]);
            updated.push_str(text);
            updated.push_str(&state.text[range.end..]);
            state.offsets = Arc::new(LineOffsets::new(&updated));
            state.text = Arc::from(updated);
        }
        debug!(
            offset = event.offset,
            removed = event.old_len(),
            inserted = event.new_len(),
            "document edited"
        );

        self.notify(|listener| listener.document_changed(self, &event));

        if self.transaction_depth.load(Ordering::SeqCst) == 0 {
            self.notify(|listener| listener.edit_transaction_finished(self));
        }
        Ok(())
    }

    fn subscribe(&self, listener: Weak<dyn DocumentListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst));
        self.listeners.lock().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }
}

impl std::fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDocument")
            .field("len", &self.len())
            .field("listener_count", &self.listener_count())
            .finish()
    }
}
