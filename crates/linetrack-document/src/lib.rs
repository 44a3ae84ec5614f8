//! Mutable text buffers for linetrack.
//!
//! This crate provides:
//! - The `Document` / `DocumentListener` trait boundaries a tracker observes
//! - `DocumentEvent` describing one edit, delivered before and after it applies
//! - `MemoryDocument`, a thread-safe in-memory implementation for tests and embedding

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{DocumentError, DocumentResult};
pub use memory::MemoryDocument;
pub use traits::{Document, DocumentEvent, DocumentListener, DocumentSnapshot, SubscriptionId};
