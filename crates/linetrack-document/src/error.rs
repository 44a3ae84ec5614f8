//! Error types for the document crate.

/// Errors that can occur while editing a document.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DocumentError {
    /// The offset lies past the end of the text.
    #[error("offset {offset} out of bounds for text of length {len}")]
    OffsetOutOfBounds { offset: usize, len: usize },

    /// The offset splits a multi-byte character.
    #[error("offset {0} is not on a character boundary")]
    NotCharBoundary(usize),

    /// The range start is after its end.
    #[error("invalid range {start}..{end}")]
    InvalidRange { start: usize, end: usize },
}

/// Convenience alias for document results.
pub type DocumentResult<T> = Result<T, DocumentError>;
