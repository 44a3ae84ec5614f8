use linetrack_document::DocumentError;

/// Errors produced by tracker operations that edit documents.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Writing applied blocks into a document failed.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),
}

/// Convenience alias used throughout the tracker crate.
pub type TrackerResult<T> = std::result::Result<T, TrackerError>;
