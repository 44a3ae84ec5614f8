use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown side: {0:?} (expected \"left\" or \"right\")")]
    UnknownSide(String),
}
