//! Error types for the catalog core

use crate::DocId;
use sled::transaction::TransactionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Source URL does not have the catalog page shape; nothing was written.
    #[error("invalid source url: {0}")]
    InvalidSource(String),

    /// Upstream extraction produced no record; nothing was written.
    #[error("extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("document {0} not found")]
    NotFound(DocId),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("encoding error: {0}")]
    Codec(#[from] bincode::Error),
}

impl From<TransactionError<CatalogError>> for CatalogError {
    fn from(err: TransactionError<CatalogError>) -> Self {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => CatalogError::Storage(e),
        }
    }
}
