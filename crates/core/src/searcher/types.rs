//! Types for the search service.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::words::WordsError;

/// Errors for search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("arguments are not acceptable")]
    BadArguments,

    #[error("failed to normalize phrase: {0}")]
    Words(#[from] WordsError),

    #[error("storage failed: {0}")]
    Storage(#[from] CatalogError),
}
