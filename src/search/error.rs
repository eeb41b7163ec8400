//! Error types for search operations

use crate::error::AppError;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while talking to the search engine
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Index creation failed at boot
    #[error("Index initialization failed: {0}")]
    IndexInitFailed(String),

    /// Index not found
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Search execution failed
    #[error("Search query failed: {0}")]
    QueryFailed(String),

    /// Document indexing or partial update failed
    #[error("Document indexing failed: {0}")]
    IndexingFailed(String),

    /// Document deletion failed
    #[error("Document deletion failed: {0}")]
    DeletionFailed(String),

    /// Scripted update failed
    #[error("Script execution failed: {0}")]
    ScriptFailed(String),

    /// Concurrent modification rejected by the engine
    #[error("Version conflict: {0}")]
    VersionConflict(String),

    /// Engine unreachable
    #[error("Search engine unavailable: {0}")]
    Unavailable(String),

    /// Malformed request or response body
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Serialization(err.to_string())
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Unavailable(_)
            | SearchError::IndexInitFailed(_)
            | SearchError::IndexNotFound(_) => AppError::ExternalStoreUnavailable(err.to_string()),
            SearchError::DocumentNotFound(msg) => AppError::NotFound(msg),
            SearchError::VersionConflict(msg) => AppError::Conflict(msg),
            SearchError::Serialization(msg) => AppError::Serialization(msg),
            SearchError::InvalidConfiguration(msg) => AppError::Configuration(msg),
            _ => AppError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_mapping() {
        assert!(matches!(
            AppError::from(SearchError::Unavailable("refused".into())),
            AppError::ExternalStoreUnavailable(_)
        ));
        assert!(matches!(
            AppError::from(SearchError::IndexNotFound("pickup_lines".into())),
            AppError::ExternalStoreUnavailable(_)
        ));
        assert!(AppError::from(SearchError::DocumentNotFound("x".into())).is_not_found());
        assert!(matches!(
            AppError::from(SearchError::VersionConflict("x".into())),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(SearchError::ScriptFailed("x".into())),
            AppError::Internal(_)
        ));
    }
}
