//! Error types for the configuration and query-routing layer

use crate::error::AppError;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while configuring indexes or serving a search
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Bad request parameters, caught before any engine call
    #[error("Invalid search request: {0}")]
    Validation(String),

    /// A declared index configuration violates its invariants
    #[error("Invalid index configuration: {0}")]
    Configuration(String),

    /// The engine could not be reached or failed while serving
    #[error("Search engine unavailable: {0}")]
    EngineUnavailable(String),

    /// No configured index exists for the requested name
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// The engine refused the request (e.g. filter on a non-filterable attribute)
    #[error("Search engine rejected request ({code}): {message}")]
    EngineRejected { code: String, message: String },
}

impl SearchError {
    /// Short outcome label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::Validation(_) => "validation",
            SearchError::Configuration(_) => "configuration",
            SearchError::EngineUnavailable(_) => "engine_unavailable",
            SearchError::IndexNotFound(_) => "index_not_found",
            SearchError::EngineRejected { .. } => "engine_rejected",
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SearchError::EngineUnavailable(format!("request timed out: {}", err))
        } else if err.is_connect() {
            SearchError::EngineUnavailable(format!("connection failed: {}", err))
        } else {
            SearchError::EngineUnavailable(err.to_string())
        }
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Validation(msg) => AppError::Validation(msg),
            SearchError::EngineRejected { .. } => AppError::Validation(err.to_string()),
            SearchError::IndexNotFound(msg) => AppError::NotFound(msg),
            SearchError::Configuration(msg) => AppError::Configuration(msg),
            SearchError::EngineUnavailable(msg) => AppError::Upstream(msg),
        }
    }
}
