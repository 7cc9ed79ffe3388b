//! Error types for PageSearch
//!
//! Every failure the list, the HTTP client and the CLI can report.

use thiserror::Error;

/// Main error type for PageSearch operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server answered {status} for '{url}'")]
    Status { status: u16, url: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid filter argument '{0}': expected key=value")]
    FilterArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for PageSearch operations
pub type Result<T> = std::result::Result<T, SearchError>;

impl SearchError {
    /// Check if this error may go away on a later search or scroll
    pub fn is_transient(&self) -> bool {
        match self {
            SearchError::Http(e) => !e.is_builder(),
            SearchError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
