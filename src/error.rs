use thiserror::Error;

/// Result type for docbatch operations.
pub type Result<T> = std::result::Result<T, DocbatchError>;

/// Errors that can occur while driving a batch.
#[derive(Debug, Error)]
pub enum DocbatchError {
    /// Ledger operation failed. This is the one category that is allowed to
    /// escape a file's worker: a broken store likely affects every file.
    #[error("Ledger error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP transport failure while talking to the remote API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote API returned an unusable response
    #[error("API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local filesystem failure (input enumeration, CSV export)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocbatchError {
    /// Whether this error must abort the file's attempt instead of being
    /// recorded as a terminal ERROR row.
    pub fn is_fatal_to_attempt(&self) -> bool {
        matches!(self, DocbatchError::Database(_))
    }
}
