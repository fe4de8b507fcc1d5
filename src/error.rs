use thiserror::Error;

/// A quote field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteField {
    Text,
    Category,
}

impl std::fmt::Display for QuoteField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuoteField::Text => f.write_str("text"),
            QuoteField::Category => f.write_str("category"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("quote {0} must not be empty")]
    Empty(QuoteField),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("could not persist quotes: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum RemoteFetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("server responded with status {0}")]
    Status(reqwest::StatusCode),

    #[error("could not parse response body: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("could not read import file: {0}")]
    Io(#[from] std::io::Error),

    #[error("import file is not a list of {{text, category}} objects: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("entry #{index} is invalid: {source}")]
    InvalidEntry {
        index: usize,
        source: ValidationError,
    },

    #[error("could not persist imported quotes: {0}")]
    Storage(#[from] StorageError),
}
