//! Error types for tempokv

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid namespace id: {0:?}")]
    InvalidNamespace(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to encode value for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type specialized for tempokv
pub type Result<T> = std::result::Result<T, Error>;
