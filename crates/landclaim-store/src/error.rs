use std::path::PathBuf;

/// Errors from store operations.
///
/// Most of these never leave the store: per-record failures are logged and
/// the record is skipped, demoted or deleted. Only bootstrap surfaces them.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A data directory could not be created during bootstrap.
    #[error("cannot create data directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A record's content is malformed.
    #[error("corrupt record {file}: {reason}")]
    CorruptRecord { file: String, reason: String },

    /// A stored corner names a world that no longer exists.
    #[error("world not found: {0}")]
    UnknownWorld(String),

    /// Configuration could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Foundation type parse failure.
    #[error(transparent)]
    Type(#[from] landclaim_types::TypeError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
