use thiserror::Error;

/// Error type for persistence operations.
///
/// Returned from: `MergeStorage::store`, `MergeStorage::restore`. The manager
/// converts these into alerts at its public boundary; they never escape as
/// panics or `Err` from a session operation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend could not be reached or refused the request
    #[error("connection error: {0}")]
    Connection(String),

    /// Stored blob could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Anything else the backend reports
    #[error("storage error: {0}")]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self { StorageError::Serialization(e.to_string()) }
}

/// Error type for the optional semantic-type lookup collaborator.
#[derive(Debug, Error)]
pub enum TypeLookupError {
    /// Lookup service could not be reached
    #[error("connection error: {0}")]
    Connection(String),

    /// Anything else the service reports
    #[error("type lookup error: {0}")]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}
