use segmerge_core::error::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SledStoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<SledStoreError> for StorageError {
    fn from(err: SledStoreError) -> Self {
        match err {
            SledStoreError::Sled(e) => StorageError::Other(Box::new(e)),
            SledStoreError::Encoding(e) => StorageError::Serialization(e.to_string()),
            SledStoreError::Join(e) => StorageError::Other(Box::new(e)),
        }
    }
}
