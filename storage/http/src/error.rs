use segmerge_core::error::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpStoreError {
    #[error("http status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<HttpStoreError> for StorageError {
    fn from(err: HttpStoreError) -> Self {
        match err {
            HttpStoreError::Status { .. } | HttpStoreError::Transport(_) => StorageError::Connection(err.to_string()),
            HttpStoreError::Encoding(e) => StorageError::Serialization(e.to_string()),
            HttpStoreError::Join(e) => StorageError::Other(Box::new(e)),
        }
    }
}
