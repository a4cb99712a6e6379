use crate::error::StorageError;
use async_trait::async_trait;
use segmerge_proto::EquivalenceSnapshot;

/// Persistence seam for the merge state. Concrete backends live in their own
/// crates (remote key-value over HTTP, local sled); both round-trip the
/// snapshot losslessly through JSON-compatible serialization.
///
/// Absent data is not an error: a backend with nothing stored yet restores
/// `Ok(EquivalenceSnapshot::empty())`. `Err` is reserved for genuine I/O or
/// decoding failures, which the manager degrades into alerts.
#[async_trait]
pub trait MergeStorage: Send + Sync {
    async fn store(&self, snapshot: &EquivalenceSnapshot) -> Result<(), StorageError>;
    async fn restore(&self) -> Result<EquivalenceSnapshot, StorageError>;
}
