use segmerge_proto::SegmentId;

/// What changed, delivered to subscribers after the in-memory transition has
/// fully completed. Observers never see an intermediate state.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeChange {
    /// The working selection was replaced (normalized, append-biased order)
    Selection(Vec<SegmentId>),
    /// Merge groups changed: merge, unmerge, or clear
    Merges,
    /// State was replaced from the persistence backend (or reset after a
    /// failed restore)
    Restored,
}
