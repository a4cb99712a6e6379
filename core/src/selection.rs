use crate::equivalence::EquivalenceStore;
use segmerge_proto::SegmentId;
use std::collections::HashSet;

/// Map every element of a raw selection to its ultimate main. The host viewer
/// reports whatever ids it has visible, which may be ids long since absorbed
/// into a group.
pub fn normalize(store: &EquivalenceStore, selection: &[SegmentId]) -> Vec<SegmentId> {
    selection.iter().map(|&id| store.ultimate_main(id)).collect()
}

/// Reconcile the previous selection with a newly reported one.
///
/// Both inputs are normalized first. Everything still selected keeps its old
/// position; newly added ids are appended in reported order. The append bias
/// keeps the first-selected id stable, which downstream consumers rely on
/// ("first selected becomes merge target").
pub fn reconcile(store: &EquivalenceStore, was: &[SegmentId], now_raw: &[SegmentId]) -> Vec<SegmentId> {
    let was = normalize(store, was);
    let now = normalize(store, now_raw);
    let now_set: HashSet<SegmentId> = now.iter().copied().collect();
    let was_set: HashSet<SegmentId> = was.iter().copied().collect();

    let mut selection: Vec<SegmentId> = was.into_iter().filter(|id| now_set.contains(id)).collect();
    selection.extend(now.into_iter().filter(|id| !was_set.contains(id)));
    selection
}
