use crate::SegmentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted shape of the merge state.
///
/// `main_to_others` and `other_to_main` are the two inverse indices; `ordering`
/// is an audit array of mains in group-creation order. BTreeMaps keep the
/// serialized form deterministic. JSON object keys are strings, so integer ids
/// stringify at this boundary and parse back on load; the engine itself only
/// ever sees `SegmentId`s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquivalenceSnapshot {
    pub main_to_others: BTreeMap<SegmentId, Vec<SegmentId>>,
    pub other_to_main: BTreeMap<SegmentId, SegmentId>,
    // absent in blobs written before the audit array existed
    #[serde(default)]
    pub ordering: Vec<SegmentId>,
}

impl EquivalenceSnapshot {
    pub fn empty() -> Self { Self::default() }

    pub fn is_empty(&self) -> bool { self.main_to_others.is_empty() && self.other_to_main.is_empty() }
}
