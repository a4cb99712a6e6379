use crate::equivalence::EquivalenceStore;
use segmerge_proto::SegmentId;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Verdict for the semantic type of a merge group.
///
/// `Unknown` means no member has a known type; `Mixed` means at least two
/// distinct known types participate somewhere in the subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergedType {
    Unknown,
    Single(String),
    Mixed,
}

impl std::fmt::Display for MergedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergedType::Unknown => write!(f, "unknown"),
            MergedType::Single(ty) => write!(f, "{ty}"),
            MergedType::Mixed => write!(f, "Mixed"),
        }
    }
}

/// Fold a sequence of optional raw types into a verdict. `Mixed` absorbs
/// everything after it, so element order cannot change the outcome.
pub fn combine<I>(types: I) -> MergedType
where I: IntoIterator<Item = Option<String>> {
    types.into_iter().fold(MergedType::Unknown, |acc, next| {
        combine_verdicts(acc, match next {
            Some(ty) => MergedType::Single(ty),
            None => MergedType::Unknown,
        })
    })
}

fn combine_verdicts(acc: MergedType, next: MergedType) -> MergedType {
    match (acc, next) {
        (MergedType::Mixed, _) | (_, MergedType::Mixed) => MergedType::Mixed,
        (MergedType::Single(a), MergedType::Single(b)) => {
            if a == b {
                MergedType::Single(a)
            } else {
                MergedType::Mixed
            }
        }
        (MergedType::Single(a), MergedType::Unknown) => MergedType::Single(a),
        (MergedType::Unknown, next) => next,
    }
}

/// Cache of externally supplied raw types plus the memoized per-main merged
/// verdict. The memo is a derived view: it is wiped wholesale after every
/// mutating operation and lazily recomputed on the next read.
#[derive(Debug, Default)]
pub struct SemanticIndex {
    raw: HashMap<SegmentId, Option<String>>,
    memo: HashMap<SegmentId, MergedType>,
}

impl SemanticIndex {
    pub fn new() -> Self { Self::default() }

    /// Record raw types reported by the lookup collaborator.
    pub fn record_types<I>(&mut self, types: I)
    where I: IntoIterator<Item = (SegmentId, Option<String>)> {
        for (id, ty) in types {
            self.raw.insert(id, ty);
        }
    }

    pub fn raw_type(&self, id: SegmentId) -> Option<&str> { self.raw.get(&id).and_then(|ty| ty.as_deref()) }

    /// Memoized merged type for `id`. Ids that do not head a group report
    /// their own raw type; groups recursively combine the main's own type
    /// with each direct member's merged type.
    pub fn merged_type(&mut self, store: &EquivalenceStore, id: SegmentId) -> MergedType {
        if let Some(hit) = self.memo.get(&id) {
            return hit.clone();
        }
        let own = match self.raw.get(&id).cloned().flatten() {
            Some(ty) => MergedType::Single(ty),
            None => MergedType::Unknown,
        };
        let verdict = match store.others_of(id) {
            None => own,
            Some(others) => {
                let others = others.clone();
                others.into_iter().fold(own, |acc, other| combine_verdicts(acc, self.merged_type(store, other)))
            }
        };
        self.memo.insert(id, verdict.clone());
        verdict
    }

    pub fn is_memoized(&self, id: SegmentId) -> bool { self.memo.contains_key(&id) }

    /// Drop every memoized verdict. Raw types stay; they are facts about the
    /// segments, not about the current grouping.
    pub fn invalidate(&mut self) {
        if !self.memo.is_empty() {
            debug!(entries = self.memo.len(), "invalidating merged-type memo");
        }
        self.memo.clear();
    }

    pub fn reset(&mut self) {
        self.raw.clear();
        self.memo.clear();
    }

    /// Advisory warning when the just-merged ids span distinct known types.
    /// Lists the first two `type: ids` groupings and elides the rest.
    pub fn conflict_warning(&self, ids: &[SegmentId]) -> Option<String> {
        let mut by_type: BTreeMap<&str, Vec<SegmentId>> = BTreeMap::new();
        for &id in ids {
            if let Some(ty) = self.raw_type(id) {
                by_type.entry(ty).or_default().push(id);
            }
        }
        if by_type.len() < 2 {
            return None;
        }
        let mut groupings = by_type.iter().map(|(ty, members)| {
            let members = members.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ");
            format!("{ty} ({members})")
        });
        let first = groupings.next().unwrap_or_default();
        let second = groupings.next().unwrap_or_default();
        let elision = if by_type.len() > 2 { ", etc." } else { "" };
        Some(format!("merging segments of differing types: {first} vs {second}{elision}"))
    }
}
