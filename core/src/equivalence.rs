use segmerge_proto::{EquivalenceSnapshot, SegmentId};
use std::collections::BTreeMap;
use tracing::debug;

/// The forest of merges: `main -> [others...]` plus its inverse index, owned
/// together behind mutation methods so the two can never drift apart.
///
/// Invariants: an id heads at most one group and belongs to at most one
/// group's member list; a main never appears in its own member list; every
/// inverse entry corresponds to exactly one forward membership.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquivalenceStore {
    main_to_others: BTreeMap<SegmentId, Vec<SegmentId>>,
    other_to_main: BTreeMap<SegmentId, SegmentId>,
    // mains in group-creation order, persisted for audit/undo
    ordering: Vec<SegmentId>,
}

impl EquivalenceStore {
    pub fn new() -> Self { Self::default() }

    /// Follow the inverse index until no further mapping exists. A plain id is
    /// its own ultimate main. `merge_into` never constructs a cycle, but a
    /// malformed snapshot must not hang us, so traversal is hop-bounded.
    pub fn ultimate_main(&self, id: SegmentId) -> SegmentId {
        let mut current = id;
        let mut hops = 0;
        while let Some(&main) = self.other_to_main.get(&current) {
            current = main;
            hops += 1;
            if hops > self.other_to_main.len() {
                break;
            }
        }
        current
    }

    /// Merge each of `others` onto the group headed by `main_chosen`'s
    /// ultimate main. Candidates already in that group (including the main
    /// itself) are skipped, so a merge where every candidate is skipped leaves
    /// the store exactly as it was. Returns the resolved main.
    pub fn merge_into(&mut self, main_chosen: SegmentId, others: &[SegmentId]) -> SegmentId {
        let main = self.ultimate_main(main_chosen);
        let mut absorbed = Vec::new();
        for &other in others {
            let other_main = self.ultimate_main(other);
            if other_main == main {
                continue;
            }
            self.other_to_main.insert(other_main, main);
            absorbed.push(other_main);
        }
        if !absorbed.is_empty() {
            debug!(%main, ?absorbed, "merging");
            if !self.main_to_others.contains_key(&main) {
                self.ordering.push(main);
            }
            self.main_to_others.entry(main).or_default().extend(absorbed);
        }
        main
    }

    /// Dissolve the group headed by each selected id's ultimate main,
    /// replacing the id with `[main, members...]` in the original merge order
    /// so an immediate re-merge reconstructs the same group. Ids without a
    /// group pass through unchanged. Returns the flattened new selection.
    pub fn unmerge_group(&mut self, selected: &[SegmentId]) -> Vec<SegmentId> {
        let mut next_selection = Vec::new();
        for &id in selected {
            let main = self.ultimate_main(id);
            match self.main_to_others.remove(&main) {
                Some(members) => {
                    debug!(%main, ?members, "unmerging");
                    for member in &members {
                        self.other_to_main.remove(member);
                    }
                    self.ordering.retain(|&m| m != main);
                    next_selection.push(main);
                    next_selection.extend(members);
                }
                None => next_selection.push(id),
            }
        }
        next_selection
    }

    /// Dissolve every group and empty both indices.
    pub fn clear_all(&mut self) {
        debug!(groups = self.main_to_others.len(), "clearing all merges");
        self.main_to_others.clear();
        self.other_to_main.clear();
        self.ordering.clear();
    }

    /// Depth-first expansion: each id followed by the recursive expansion of
    /// its group's direct members, concatenated across the input. Duplicates
    /// in the input are not removed; callers that need a set must dedupe.
    pub fn expand(&self, ids: &[SegmentId]) -> Vec<SegmentId> {
        let mut out = Vec::new();
        for &id in ids {
            self.expand_into(id, &mut out);
        }
        out
    }

    fn expand_into(&self, id: SegmentId, out: &mut Vec<SegmentId>) {
        out.push(id);
        if let Some(others) = self.main_to_others.get(&id) {
            for &other in others {
                self.expand_into(other, out);
            }
        }
    }

    pub fn groups(&self) -> &BTreeMap<SegmentId, Vec<SegmentId>> { &self.main_to_others }

    pub fn others_of(&self, main: SegmentId) -> Option<&Vec<SegmentId>> { self.main_to_others.get(&main) }

    pub fn is_group_main(&self, id: SegmentId) -> bool { self.main_to_others.contains_key(&id) }

    pub fn is_empty(&self) -> bool { self.main_to_others.is_empty() && self.other_to_main.is_empty() }

    /// Flattened `[main, others...]` per group, for the viewer.
    pub fn equivalence_lists(&self) -> Vec<Vec<SegmentId>> {
        self.main_to_others
            .iter()
            .map(|(main, others)| {
                let mut list = Vec::with_capacity(1 + others.len());
                list.push(*main);
                list.extend(others.iter().copied());
                list
            })
            .collect()
    }

    pub fn snapshot(&self) -> EquivalenceSnapshot {
        EquivalenceSnapshot {
            main_to_others: self.main_to_others.clone(),
            other_to_main: self.other_to_main.clone(),
            ordering: self.ordering.clone(),
        }
    }

    /// Replace the entire store contents with a restored snapshot.
    pub fn apply_snapshot(&mut self, snapshot: EquivalenceSnapshot) {
        self.main_to_others = snapshot.main_to_others;
        self.other_to_main = snapshot.other_to_main;
        self.ordering = snapshot.ordering;
    }

    /// Check the bijective-consistency invariant. A violation here is a bug in
    /// the mutation methods, so this exists for tests, not runtime recovery.
    pub fn verify_consistent(&self) -> Result<(), String> {
        for (main, others) in &self.main_to_others {
            if others.is_empty() {
                return Err(format!("group {main} has no members"));
            }
            for other in others {
                if other == main {
                    return Err(format!("group {main} contains itself"));
                }
                match self.other_to_main.get(other) {
                    Some(m) if m == main => {}
                    Some(m) => return Err(format!("member {other} of group {main} maps back to {m}")),
                    None => return Err(format!("member {other} of group {main} has no inverse entry")),
                }
            }
        }
        for (other, main) in &self.other_to_main {
            match self.main_to_others.get(main) {
                Some(others) if others.contains(other) => {}
                _ => return Err(format!("inverse entry {other} -> {main} has no forward membership")),
            }
        }
        Ok(())
    }
}
