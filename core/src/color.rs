use crate::equivalence::EquivalenceStore;
use segmerge_proto::SegmentId;
use std::collections::HashMap;

/// Host-supplied deterministic color function, keyed by the decimal string of
/// a group's ultimate main (e.g. a hash-based palette).
pub type ColorFn = dyn Fn(&str) -> String + Send + Sync + 'static;

/// One color per merge-group member, derived from the current store state.
/// Nothing is stored; the map is recomputed after every change.
pub fn group_colors(store: &EquivalenceStore, color: &ColorFn) -> HashMap<SegmentId, String> {
    let mut colors = HashMap::new();
    for (&main, others) in store.groups() {
        // mains should already be terminal; resolve anyway
        let terminal = store.ultimate_main(main);
        let value = color(&terminal.to_string());
        colors.insert(main, value.clone());
        for &other in others {
            colors.insert(other, value.clone());
        }
    }
    colors
}
