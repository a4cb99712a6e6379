use crate::changes::MergeChange;
use crate::color::{group_colors, ColorFn};
use crate::equivalence::EquivalenceStore;
use crate::selection;
use crate::semantic::{MergedType, SemanticIndex};
use crate::storage::MergeStorage;
use crate::subscription::{Notifier, SubscriptionHandle};
use crate::traits::{AlertFn, TypeLookup, ViewerActions};
use segmerge_proto::{EquivalenceSnapshot, SegmentId, Severity};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

#[derive(Default)]
struct EngineState {
    store: EquivalenceStore,
    selection: Vec<SegmentId>,
    semantic: SemanticIndex,
}

/// The session controller: composes the equivalence store, selection
/// tracking, semantic-type bookkeeping, color assignment, and persistence
/// behind the public merge/unmerge/clear/select operations.
///
/// In-memory state transitions complete synchronously before any asynchronous
/// side effect is issued, so observers never see an intermediate. Recoverable
/// I/O failures surface through the alert callback, never as errors from
/// these methods. The mutation counter implements the stale-restore guard: a
/// `restore` that resolves after an intervening local mutation is discarded.
pub struct MergeManager {
    state: Mutex<EngineState>,
    mutation_counter: AtomicU64,
    storage: Arc<dyn MergeStorage>,
    viewer: Arc<dyn ViewerActions>,
    color: Arc<ColorFn>,
    types: Option<Arc<dyn TypeLookup>>,
    alert: Arc<AlertFn>,
    notifier: Arc<Notifier>,
}

impl MergeManager {
    pub fn new(storage: Arc<dyn MergeStorage>, viewer: Arc<dyn ViewerActions>, color: Arc<ColorFn>) -> Self {
        Self {
            state: Mutex::new(EngineState::default()),
            mutation_counter: AtomicU64::new(0),
            storage,
            viewer,
            color,
            types: None,
            alert: Arc::new(log_alert),
            notifier: Notifier::new(),
        }
    }

    pub fn with_type_lookup(mut self, lookup: Arc<dyn TypeLookup>) -> Self {
        self.types = Some(lookup);
        self
    }

    pub fn with_alert(mut self, alert: Arc<AlertFn>) -> Self {
        self.alert = alert;
        self
    }

    /// Register a change callback. The subscription lives as long as the
    /// returned handle.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where F: Fn(&MergeChange) + Send + Sync + 'static {
        self.notifier.subscribe(callback)
    }

    /// Replace the working selection with the reconciliation of the current
    /// one against a raw viewer-reported set.
    pub fn select(&self, raw: &[SegmentId]) {
        let reconciled = {
            let mut guard = self.state.lock().unwrap();
            let reconciled = selection::reconcile(&guard.store, &guard.selection, raw);
            guard.selection = reconciled.clone();
            reconciled
        };
        self.mutation_counter.fetch_add(1, Ordering::SeqCst);
        self.notifier.notify(&MergeChange::Selection(reconciled));
    }

    pub fn selection(&self) -> Vec<SegmentId> { self.state.lock().unwrap().selection.clone() }

    /// Merge the current selection: the first selected id becomes the group
    /// main, the rest are absorbed. A selection of fewer than two ids is a
    /// no-op. Persistence and the type-conflict check run after the local
    /// state is already final.
    pub async fn merge(&self) {
        let (main, involved, snapshot) = {
            let mut guard = self.state.lock().unwrap();
            if guard.selection.len() < 2 {
                return;
            }
            let state = &mut *guard;
            let involved = state.selection.clone();
            let main = state.store.merge_into(involved[0], &involved[1..]);
            state.semantic.invalidate();
            state.selection = vec![main];
            (main, involved, state.store.snapshot())
        };
        self.mutation_counter.fetch_add(1, Ordering::SeqCst);
        debug!(%main, "merged selection");
        self.push_merge_state();
        self.persist(&snapshot).await;
        self.notifier.notify(&MergeChange::Merges);
        self.warn_on_type_conflict(&involved).await;
    }

    /// Dissolve the groups headed by the current selection. The replaced
    /// selection (`[main, members...]` per dissolved group, pass-through
    /// otherwise) lets an immediate re-merge reconstruct the same groups.
    pub async fn unmerge(&self) {
        let snapshot = {
            let mut guard = self.state.lock().unwrap();
            let state = &mut *guard;
            let replaced = state.store.unmerge_group(&state.selection);
            state.semantic.invalidate();
            state.selection = replaced;
            state.store.snapshot()
        };
        self.mutation_counter.fetch_add(1, Ordering::SeqCst);
        self.push_merge_state();
        self.persist(&snapshot).await;
        self.notifier.notify(&MergeChange::Merges);
    }

    /// Drop every merge group and push the emptied state everywhere.
    pub async fn clear(&self) {
        let snapshot = {
            let mut guard = self.state.lock().unwrap();
            guard.store.clear_all();
            guard.semantic.invalidate();
            guard.store.snapshot()
        };
        self.mutation_counter.fetch_add(1, Ordering::SeqCst);
        self.viewer.set_segment_equivalences(&[]);
        self.viewer.set_segment_colors(&HashMap::new());
        self.persist(&snapshot).await;
        self.notifier.notify(&MergeChange::Merges);
    }

    /// Ask the viewer to show exactly this id set. No local state changes.
    pub fn isolate(&self, ids: &[SegmentId]) { self.viewer.set_segments(ids); }

    /// Depth-first expansion of each id through its merge group; duplicates
    /// are preserved, callers dedupe.
    pub fn expand(&self, ids: &[SegmentId]) -> Vec<SegmentId> { self.state.lock().unwrap().store.expand(ids) }

    /// Memoized merged-type verdict for the group containing `id`.
    pub fn merged_type(&self, id: SegmentId) -> MergedType {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let main = state.store.ultimate_main(id);
        state.semantic.merged_type(&state.store, main)
    }

    pub fn equivalence_lists(&self) -> Vec<Vec<SegmentId>> { self.state.lock().unwrap().store.equivalence_lists() }

    /// Write the current state to the persistence backend. A failure alerts
    /// and leaves the in-memory state authoritative; the next restore would
    /// simply be stale.
    pub async fn store(&self) {
        let snapshot = self.state.lock().unwrap().store.snapshot();
        self.persist(&snapshot).await;
    }

    /// Load state from the persistence backend, replacing the current merge
    /// state. The result is discarded if a local mutation happened while the
    /// load was in flight. A failed load resets to an empty, valid state and
    /// still notifies, so dependent views never observe a torn state.
    pub async fn restore(&self) {
        let started_at = self.mutation_counter.load(Ordering::SeqCst);
        let result = self.storage.restore().await;

        let mut failure = None;
        {
            let mut guard = self.state.lock().unwrap();
            if self.mutation_counter.load(Ordering::SeqCst) != started_at {
                debug!("discarding restore result that lost the race to a local mutation");
                return;
            }
            let state = &mut *guard;
            match result {
                Ok(snapshot) => {
                    state.store.apply_snapshot(snapshot);
                    let normalized = selection::normalize(&state.store, &state.selection);
                    state.selection = normalized;
                    state.semantic.invalidate();
                }
                Err(e) => {
                    warn!(error = %e, "restore failed, resetting to empty state");
                    failure = Some(format!("could not load saved merges: {e}"));
                    state.store = EquivalenceStore::new();
                    state.selection.clear();
                    state.semantic.reset();
                }
            }
        }
        self.mutation_counter.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &failure {
            (self.alert)(Severity::Error, message);
        }
        self.push_merge_state();
        if failure.is_none() {
            self.warm_merged_types().await;
        }
        self.notifier.notify(&MergeChange::Restored);
    }

    /// Recompute equivalence lists and colors from the current store and push
    /// them to the viewer.
    fn push_merge_state(&self) {
        let (groups, colors) = {
            let guard = self.state.lock().unwrap();
            (guard.store.equivalence_lists(), group_colors(&guard.store, &*self.color))
        };
        self.viewer.set_segment_equivalences(&groups);
        self.viewer.set_segment_colors(&colors);
    }

    async fn persist(&self, snapshot: &EquivalenceSnapshot) {
        if let Err(e) = self.storage.store(snapshot).await {
            warn!(error = %e, "failed to store merge state");
            (self.alert)(Severity::Error, &format!("could not save merges: {e}"));
        }
    }

    /// After a merge, fetch the raw types of the ids that participated and
    /// alert when they span distinct known types. Advisory only; the merge has
    /// already happened and stays.
    async fn warn_on_type_conflict(&self, ids: &[SegmentId]) {
        let Some(lookup) = &self.types else { return };
        match lookup.get_types(ids).await {
            Ok(types) => {
                let warning = {
                    let mut guard = self.state.lock().unwrap();
                    guard.semantic.record_types(types);
                    guard.semantic.conflict_warning(ids)
                };
                if let Some(message) = warning {
                    (self.alert)(Severity::Warning, &message);
                }
            }
            Err(e) => {
                warn!(error = %e, "type lookup failed after merge");
                (self.alert)(Severity::Error, &format!("could not fetch segment types: {e}"));
            }
        }
    }

    /// After a successful restore, fetch types for every member of every
    /// group and warm the merged-type memo.
    async fn warm_merged_types(&self) {
        let Some(lookup) = &self.types else { return };
        let (mains, all_ids) = {
            let guard = self.state.lock().unwrap();
            let mains: Vec<SegmentId> = guard.store.groups().keys().copied().collect();
            let all_ids = guard.store.expand(&mains);
            (mains, all_ids)
        };
        if mains.is_empty() {
            return;
        }
        match lookup.get_types(&all_ids).await {
            Ok(types) => {
                let mut guard = self.state.lock().unwrap();
                let state = &mut *guard;
                state.semantic.record_types(types);
                for &main in &mains {
                    state.semantic.merged_type(&state.store, main);
                }
            }
            Err(e) => {
                warn!(error = %e, "type lookup failed after restore");
                (self.alert)(Severity::Error, &format!("could not fetch segment types: {e}"));
            }
        }
    }
}

fn log_alert(severity: Severity, message: &str) {
    match severity {
        Severity::Info => info!("{message}"),
        Severity::Warning => warn!("{message}"),
        Severity::Error => error!("{message}"),
    }
}
