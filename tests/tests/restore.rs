
use common::*;
use segmerge_core::changes::MergeChange;
use segmerge_core::semantic::MergedType;
use segmerge_core::MergeManager;
use segmerge_proto::{EquivalenceSnapshot, Severity};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

fn saved_snapshot() -> EquivalenceSnapshot {
    let mut snapshot = EquivalenceSnapshot::empty();
    snapshot.main_to_others.insert(id(1), vec![id(2), id(3)]);
    snapshot.other_to_main.insert(id(2), id(1));
    snapshot.other_to_main.insert(id(3), id(1));
    snapshot.ordering = vec![id(1)];
    snapshot
}

#[tokio::test]
async fn restore_replaces_state_and_pushes_to_viewer() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let viewer = RecordingViewer::new();
    let manager = MergeManager::new(store.clone(), viewer.clone(), palette());

    store.set_snapshot(saved_snapshot());
    manager.restore().await;

    assert_eq!(manager.equivalence_lists(), vec![vec![id(1), id(2), id(3)]]);
    assert_eq!(viewer.last_equivalences(), Some(vec![vec![id(1), id(2), id(3)]]));
    assert_eq!(viewer.last_colors().unwrap().get(&id(3)), Some(&"#1".to_owned()));
    Ok(())
}

#[tokio::test]
async fn restore_normalizes_the_current_selection() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let viewer = RecordingViewer::new();
    let manager = MergeManager::new(store.clone(), viewer.clone(), palette());

    // a working selection exists before the saved state comes back
    manager.select(&[id(2), id(5)]);
    store.set_snapshot(saved_snapshot());
    manager.restore().await;

    // 2 was absorbed into 1 in the restored state
    assert_eq!(manager.selection(), vec![id(1), id(5)]);
    Ok(())
}

#[tokio::test]
async fn failed_restore_resets_to_a_valid_empty_state() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let viewer = RecordingViewer::new();
    let alerts = AlertSink::new();
    let manager = MergeManager::new(store.clone(), viewer.clone(), palette()).with_alert(alert_fn(&alerts));

    // build up local state first so the reset is observable
    manager.select(&[id(7), id(8)]);
    manager.merge().await;

    store.fail_restore.store(true, Ordering::SeqCst);
    manager.restore().await;

    assert!(manager.equivalence_lists().is_empty());
    assert!(manager.selection().is_empty());
    let raised = alerts.all();
    assert!(raised.iter().any(|(severity, message)| *severity == Severity::Error && message.contains("could not load")));
    assert_eq!(viewer.last_equivalences(), Some(vec![]));

    // the engine keeps working afterwards
    manager.select(&[id(1), id(2)]);
    manager.merge().await;
    assert_eq!(manager.equivalence_lists(), vec![vec![id(1), id(2)]]);
    Ok(())
}

#[tokio::test]
async fn restore_result_is_discarded_after_a_local_mutation() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let viewer = RecordingViewer::new();
    let manager = Arc::new(MergeManager::new(store.clone(), viewer.clone(), palette()));

    store.set_snapshot(saved_snapshot());
    store.gate_restore();

    let task = tokio::spawn({
        let manager = manager.clone();
        async move { manager.restore().await }
    });
    store.restore_in_flight().await;

    // a local mutation lands while the restore is in flight
    manager.select(&[id(9)]);

    store.release_restore();
    task.await?;

    // the stale result was dropped, not applied over the newer local state
    assert!(manager.equivalence_lists().is_empty());
    assert_eq!(manager.selection(), vec![id(9)]);
    Ok(())
}

#[tokio::test]
async fn restore_notifies_even_on_failure() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let viewer = RecordingViewer::new();
    let manager = MergeManager::new(store.clone(), viewer.clone(), palette());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let _handle = manager.subscribe({
        let seen = seen.clone();
        move |change: &MergeChange| seen.lock().unwrap().push(change.clone())
    });

    store.fail_restore.store(true, Ordering::SeqCst);
    manager.restore().await;

    assert_eq!(seen.lock().unwrap().as_slice(), &[MergeChange::Restored]);
    Ok(())
}

#[tokio::test]
async fn restore_warms_merged_types_when_lookup_is_configured() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let viewer = RecordingViewer::new();
    let types = ScriptedTypes::new();
    types.set_type(id(1), Some("Neuron"));
    types.set_type(id(2), Some("Neuron"));
    types.set_type(id(3), Some("Glia"));

    let manager = MergeManager::new(store.clone(), viewer.clone(), palette()).with_type_lookup(types.clone());

    store.set_snapshot(saved_snapshot());
    manager.restore().await;

    assert_eq!(types.lookup_count.load(Ordering::SeqCst), 1);
    assert_eq!(manager.merged_type(id(1)), MergedType::Mixed);
    // the memo answers for absorbed members through their ultimate main
    assert_eq!(manager.merged_type(id(2)), MergedType::Mixed);
    Ok(())
}
