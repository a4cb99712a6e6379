
use common::*;
use segmerge_core::changes::MergeChange;
use segmerge_core::MergeManager;
use std::sync::{Arc, Mutex};

fn watcher(manager: &MergeManager) -> (Arc<Mutex<Vec<MergeChange>>>, segmerge_core::subscription::SubscriptionHandle) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let handle = manager.subscribe({
        let seen = seen.clone();
        move |change: &MergeChange| seen.lock().unwrap().push(change.clone())
    });
    (seen, handle)
}

#[tokio::test]
async fn operations_notify_in_order() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let viewer = RecordingViewer::new();
    let manager = MergeManager::new(store.clone(), viewer, palette());
    let (seen, _handle) = watcher(&manager);

    manager.select(&[id(1), id(2)]);
    manager.merge().await;
    manager.select(&[id(1)]);
    manager.unmerge().await;
    manager.clear().await;
    manager.restore().await;

    assert_eq!(
        seen.lock().unwrap().as_slice(),
        &[
            MergeChange::Selection(vec![id(1), id(2)]),
            MergeChange::Merges,
            MergeChange::Selection(vec![id(1)]),
            MergeChange::Merges,
            MergeChange::Merges,
            MergeChange::Restored,
        ]
    );
    Ok(())
}

#[tokio::test]
async fn selection_change_carries_the_reconciled_selection() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let viewer = RecordingViewer::new();
    let manager = MergeManager::new(store.clone(), viewer, palette());
    let (seen, _handle) = watcher(&manager);

    manager.select(&[id(1), id(2)]);
    manager.merge().await;
    // raw report references the absorbed id
    manager.select(&[id(2), id(3)]);

    let last = seen.lock().unwrap().last().cloned();
    assert_eq!(last, Some(MergeChange::Selection(vec![id(1), id(3)])));
    Ok(())
}

#[tokio::test]
async fn dropped_handles_stop_receiving() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let viewer = RecordingViewer::new();
    let manager = MergeManager::new(store.clone(), viewer, palette());
    let (seen, handle) = watcher(&manager);

    manager.select(&[id(1)]);
    drop(handle);
    manager.select(&[id(1), id(2)]);

    assert_eq!(seen.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn replacing_a_subscription_does_not_leak_the_old_one() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let viewer = RecordingViewer::new();
    let manager = MergeManager::new(store.clone(), viewer, palette());

    let (first, first_handle) = watcher(&manager);
    let (second, _second_handle) = watcher(&manager);
    drop(first_handle);

    manager.select(&[id(4)]);

    assert!(first.lock().unwrap().is_empty());
    assert_eq!(second.lock().unwrap().len(), 1);
    Ok(())
}
