use crate::changes::MergeChange;
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

/// A callback function that receives change notifications
pub type Callback = Box<dyn Fn(&MergeChange) + Send + Sync + 'static>;

/// Small internal publish/subscribe list. Subscribing hands back a
/// [`SubscriptionHandle`] that unsubscribes on drop, so a host view can
/// replace its subscription across re-renders without leaking closures.
#[derive(Default)]
pub struct Notifier {
    subscribers: Mutex<Vec<(usize, Arc<Callback>)>>,
    next_id: std::sync::atomic::AtomicUsize,
}

impl Notifier {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> SubscriptionHandle
    where F: Fn(&MergeChange) + Send + Sync + 'static {
        let id = self.next_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.subscribers.lock().unwrap().push((id, Arc::new(Box::new(callback))));
        SubscriptionHandle { id, notifier: Arc::downgrade(self) }
    }

    pub fn notify(&self, change: &MergeChange) {
        // snapshot under the lock, call outside it; a callback may drop a
        // handle and re-enter unsubscribe
        let subscribers: Vec<Arc<Callback>> = self.subscribers.lock().unwrap().iter().map(|(_, cb)| cb.clone()).collect();
        for callback in subscribers {
            callback(change);
        }
    }

    fn unsubscribe(&self, id: usize) { self.subscribers.lock().unwrap().retain(|(sub_id, _)| *sub_id != id); }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize { self.subscribers.lock().unwrap().len() }
}

/// Keeps its callback registered for as long as it is held.
pub struct SubscriptionHandle {
    id: usize,
    notifier: Weak<Notifier>,
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        debug!(id = self.id, "dropping subscription handle");
        if let Some(notifier) = self.notifier.upgrade() {
            notifier.unsubscribe(self.id);
        }
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "SubscriptionHandle({})", self.id) }
}
