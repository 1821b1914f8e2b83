//! Keyed debounce scheduler.
//!
//! Each key owns at most one pending tokio task. Scheduling again under the
//! same key before the delay elapses aborts the pending task and starts a
//! new timer, so only the last call in a burst runs. A task leaves the
//! pending map before it starts running, which means `abort` only ever hits
//! tasks that are still sleeping.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

struct Pending {
    token: u64,
    handle: JoinHandle<()>,
}

type PendingMap = HashMap<String, Pending>;

#[derive(Default)]
pub struct Debouncer {
    pending: Arc<Mutex<PendingMap>>,
    next_token: AtomicU64,
}

fn lock(map: &Mutex<PendingMap>) -> MutexGuard<'_, PendingMap> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay` unless `key` is scheduled again first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, key: &str, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let pending = Arc::clone(&self.pending);
        let owned_key = key.to_string();

        // Held across spawn + insert so the new task cannot observe the map
        // before its own entry is in place.
        let mut map = lock(&self.pending);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut map = lock(&pending);
                match map.get(&owned_key) {
                    Some(entry) if entry.token == token => {
                        map.remove(&owned_key);
                    }
                    _ => return,
                }
            }
            tracing::trace!(key = %owned_key, "debounced task firing");
            task.await;
        });

        if let Some(previous) = map.insert(key.to_string(), Pending { token, handle }) {
            tracing::trace!(key, "superseding pending task");
            previous.handle.abort();
        }
    }

    /// Drop the pending task for `key`, if any. Returns whether one existed.
    pub fn cancel(&self, key: &str) -> bool {
        match lock(&self.pending).remove(key) {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        lock(&self.pending).contains_key(key)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        for (_, entry) in lock(&self.pending).drain() {
            entry.handle.abort();
        }
    }
}
