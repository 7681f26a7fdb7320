//! Observable state with write-through persistence.
//!
//! Both cart stores keep their state in a `tokio::sync::watch` channel:
//! mutations run under the channel's write lock and subscribers are woken
//! only when something changed. The snapshot is written after the channel
//! lock is released, under a separate writer lock, and always from the
//! latest state, so the file on disk never ends on an older snapshot.
//!
//! Writes are synchronous and small (one JSON file per cart).

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use super::storage::{CartStorage, persist, restore};

pub struct PersistedState<S> {
    state: watch::Sender<S>,
    storage: Arc<dyn CartStorage>,
    namespace: &'static str,
    writer: Mutex<()>,
}

impl<S> PersistedState<S>
where
    S: Clone + Default + Serialize + DeserializeOwned,
{
    /// Restore the state saved under `namespace`, or start from `S::default()`.
    pub fn load(storage: Arc<dyn CartStorage>, namespace: &'static str) -> Self {
        let initial = restore::<S>(storage.as_ref(), namespace).unwrap_or_default();

        Self {
            state: watch::Sender::new(initial),
            storage,
            namespace,
            writer: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> S {
        self.state.borrow().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.state.subscribe()
    }

    /// Apply `f`; when it reports a change, notify subscribers and persist.
    pub fn mutate(&self, f: impl FnOnce(&mut S) -> bool) -> bool {
        let changed = self.state.send_if_modified(f);
        if changed {
            self.persist_latest();
        }
        changed
    }

    /// Apply `f` and notify subscribers without writing to storage.
    ///
    /// For transient fields that are excluded from the snapshot.
    pub fn mutate_transient(&self, f: impl FnOnce(&mut S) -> bool) -> bool {
        self.state.send_if_modified(f)
    }

    fn persist_latest(&self) {
        let _writing = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let latest = self.snapshot();
        persist(self.storage.as_ref(), self.namespace, &latest);
    }
}
