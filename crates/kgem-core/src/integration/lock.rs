//! Named mutual exclusion.
//!
//! [`NamedLock`] hands out one async mutex per key. Tasks locking equal keys
//! run one after another; tasks locking different keys never wait on each
//! other. Entries are created on demand and dropped again once nobody holds
//! or waits for them, so the table only ever contains live keys.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Entries<K> = Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>;

/// A table of async mutexes keyed by arbitrary hashable values.
pub struct NamedLock<K> {
    entries: Entries<K>,
}

impl<K> Default for NamedLock<K> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K> NamedLock<K>
where
    K: Hash + Eq + Clone + Send + 'static,
{
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`.
    ///
    /// The returned guard releases the key when dropped, on every exit path.
    pub async fn lock(&self, key: K) -> NamedLockGuard<K> {
        let entry = {
            let mut entries = self.entries.lock();
            Arc::clone(
                entries
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };

        let guard = Arc::clone(&entry).lock_owned().await;

        NamedLockGuard {
            key,
            entry,
            guard: Some(guard),
            entries: Arc::clone(&self.entries),
        }
    }

    /// Returns `true` if some task currently holds or waits for `key`.
    pub fn is_locked(&self, key: &K) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Returns the number of keys currently held or waited for.
    pub fn active_keys(&self) -> usize {
        self.entries.lock().len()
    }
}

impl<K> fmt::Debug for NamedLock<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedLock")
            .field("active_keys", &self.entries.lock().len())
            .finish()
    }
}

/// Exclusive access to one key of a [`NamedLock`].
pub struct NamedLockGuard<K>
where
    K: Hash + Eq,
{
    key: K,
    entry: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
    entries: Entries<K>,
}

impl<K: Hash + Eq> NamedLockGuard<K> {
    /// The key this guard holds.
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Hash + Eq> Drop for NamedLockGuard<K> {
    fn drop(&mut self) {
        // Release first so the owned guard gives back its reference.
        drop(self.guard.take());

        let mut entries = self.entries.lock();
        let unused = entries
            .get(&self.key)
            .is_some_and(|e| Arc::ptr_eq(e, &self.entry) && Arc::strong_count(e) == 2);
        if unused {
            entries.remove(&self.key);
        }
    }
}
