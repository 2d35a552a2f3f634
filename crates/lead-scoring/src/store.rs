//! Storage primitives shared by the interaction and assessment services.

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Per-subject mutual exclusion so writers never score against stale history.
///
/// Subjects never contend with each other; only callers sharing a key serialise.
/// An entry lives only while some caller holds a [`SubjectHandle`] for it, so the
/// registry is bounded by the number of subjects with in-flight writes.
pub struct SubjectLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for SubjectLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> SubjectLocks<K>
where
    K: Eq + Hash + Clone,
{
    /// Returns the lock handle for `key`; hold `acquire(&handle)` for the whole
    /// read-modify-write.
    pub fn handle(&self, key: &K) -> Result<SubjectHandle<'_, K>, RepositoryError> {
        let mut guard = self
            .locks
            .lock()
            .map_err(|_| RepositoryError::Unavailable("lock registry poisoned".to_string()))?;
        let lock = guard.entry(key.clone()).or_default().clone();
        Ok(SubjectHandle {
            registry: self,
            key: key.clone(),
            lock,
        })
    }

    /// Number of subjects currently tracked.
    pub fn len(&self) -> usize {
        self.locks.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared lock for one subject; dropping the last handle prunes the registry entry.
pub struct SubjectHandle<'a, K>
where
    K: Eq + Hash,
{
    registry: &'a SubjectLocks<K>,
    key: K,
    lock: Arc<Mutex<()>>,
}

impl<K> Deref for SubjectHandle<'_, K>
where
    K: Eq + Hash,
{
    type Target = Mutex<()>;

    fn deref(&self) -> &Self::Target {
        &self.lock
    }
}

impl<K> Drop for SubjectHandle<'_, K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        let Ok(mut locks) = self.registry.locks.lock() else {
            return;
        };
        // Clones are only handed out under the registry lock: the map plus this
        // handle means nobody else can be waiting on the subject.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.key);
        }
    }
}

/// Source of "now" for session timestamps and result ids.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub(crate) fn acquire(handle: &Mutex<()>) -> Result<MutexGuard<'_, ()>, RepositoryError> {
    handle
        .lock()
        .map_err(|_| RepositoryError::Unavailable("subject lock poisoned".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn same_subject_shares_one_lock() {
        let locks: SubjectLocks<String> = SubjectLocks::default();
        let first = locks.handle(&"lead-1".to_string()).expect("handle");
        let second = locks.handle(&"lead-1".to_string()).expect("handle");
        let other = locks.handle(&"lead-2".to_string()).expect("handle");

        assert!(Arc::ptr_eq(&first.lock, &second.lock));
        assert!(!Arc::ptr_eq(&first.lock, &other.lock));
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn distinct_subjects_do_not_block_each_other() {
        let locks: SubjectLocks<&'static str> = SubjectLocks::default();
        let a = locks.handle(&"a").expect("handle");
        let b = locks.handle(&"b").expect("handle");

        let _held = acquire(&a).expect("lock a");
        assert!(b.try_lock().is_ok());
    }

    #[test]
    fn released_subjects_are_pruned() {
        let locks: SubjectLocks<String> = SubjectLocks::default();
        {
            let first = locks.handle(&"lead-1".to_string()).expect("handle");
            let second = locks.handle(&"lead-1".to_string()).expect("handle");
            drop(first);
            assert_eq!(locks.len(), 1, "still held by the second handle");
            let _guard = acquire(&second).expect("lock");
        }
        assert!(locks.is_empty());

        thread::scope(|scope| {
            for worker in 0..8 {
                let locks = &locks;
                scope.spawn(move || {
                    for round in 0..50 {
                        let key = format!("lead-{}", (worker + round) % 4);
                        let handle = locks.handle(&key).expect("handle");
                        let _guard = acquire(&handle).expect("lock");
                    }
                });
            }
        });
        assert!(locks.is_empty());
    }
}
