use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::clock::Clock;
use crate::entry::Entry;
use crate::error::CacheError;

/// Longest lifetime an entry can be given (~100 years).
///
/// Larger timeouts are capped so the deadline never overflows `Instant`.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// The entry map and the clock that stamps it
///
/// Every operation takes the single map lock for its whole read-modify-write,
/// so a sweep is never observed half done.
pub(crate) struct Store<K, V, C> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    clock: C,
}

impl<K, V, C> Store<K, V, C>
where
    K: Eq + Hash,
    C: Clock,
{
    pub(crate) fn new(clock: C) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    // No operation panics while holding the guard, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set(&self, key: K, value: V, timeout: Duration) {
        let now = self.clock.now();
        let expires_at = now + timeout.min(MAX_TIMEOUT);
        self.lock().insert(key, Entry::new(value, expires_at));
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Result<V, CacheError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let now = self.clock.now();
        let mut entries = self.lock();

        match entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => Ok(entry.value().clone()),
            Some(_) => {
                entries.remove(key);
                tracing::trace!("removed expired entry on read");
                Err(CacheError::NotFound)
            }
            None => Err(CacheError::NotFound),
        }
    }

    pub(crate) fn delete<Q>(&self, key: &Q) -> Result<(), CacheError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        match self.lock().remove(key) {
            Some(entry) if !entry.is_expired_at(now) => Ok(()),
            Some(_) => {
                tracing::trace!("removed expired entry on delete");
                Err(CacheError::NotFound)
            }
            None => Err(CacheError::NotFound),
        }
    }

    pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        let mut entries = self.lock();

        match entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => true,
            Some(_) => {
                entries.remove(key);
                false
            }
            None => false,
        }
    }

    /// Removes every expired entry, returning how many were removed
    pub(crate) fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - entries.len();

        if removed > 0 {
            tracing::debug!(removed, remaining = entries.len(), "purged expired entries");
        }

        removed
    }

    pub(crate) fn clear(&self) -> usize {
        let mut entries = self.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn create_test_store() -> (Store<String, String, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (Store::new(clock.clone()), clock)
    }

    #[test]
    fn test_set_and_get() {
        let (store, _) = create_test_store();
        store.set("key1".to_string(), "value1".to_string(), Duration::from_secs(60));

        assert_eq!(store.get("key1"), Ok("value1".to_string()));
    }

    #[test]
    fn test_get_nonexistent_key() {
        let (store, _) = create_test_store();
        assert_eq!(store.get("nonexistent"), Err(CacheError::NotFound));
    }

    #[test]
    fn test_get_removes_expired_entry() {
        let (store, clock) = create_test_store();
        store.set("key1".to_string(), "value1".to_string(), Duration::from_secs(1));
        clock.advance(Duration::from_secs(2));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("key1"), Err(CacheError::NotFound));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_delete_expired_entry_is_not_found_but_removed() {
        let (store, clock) = create_test_store();
        store.set("key1".to_string(), "value1".to_string(), Duration::from_secs(1));
        clock.advance(Duration::from_secs(1));

        assert_eq!(store.delete("key1"), Err(CacheError::NotFound));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_contains_key() {
        let (store, clock) = create_test_store();
        store.set("live".to_string(), "a".to_string(), Duration::from_secs(60));
        store.set("stale".to_string(), "b".to_string(), Duration::from_secs(1));
        clock.advance(Duration::from_secs(1));

        assert!(store.contains_key("live"));
        assert!(!store.contains_key("stale"));
        assert!(!store.contains_key("missing"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_purge_expired() {
        let (store, clock) = create_test_store();
        store.set("expired1".to_string(), "v".to_string(), Duration::from_secs(1));
        store.set("expired2".to_string(), "v".to_string(), Duration::from_secs(2));
        store.set("valid".to_string(), "v".to_string(), Duration::from_secs(60));
        clock.advance(Duration::from_secs(2));

        assert_eq!(store.purge_expired(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.purge_expired(), 0);
    }

    #[test]
    fn test_clear() {
        let (store, _) = create_test_store();
        store.set("a".to_string(), "1".to_string(), Duration::from_secs(60));
        store.set("b".to_string(), "2".to_string(), Duration::from_secs(60));

        assert_eq!(store.clear(), 2);
        assert_eq!(store.len(), 0);
        assert_eq!(store.clear(), 0);
    }

    #[test]
    fn test_extreme_timeout_does_not_panic() {
        let (store, clock) = create_test_store();
        store.set("forever".to_string(), "v".to_string(), Duration::MAX);
        clock.advance(Duration::from_secs(50 * 365 * 24 * 60 * 60));

        assert_eq!(store.get("forever"), Ok("v".to_string()));
    }

    #[test]
    fn test_zero_timeout_is_immediately_expired() {
        let (store, _) = create_test_store();
        store.set("blink".to_string(), "v".to_string(), Duration::ZERO);

        assert_eq!(store.get("blink"), Err(CacheError::NotFound));
    }

    #[test]
    fn test_lock_recovers_from_poison() {
        let (store, _) = create_test_store();
        store.set("key".to_string(), "value".to_string(), Duration::from_secs(60));

        std::thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = store.lock();
                    panic!("poison the map");
                })
                .join();
        });

        assert_eq!(store.get("key"), Ok("value".to_string()));
    }
}
