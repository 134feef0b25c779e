use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::reaper::Reaper;
use crate::store::Store;

/// Internal shared state for the cache
struct CacheInner<K, V, C> {
    store: Arc<Store<K, V, C>>,
    /// `None` when cleanup is disabled
    reaper: Option<Reaper>,
    config: CacheConfig,
}

/// Thread-safe in-memory key-value cache where every entry expires
///
/// All operations share one lock over the entry map. Expired entries are never
/// returned: reads treat them as absent and remove them on the spot, and a
/// background reaper sweeps the rest every `cleanup_interval`.
///
/// The reaper is a Tokio task owned by the cache. It starts on construction when
/// cleanup is enabled and stops on [`stop`](Cache::stop), on
/// [`shutdown`](Cache::shutdown), or when the last clone of the cache is dropped.
///
/// # Example
///
/// ```rust,no_run
/// use lapse_core::{Cache, CacheConfig};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let config = CacheConfig::default()
///         .with_cleanup_interval(Duration::from_secs(30));
///     let cache = Cache::with_config(config);
///
///     cache.set("user:123", "John Doe".to_string());
///     cache.set_with_timeout("otp:123", "481516".to_string(), Duration::from_secs(5));
///
///     assert_eq!(cache.get("user:123").as_deref(), Ok("John Doe"));
///
///     cache.shutdown().await;
/// }
/// ```
pub struct Cache<K, V, C = SystemClock> {
    inner: Arc<CacheInner<K, V, C>>,
}

impl<K, V, C> Clone for Cache<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Send + 'static,
{
    /// Creates a new cache with default configuration
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context. The default
    /// configuration enables the reaper, which needs a runtime to spawn on.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a new cache with custom configuration
    ///
    /// # Panics
    ///
    /// Panics if cleanup is enabled and no Tokio runtime is current. Use
    /// [`try_with_config`](Self::try_with_config) to get an error instead.
    pub fn with_config(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    /// Creates a new cache with custom configuration
    ///
    /// Returns [`CacheError::RuntimeUnavailable`] if cleanup is enabled and no
    /// Tokio runtime is current.
    pub fn try_with_config(config: CacheConfig) -> Result<Self, CacheError> {
        Self::try_with_clock(config, SystemClock)
    }
}

impl<K, V, C> Cache<K, V, C>
where
    K: Eq + Hash + Send + 'static,
    V: Send + 'static,
    C: Clock,
{
    /// Creates a new cache that reads time from `clock`
    ///
    /// # Panics
    ///
    /// Panics if cleanup is enabled and no Tokio runtime is current.
    pub fn with_clock(config: CacheConfig, clock: C) -> Self {
        match Self::try_with_clock(config, clock) {
            Ok(cache) => cache,
            Err(_) => panic!(
                "lapse_core::Cache with cleanup enabled requires a Tokio runtime. \
                 Construct it from within a #[tokio::main] or #[tokio::test] context, \
                 or disable cleanup with CacheConfig::without_cleanup()."
            ),
        }
    }

    /// Creates a new cache that reads time from `clock`
    ///
    /// Returns [`CacheError::RuntimeUnavailable`] if cleanup is enabled and no
    /// Tokio runtime is current.
    pub fn try_with_clock(config: CacheConfig, clock: C) -> Result<Self, CacheError> {
        let store = Arc::new(Store::new(clock));

        let reaper = match config.effective_cleanup_interval() {
            Some(interval) => {
                let sweep_store = Arc::clone(&store);
                Some(Reaper::spawn(interval, move || sweep_store.purge_expired())?)
            }
            None => None,
        };

        Ok(Self {
            inner: Arc::new(CacheInner {
                store,
                reaper,
                config,
            }),
        })
    }

    /// Stores a value under `key` for the configured default timeout
    ///
    /// If the key already exists, both the value and the deadline are replaced.
    pub fn set(&self, key: K, value: V) {
        self.set_with_timeout(key, value, self.inner.config.default_timeout);
    }

    /// Stores a value under `key` that expires after `timeout`
    ///
    /// If the key already exists, both the value and the deadline are replaced.
    /// Timeouts beyond [`MAX_TIMEOUT`](crate::MAX_TIMEOUT) are capped.
    pub fn set_with_timeout(&self, key: K, value: V, timeout: Duration) {
        self.inner.store.set(key, value, timeout);
    }

    /// Retrieves a copy of the value stored under `key`
    ///
    /// Returns [`CacheError::NotFound`] if the key was never set, was deleted, or
    /// has reached its deadline. Expired entries are removed.
    pub fn get<Q>(&self, key: &Q) -> Result<V, CacheError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.inner.store.get(key)
    }

    /// Removes the entry stored under `key`
    ///
    /// Returns [`CacheError::NotFound`] if there is no live entry. An expired
    /// entry is removed all the same.
    pub fn delete<Q>(&self, key: &Q) -> Result<(), CacheError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.store.delete(key)
    }

    /// Checks if a key exists and is not expired.
    ///
    /// Expired entries are lazily removed when checked.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.store.contains_key(key)
    }

    /// Returns the number of entries held (including expired ones not yet removed)
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    /// Returns `true` if no entries are held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all expired entries now
    ///
    /// Returns the number of entries removed. The reaper runs the same sweep.
    pub fn purge_expired(&self) -> usize {
        self.inner.store.purge_expired()
    }

    /// Removes every entry, expired or not
    ///
    /// Returns the number of entries that were removed.
    pub fn clear(&self) -> usize {
        self.inner.store.clear()
    }

    /// Returns the configuration this cache was built with
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Returns `true` while the background reaper task is alive
    pub fn is_running(&self) -> bool {
        self.inner
            .reaper
            .as_ref()
            .is_some_and(Reaper::is_running)
    }

    /// Signals the background reaper to stop
    ///
    /// A sweep already in progress finishes first. Safe to call repeatedly, after
    /// [`shutdown`](Self::shutdown), or when cleanup was never enabled. The cache
    /// keeps working afterwards, relying on expiration checks during reads.
    pub fn stop(&self) {
        if let Some(reaper) = &self.inner.reaper {
            reaper.stop();
        }
    }

    /// Stops the background reaper and waits for its task to exit
    pub async fn shutdown(&self) {
        if let Some(reaper) = &self.inner.reaper {
            reaper.shutdown().await;
        }
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> std::fmt::Debug for Cache<K, V, C>
where
    K: Eq + Hash,
    C: Clock,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("len", &self.inner.store.len())
            .field("config", &self.inner.config)
            .field("reaper", &self.inner.reaper.is_some())
            .finish()
    }
}
