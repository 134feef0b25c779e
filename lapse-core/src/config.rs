use std::time::Duration;

/// Default lifetime of an entry when `set` is called without a timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default interval between background sweeps
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for a [`Cache`](crate::Cache) and its background reaper
///
/// # Example
///
/// ```rust
/// use lapse_core::CacheConfig;
/// use std::time::Duration;
///
/// let config = CacheConfig::default()
///     .with_default_timeout(Duration::from_secs(300))
///     .with_cleanup_interval(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime applied by `set` (default: 60 seconds)
    pub default_timeout: Duration,
    /// Interval between reaper sweeps, `None` disables the reaper (default: 60 seconds)
    pub cleanup_interval: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
            cleanup_interval: Some(DEFAULT_CLEANUP_INTERVAL),
        }
    }
}

impl CacheConfig {
    /// Creates a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the lifetime used by [`Cache::set`](crate::Cache::set)
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets the cleanup interval
    ///
    /// This determines how often the background reaper removes expired entries.
    /// A zero interval disables the reaper, same as [`without_cleanup`](Self::without_cleanup).
    ///
    /// # Example
    ///
    /// ```rust
    /// use lapse_core::CacheConfig;
    /// use std::time::Duration;
    ///
    /// // Sweep every 30 seconds
    /// let config = CacheConfig::default()
    ///     .with_cleanup_interval(Duration::from_secs(30));
    /// assert!(config.cleanup_enabled());
    /// ```
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Disables the background reaper
    ///
    /// Expired entries are then only removed when a read or delete observes them,
    /// or when [`Cache::purge_expired`](crate::Cache::purge_expired) is called.
    pub fn without_cleanup(mut self) -> Self {
        self.cleanup_interval = None;
        self
    }

    /// Returns the effective sweep interval, `None` when the reaper is disabled
    pub fn effective_cleanup_interval(&self) -> Option<Duration> {
        self.cleanup_interval.filter(|interval| !interval.is_zero())
    }

    /// Returns `true` if a background reaper will be started
    pub fn cleanup_enabled(&self) -> bool {
        self.effective_cleanup_interval().is_some()
    }

    /// Create a configuration from environment variables.
    ///
    /// Reads:
    /// - `LAPSE_DEFAULT_TIMEOUT` - entry lifetime in seconds (defaults to 60)
    /// - `LAPSE_CLEANUP_INTERVAL` - sweep interval in seconds, `0` disables (defaults to 60)
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let seconds = |name: &str| -> Option<u64> {
            let raw = lookup(name)?;
            match raw.trim().parse() {
                Ok(secs) => Some(secs),
                Err(_) => {
                    tracing::warn!(variable = name, value = %raw, "ignoring unparsable setting");
                    None
                }
            }
        };

        let default_timeout = seconds("LAPSE_DEFAULT_TIMEOUT")
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        let cleanup_interval = match seconds("LAPSE_CLEANUP_INTERVAL") {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(DEFAULT_CLEANUP_INTERVAL),
        };

        Self {
            default_timeout,
            cleanup_interval,
        }
    }
}
