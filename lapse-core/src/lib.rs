//! # Lapse Core
//!
//! An in-process key-value cache where every entry expires.
//!
//! ## Features
//!
//! - Thread-safe storage behind a single lock
//! - Expired entries are never returned (checked on every read)
//! - Background reaper task per cache instance, stoppable at any time
//! - Injectable clock for deterministic tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use lapse_core::{Cache, CacheConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Create cache with default config (60 second timeout and cleanup interval)
//!     let cache: Cache<String, String> = Cache::new();
//!
//!     // Or with custom cleanup interval
//!     let config = CacheConfig::default()
//!         .with_cleanup_interval(Duration::from_secs(30));
//!     let cache = Cache::with_config(config);
//!
//!     // Store a value with a 10 second timeout
//!     cache.set_with_timeout("user:123", "John Doe", Duration::from_secs(10));
//!
//!     // Retrieve the value
//!     if let Ok(value) = cache.get("user:123") {
//!         println!("User: {}", value);
//!     }
//!
//!     // Delete a key
//!     cache.delete("user:123").ok();
//!
//!     // Manual sweep (also done automatically by the reaper)
//!     let removed_count = cache.purge_expired();
//!
//!     // Stop the reaper and wait for it to exit
//!     cache.shutdown().await;
//! }
//! ```

mod cache;
mod clock;
mod config;
mod entry;
mod error;
mod reaper;
mod store;

pub use cache::Cache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, DEFAULT_CLEANUP_INTERVAL, DEFAULT_TIMEOUT};
pub use error::CacheError;
pub use store::MAX_TIMEOUT;
