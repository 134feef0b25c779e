use anyhow::{ensure, Result};
use lapse_core::{Cache, CacheConfig, CacheError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lapse_demo=info,lapse_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Cache configuration from environment variables
    let config = CacheConfig::from_env();
    tracing::info!("🧪 Lapse demo");
    tracing::info!("   Default timeout: {:?}", config.default_timeout);
    tracing::info!("   Cleanup interval: {:?}", config.effective_cleanup_interval());

    test_basic_operations(config.clone()).await?;
    test_expiration().await?;
    test_background_reaping().await?;
    test_parallel_set_get(config).await?;

    tracing::info!("✅ All checks passed!");

    Ok(())
}

/// SET/GET/DELETE on a fresh cache
async fn test_basic_operations(config: CacheConfig) -> Result<()> {
    tracing::info!("Check: Basic Operations");

    let cache = Cache::with_config(config);

    cache.set("greeting".to_string(), "hello world".to_string());
    ensure!(
        cache.get("greeting")? == "hello world",
        "Value should match"
    );

    cache.set("greeting".to_string(), "hello again".to_string());
    ensure!(
        cache.get("greeting")? == "hello again",
        "Overwrite should replace the value"
    );

    cache.delete("greeting")?;
    ensure!(
        cache.get("greeting") == Err(CacheError::NotFound),
        "Key should not be found after delete"
    );
    ensure!(
        cache.delete("greeting") == Err(CacheError::NotFound),
        "Second delete should fail"
    );

    cache.shutdown().await;
    tracing::info!("   ✓ Basic operations work correctly");
    Ok(())
}

/// Values disappear once their timeout elapses, even without the reaper
async fn test_expiration() -> Result<()> {
    tracing::info!("Check: Expiration (cleanup disabled)");

    let cache = Cache::with_config(CacheConfig::default().without_cleanup());
    cache.set_with_timeout("ephemeral", 14, Duration::from_millis(200));

    ensure!(cache.get("ephemeral")? == 14, "Value should be live");

    tokio::time::sleep(Duration::from_millis(300)).await;

    ensure!(cache.len() == 1, "Expired entry should still be held");
    ensure!(
        cache.get("ephemeral").is_err(),
        "Expired key should not be returned"
    );

    tracing::info!("   ✓ Expired values are never returned");
    Ok(())
}

/// The reaper removes expired entries without any reads
async fn test_background_reaping() -> Result<()> {
    tracing::info!("Check: Background reaping");

    let config = CacheConfig::default().with_cleanup_interval(Duration::from_millis(100));
    let cache = Cache::with_config(config);

    for i in 0..100 {
        cache.set_with_timeout(format!("short-{}", i), i, Duration::from_millis(50));
    }
    cache.set_with_timeout("long".to_string(), -1, Duration::from_secs(60));

    tokio::time::sleep(Duration::from_millis(250)).await;

    ensure!(
        cache.len() == 1,
        "Reaper should have removed 100 entries, {} remain",
        cache.len()
    );

    cache.shutdown().await;
    ensure!(!cache.is_running(), "Reaper should be stopped");

    tracing::info!("   ✓ Reaper removed expired entries");
    Ok(())
}

/// Concurrent writers and readers on distinct keys never see each other's data
async fn test_parallel_set_get(config: CacheConfig) -> Result<()> {
    let num_tasks: usize = 50;
    let ops_per_task: usize = 200;
    tracing::info!(
        "Check: Parallel SET/GET ({} tasks x {} keys)",
        num_tasks,
        ops_per_task
    );

    let cache = Cache::with_config(config);
    let errors = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..num_tasks)
        .map(|task_id| {
            let cache = cache.clone();
            let errors = Arc::clone(&errors);
            tokio::task::spawn_blocking(move || {
                for i in 0..ops_per_task {
                    let key = format!("task{}:key{}", task_id, i);
                    let value = format!("value-{}-{}", task_id, i);
                    cache.set(key.clone(), value.clone());

                    match cache.get(key.as_str()) {
                        Ok(found) if found == value => {}
                        Ok(found) => {
                            tracing::error!(
                                "Value mismatch for key {}: expected '{}', got '{}'",
                                key,
                                value,
                                found
                            );
                            errors.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(_) => {
                            tracing::error!("Key not found: {}", key);
                            errors.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await?;
    }

    let elapsed = start.elapsed();
    let total = num_tasks * ops_per_task;
    tracing::info!(
        "   {} SET+GET pairs in {:?} ({:.0} ops/sec)",
        total,
        elapsed,
        (total * 2) as f64 / elapsed.as_secs_f64()
    );

    let error_count = errors.load(Ordering::SeqCst);
    ensure!(error_count == 0, "{} errors occurred", error_count);
    ensure!(cache.len() == total, "Expected {} entries", total);

    cache.shutdown().await;
    tracing::info!("   ✓ All {} values verified correctly", total);
    Ok(())
}
