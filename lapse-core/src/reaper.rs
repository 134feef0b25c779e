//! Background task that periodically sweeps expired entries.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::CacheError;

/// Handle to a running sweep task
///
/// The task waits one full interval before its first sweep. Each sweep runs to
/// completion synchronously, so stopping only takes effect between sweeps.
/// Dropping the handle stops the task.
pub(crate) struct Reaper {
    /// Sender to signal shutdown to the sweep task
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Reaper {
    /// Spawns the sweep task on the current Tokio runtime
    ///
    /// Returns [`CacheError::RuntimeUnavailable`] outside of a runtime.
    pub(crate) fn spawn<F>(interval: Duration, sweep: F) -> Result<Self, CacheError>
    where
        F: Fn() -> usize + Send + 'static,
    {
        let handle = Handle::try_current().map_err(|_| CacheError::RuntimeUnavailable)?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = handle.spawn(Self::run(interval, shutdown_rx, sweep));
        tracing::debug!(?interval, "reaper started");

        Ok(Self {
            shutdown_tx,
            task: Mutex::new(Some(task)),
        })
    }

    async fn run<F>(interval: Duration, mut shutdown_rx: watch::Receiver<bool>, sweep: F)
    where
        F: Fn() -> usize,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    sweep();
                }
            }
        }

        tracing::debug!("reaper stopped");
    }

    /// Signals the task to stop; safe to call any number of times
    pub(crate) fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Signals the task to stop and waits until it has exited
    pub(crate) async fn shutdown(&self) {
        self.stop();

        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(task) = task {
            if let Err(error) = task.await {
                tracing::warn!(%error, "reaper task ended abnormally");
            }
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        // Signal the sweep task to stop when the owning cache is dropped
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_reaper(interval: Duration) -> (Reaper, Arc<AtomicUsize>) {
        let sweeps = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&sweeps);
        let reaper = Reaper::spawn(interval, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            0
        })
        .unwrap();
        (reaper, sweeps)
    }

    #[test]
    fn test_spawn_outside_runtime_fails() {
        let result = Reaper::spawn(Duration::from_secs(1), || 0);
        assert!(matches!(result, Err(CacheError::RuntimeUnavailable)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_sweep_waits_one_interval() {
        let (_reaper, sweeps) = counting_reaper(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(sweeps.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(sweeps.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(sweeps.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_sweeps() {
        let (reaper, sweeps) = counting_reaper(Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(sweeps.load(Ordering::SeqCst), 2);

        reaper.shutdown().await;
        assert!(!reaper.is_running());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sweeps.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stop_and_shutdown_are_idempotent() {
        let (reaper, _) = counting_reaper(Duration::from_secs(60));
        assert!(reaper.is_running());

        reaper.stop();
        reaper.stop();
        reaper.shutdown().await;
        reaper.shutdown().await;
        reaper.stop();

        assert!(!reaper.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_task() {
        let sweeps = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&sweeps);
        let reaper = Reaper::spawn(Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            0
        })
        .unwrap();

        drop(reaper);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(sweeps.load(Ordering::SeqCst), 0);
        // The task dropped its closure when it exited
        assert_eq!(Arc::strong_count(&sweeps), 1);
    }
}
