//! TTL Cleanup Task
//!
//! Background task that periodically sweeps the in-process store.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::MemoryStore;

/// Spawns a background task that periodically removes expired entries and
/// idle rate-limit logs from `store`.
///
/// Reads never return expired entries, so the sweep only bounds memory.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_cleanup_task(store: Arc<MemoryStore>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.purge_expired().await;
            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::store::KeyValueStore;

    fn store_with_clock() -> (Arc<MemoryStore>, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        (Arc::new(MemoryStore::new(shared)), clock)
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let (store, clock) = store_with_clock();
        store.set_ex("expire_soon", "value", 1).await.unwrap();
        store.set_ex("long_lived", "value", 3600).await.unwrap();

        let handle = spawn_cleanup_task(store.clone(), 1);

        clock.advance(Duration::from_secs(2));
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("long_lived").await.unwrap().as_deref(), Some("value"));

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let (store, _) = store_with_clock();

        let handle = spawn_cleanup_task(store, 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
