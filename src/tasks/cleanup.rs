//! Cleanup Task
//!
//! Background task that periodically drops expired cache entries and
//! closed rate-limit windows.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::middleware::{RateLimiters, ResponseCache};

/// Spawns a background task that periodically reclaims expired state.
///
/// Reads never return expired entries on their own, so this task only
/// bounds memory; correctness does not depend on it.
///
/// # Arguments
/// * `cache` - Response cache to purge
/// * `limiters` - Rate limiters whose stale client windows are dropped
/// * `cleanup_interval_secs` - Interval in seconds between cleanup runs
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_cleanup_task(
    cache: ResponseCache,
    limiters: RateLimiters,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let expired = cache.purge_expired().await;
            let mut windows = 0;
            for limiter in limiters.all() {
                windows += limiter.purge_expired().await;
            }

            if expired > 0 || windows > 0 {
                info!(
                    expired_responses = expired,
                    closed_windows = windows,
                    "Cleanup removed stale entries"
                );
            } else {
                debug!("Cleanup: nothing to remove");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::CachedResponse;
    use axum::body::Bytes;

    fn cached() -> CachedResponse {
        CachedResponse {
            status: 200,
            content_type: None,
            body: Bytes::from_static(b"{}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_removes_expired_entries() {
        let cache = ResponseCache::new(Duration::from_secs(1));
        cache.put("GET:/expire-soon".into(), cached()).await;

        let handle = spawn_cleanup_task(cache.clone(), RateLimiters::standard(), 2);

        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(cache.len().await, 0, "Expired entry should have been purged");
        assert_eq!(cache.stats().await.expirations, 1);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_preserves_valid_entries() {
        let cache = ResponseCache::new(Duration::from_secs(3600));
        cache.put("GET:/long-lived".into(), cached()).await;

        let handle = spawn_cleanup_task(cache.clone(), RateLimiters::standard(), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(cache.get("GET:/long-lived").await.is_some());

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_drops_closed_windows() {
        let limiters = RateLimiters::standard();
        limiters.general.hit("203.0.113.9").await.unwrap();

        let handle = spawn_cleanup_task(
            ResponseCache::new(Duration::from_secs(60)),
            limiters.clone(),
            60,
        );

        tokio::time::sleep(Duration::from_secs(16 * 60)).await;
        assert_eq!(limiters.general.tracked_clients().await, 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let handle = spawn_cleanup_task(
            ResponseCache::new(Duration::from_secs(60)),
            RateLimiters::standard(),
            1,
        );

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
