//! Periodic expiry cleanup.
//!
//! Deletes blacklist entries and refresh records past their expiry.
//! Runs on its own interval, independent of request serving: the
//! pipeline's blacklist lookup is a plain indexed read and never waits on
//! this task.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::storage::TokenStore;

/// Spawns the background cleanup loop.
///
/// The first sweep runs one full `period` after spawn. Errors are logged
/// and the loop keeps running; a transiently unavailable store should not
/// kill the task.
pub fn spawn_cleanup_task(store: Arc<dyn TokenStore>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it.
        interval.tick().await;

        loop {
            interval.tick().await;
            match store.cleanup_expired().await {
                Ok(deleted) => {
                    tracing::info!(deleted, "expired token records cleaned up");
                }
                Err(err) => {
                    tracing::error!(error = %err, "token cleanup sweep failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTokenStore;
    use crate::types::{BlacklistEntry, BlacklistReason};
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_cleanup_task_sweeps() {
        let store = Arc::new(MemoryTokenStore::new());
        let now = OffsetDateTime::now_utc();
        store.insert_blacklist_entry(BlacklistEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: BlacklistEntry::hash_token("stale"),
            reason: BlacklistReason::ManualLogout,
            blacklisted_at: now - time::Duration::hours(2),
            expires_at: now - time::Duration::hours(1),
        });

        let handle = spawn_cleanup_task(store.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.abort();

        assert_eq!(store.cleanup_expired().await.unwrap(), 0);
    }
}
