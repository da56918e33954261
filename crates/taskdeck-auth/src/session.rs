//! Concurrent-session limiting.
//!
//! A session is one active refresh token; the limiter caps how many a
//! user may hold. Overflow policy is evict-oldest: issuing a new session
//! at the limit revokes the user's oldest refresh token instead of
//! rejecting the login, so the count never exceeds the configured maximum
//! and the newest device always wins.
//!
//! Two logins racing can both pass the count check before either insert
//! commits; the resulting transient over-limit is corrected on the next
//! `make_room` call.

use std::sync::Arc;

use uuid::Uuid;

use crate::AuthResult;
use crate::storage::TokenStore;

/// A user's session usage, for the admin force-logout UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUsage {
    /// The user.
    pub user_id: Uuid,
    /// Active session count.
    pub active: u64,
    /// Configured maximum.
    pub max: u64,
    /// Whether the user is at (or transiently above) the limit.
    pub at_limit: bool,
}

/// Enforces the per-user concurrent session cap.
#[derive(Clone)]
pub struct SessionLimiter {
    store: Arc<dyn TokenStore>,
    max_sessions: u64,
}

impl SessionLimiter {
    /// Creates a limiter over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>, max_sessions: u32) -> Self {
        Self {
            store,
            max_sessions: u64::from(max_sessions),
        }
    }

    /// Configured per-user maximum.
    #[must_use]
    pub fn max_sessions(&self) -> u64 {
        self.max_sessions
    }

    /// Returns `true` if the user holds at least the maximum number of
    /// active sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the session count cannot be read.
    pub async fn is_at_limit(&self, user_id: Uuid) -> AuthResult<bool> {
        let active = self.store.count_active_refresh_tokens(user_id).await?;
        Ok(active >= self.max_sessions)
    }

    /// Makes room for one new session, revoking the oldest active refresh
    /// tokens if the user is at the limit.
    ///
    /// After this call (absent concurrent logins) the user holds at most
    /// `max_sessions - 1` active sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if listing or revocation fails; the caller must
    /// not issue the new session in that case.
    pub async fn make_room(&self, user_id: Uuid) -> AuthResult<()> {
        let active = self.store.list_active_refresh_tokens(user_id).await?;
        let count = active.len() as u64;
        if count < self.max_sessions {
            return Ok(());
        }

        // Evict enough of the oldest sessions that the new one fits.
        let excess = (count - self.max_sessions + 1) as usize;
        for record in active.into_iter().take(excess) {
            tracing::info!(
                user_id = %user_id,
                token_id = %record.token_id,
                "evicting oldest session at limit"
            );
            self.store.revoke_refresh_record(record.token_id).await?;
        }
        Ok(())
    }

    /// Session usage for every user holding at least one active session,
    /// most-loaded first. Pure aggregation, no side effects.
    ///
    /// # Errors
    ///
    /// Returns an error if the counts cannot be read.
    pub async fn usage_report(&self) -> AuthResult<Vec<SessionUsage>> {
        let counts = self.store.list_session_counts().await?;
        Ok(counts
            .into_iter()
            .map(|c| SessionUsage {
                user_id: c.user_id,
                active: c.active,
                max: self.max_sessions,
                at_limit: c.active >= self.max_sessions,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTokenStore;
    use crate::types::RefreshTokenRecord;
    use time::{Duration, OffsetDateTime};

    async fn seed_sessions(store: &MemoryTokenStore, user: Uuid, n: usize) -> Vec<Uuid> {
        let now = OffsetDateTime::now_utc();
        let mut ids = Vec::new();
        for i in 0..n {
            // Stagger issuance so "oldest" is well-defined.
            let record = RefreshTokenRecord::new(
                user,
                Uuid::new_v4(),
                now - Duration::minutes((n - i) as i64),
                now + Duration::days(7),
            );
            ids.push(record.token_id);
            store.create_refresh_record(&record).await.unwrap();
        }
        ids
    }

    #[tokio::test]
    async fn test_under_limit_is_noop() {
        let store = Arc::new(MemoryTokenStore::new());
        let limiter = SessionLimiter::new(store.clone(), 5);
        let user = Uuid::new_v4();
        seed_sessions(&store, user, 3).await;

        assert!(!limiter.is_at_limit(user).await.unwrap());
        limiter.make_room(user).await.unwrap();
        assert_eq!(store.count_active_refresh_tokens(user).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_evicts_oldest_at_limit() {
        let store = Arc::new(MemoryTokenStore::new());
        let limiter = SessionLimiter::new(store.clone(), 5);
        let user = Uuid::new_v4();
        let ids = seed_sessions(&store, user, 5).await;

        assert!(limiter.is_at_limit(user).await.unwrap());
        limiter.make_room(user).await.unwrap();

        assert_eq!(store.count_active_refresh_tokens(user).await.unwrap(), 4);
        // The oldest session is the one that was evicted.
        let oldest = store.find_refresh_record(ids[0]).await.unwrap().unwrap();
        assert!(oldest.is_revoked);
        let newest = store.find_refresh_record(ids[4]).await.unwrap().unwrap();
        assert!(!newest.is_revoked);
    }

    #[tokio::test]
    async fn test_recovers_from_transient_over_limit() {
        let store = Arc::new(MemoryTokenStore::new());
        let limiter = SessionLimiter::new(store.clone(), 3);
        let user = Uuid::new_v4();
        // Simulates two racing logins having both passed the check.
        seed_sessions(&store, user, 5).await;

        limiter.make_room(user).await.unwrap();
        assert_eq!(store.count_active_refresh_tokens(user).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_usage_report_flags_at_limit() {
        let store = Arc::new(MemoryTokenStore::new());
        let limiter = SessionLimiter::new(store.clone(), 3);
        let busy = Uuid::new_v4();
        let quiet = Uuid::new_v4();
        seed_sessions(&store, busy, 3).await;
        seed_sessions(&store, quiet, 1).await;

        let report = limiter.usage_report().await.unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].user_id, busy);
        assert!(report[0].at_limit);
        assert_eq!(report[0].max, 3);
        assert!(!report[1].at_limit);
    }
}
