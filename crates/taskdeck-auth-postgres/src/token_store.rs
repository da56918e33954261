//! Refresh token and blacklist persistence.
//!
//! `refresh_tokens` holds one row per issued refresh token, located by the
//! JWT `jti` (`token_id`). `blacklisted_access_tokens` holds exact-hash
//! entries plus `*` sentinel rows written by force-logout.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use time::OffsetDateTime;
use uuid::Uuid;

use taskdeck_auth::AuthResult;
use taskdeck_auth::error::AuthError;
use taskdeck_auth::storage::{TokenStore, UserSessionCount};
use taskdeck_auth::types::{BlacklistEntry, BlacklistReason, FORCE_LOGOUT_SENTINEL, RefreshTokenRecord};

use crate::{PgPool, db_error};

type RecordTuple = (Uuid, Uuid, Uuid, OffsetDateTime, OffsetDateTime, bool);

fn record_from_tuple(row: RecordTuple) -> RefreshTokenRecord {
    RefreshTokenRecord {
        id: row.0,
        user_id: row.1,
        token_id: row.2,
        issued_at: row.3,
        expires_at: row.4,
        is_revoked: row.5,
    }
}

/// PostgreSQL-backed [`TokenStore`].
#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn create_refresh_record(&self, record: &RefreshTokenRecord) -> AuthResult<()> {
        query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_id, issued_at, expires_at, is_revoked)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.token_id)
        .bind(record.issued_at)
        .bind(record.expires_at)
        .bind(record.is_revoked)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn find_refresh_record(&self, token_id: Uuid) -> AuthResult<Option<RefreshTokenRecord>> {
        let row: Option<RecordTuple> = query_as(
            r#"
            SELECT id, user_id, token_id, issued_at, expires_at, is_revoked
            FROM refresh_tokens
            WHERE token_id = $1
            "#,
        )
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(record_from_tuple))
    }

    async fn revoke_refresh_record(&self, token_id: Uuid) -> AuthResult<()> {
        let result = query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE
            WHERE token_id = $1
            "#,
        )
        .bind(token_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::storage(format!(
                "refresh token {token_id} not found for revocation"
            )));
        }

        Ok(())
    }

    async fn count_active_refresh_tokens(&self, user_id: Uuid) -> AuthResult<u64> {
        let count: i64 = query_scalar(
            r#"
            SELECT COUNT(*)
            FROM refresh_tokens
            WHERE user_id = $1
              AND NOT is_revoked
              AND expires_at > NOW()
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(count.max(0) as u64)
    }

    async fn list_active_refresh_tokens(
        &self,
        user_id: Uuid,
    ) -> AuthResult<Vec<RefreshTokenRecord>> {
        let rows: Vec<RecordTuple> = query_as(
            r#"
            SELECT id, user_id, token_id, issued_at, expires_at, is_revoked
            FROM refresh_tokens
            WHERE user_id = $1
              AND NOT is_revoked
              AND expires_at > NOW()
            ORDER BY issued_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(record_from_tuple).collect())
    }

    async fn list_session_counts(&self) -> AuthResult<Vec<UserSessionCount>> {
        let rows: Vec<(Uuid, i64)> = query_as(
            r#"
            SELECT user_id, COUNT(*)
            FROM refresh_tokens
            WHERE NOT is_revoked
              AND expires_at > NOW()
            GROUP BY user_id
            ORDER BY COUNT(*) DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(|(user_id, active)| UserSessionCount {
                user_id,
                active: active.max(0) as u64,
            })
            .collect())
    }

    async fn blacklist_access_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
        reason: BlacklistReason,
    ) -> AuthResult<()> {
        query(
            r#"
            INSERT INTO blacklisted_access_tokens
                (id, user_id, token_hash, reason, blacklisted_at, expires_at)
            VALUES ($1, $2, $3, $4, NOW(), $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(token_hash)
        .bind(reason.as_str())
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn is_access_token_blacklisted(&self, token: &str) -> AuthResult<bool> {
        let hash = BlacklistEntry::hash_token(token);

        let exists: bool = query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM blacklisted_access_tokens
                WHERE token_hash = $1
                  AND expires_at > NOW()
            )
            "#,
        )
        .bind(&hash)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(exists)
    }

    async fn blacklist_all_for_user(
        &self,
        user_id: Uuid,
        entry_expires_at: OffsetDateTime,
    ) -> AuthResult<u64> {
        // Both writes in one transaction: a visible sentinel with live
        // refresh tokens behind it would let the user refresh straight
        // past the force-logout.
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let revoked = query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE
            WHERE user_id = $1
              AND NOT is_revoked
              AND expires_at > NOW()
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?
        .rows_affected();

        query(
            r#"
            INSERT INTO blacklisted_access_tokens
                (id, user_id, token_hash, reason, blacklisted_at, expires_at)
            VALUES ($1, $2, $3, $4, NOW(), $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(FORCE_LOGOUT_SENTINEL)
        .bind(BlacklistReason::ForceLogout.as_str())
        .bind(entry_expires_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        tracing::info!(%user_id, revoked, "force-logout recorded");
        Ok(revoked)
    }

    async fn latest_force_logout(&self, user_id: Uuid) -> AuthResult<Option<OffsetDateTime>> {
        let cutoff: Option<OffsetDateTime> = query_scalar(
            r#"
            SELECT MAX(blacklisted_at)
            FROM blacklisted_access_tokens
            WHERE user_id = $1
              AND token_hash = $2
              AND expires_at > NOW()
            "#,
        )
        .bind(user_id)
        .bind(FORCE_LOGOUT_SENTINEL)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(cutoff)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let blacklist = query(
            r#"
            DELETE FROM blacklisted_access_tokens
            WHERE expires_at <= NOW()
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?
        .rows_affected();

        let tokens = query(
            r#"
            DELETE FROM refresh_tokens
            WHERE expires_at <= NOW()
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?
        .rows_affected();

        Ok(blacklist + tokens)
    }
}
