//! Storage traits for the auth core.
//!
//! The core is storage-agnostic: it talks to a persisted token store, a
//! user-record store owned by the surrounding CRUD layer, and an
//! access-grant store, all behind async traits. A PostgreSQL backend lives
//! in the `taskdeck-auth-postgres` crate; [`memory`] provides an in-process
//! backend for tests and local development.
//!
//! # Failure semantics
//!
//! Every method surfaces storage failures as `AuthError::Storage`. The
//! request pipeline treats those as "fail closed" (anonymous context);
//! mutation paths propagate them to the caller so a failed revoke is never
//! silent.

pub mod memory;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::{BlacklistReason, PermissionLevel, ProjectRole, RefreshTokenRecord, User};

pub use memory::{MemoryAccessStore, MemoryTokenStore, MemoryUserStore};

// =============================================================================
// Token Store
// =============================================================================

/// Number of active sessions a user holds, for the admin session UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSessionCount {
    /// The user.
    pub user_id: Uuid,
    /// Count of active (non-revoked, non-expired) refresh tokens.
    pub active: u64,
}

/// Durable record of refresh-token issuance/revocation and access-token
/// blacklisting.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Stores a new refresh token record.
    ///
    /// Concurrent creates for the same user may transiently exceed the
    /// session limit; that is an accepted gap, corrected on the next
    /// count read by the limiter.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored (duplicate
    /// `token_id`, storage unavailable).
    async fn create_refresh_record(&self, record: &RefreshTokenRecord) -> AuthResult<()>;

    /// Finds a refresh token record by its `token_id` (the JWT `jti`).
    ///
    /// Returns the record regardless of revocation/expiry; callers check
    /// `is_active()` before trusting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_refresh_record(&self, token_id: Uuid) -> AuthResult<Option<RefreshTokenRecord>>;

    /// Marks a specific refresh token revoked (logout, rotation).
    ///
    /// # Errors
    ///
    /// Returns an error if no record with that `token_id` exists or the
    /// operation fails. A failed revoke must reach the caller.
    async fn revoke_refresh_record(&self, token_id: Uuid) -> AuthResult<()>;

    /// Counts active (non-revoked, non-expired) refresh tokens for a user.
    ///
    /// This count is the user's live session count.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn count_active_refresh_tokens(&self, user_id: Uuid) -> AuthResult<u64>;

    /// Lists a user's active refresh token records, oldest first.
    ///
    /// Drives session eviction and the admin session UI.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_active_refresh_tokens(&self, user_id: Uuid)
    -> AuthResult<Vec<RefreshTokenRecord>>;

    /// Active session counts for every user that holds at least one
    /// active refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_session_counts(&self) -> AuthResult<Vec<UserSessionCount>>;

    /// Blacklists one access token by hash.
    ///
    /// `token_hash` is the SHA-256 hex hash of the raw token; the raw
    /// token is never stored. `expires_at` is the token's own expiry, so
    /// the entry can be cleaned up once the token would have died anyway.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn blacklist_access_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
        reason: BlacklistReason,
    ) -> AuthResult<()>;

    /// Checks whether a raw access token is blacklisted.
    ///
    /// Hash-and-lookup against non-expired exact entries only; sentinel
    /// entries are consulted separately via
    /// [`TokenStore::latest_force_logout`].
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn is_access_token_blacklisted(&self, token: &str) -> AuthResult<bool>;

    /// Force-logout: revokes every active refresh token the user holds and
    /// writes one force-logout sentinel entry timestamped now.
    ///
    /// Both halves are required - revoking only refresh tokens leaves
    /// issued access tokens valid for their remaining TTL, and a sentinel
    /// alone would let the user immediately mint a new access token via
    /// refresh. Implementations backed by transactional storage must make
    /// this one atomic operation. Idempotent: a second call revokes
    /// nothing further and writes a later, redundant sentinel.
    ///
    /// `entry_expires_at` bounds the sentinel's useful life (now plus the
    /// access-token TTL: no token issued before now lives longer).
    ///
    /// # Returns
    ///
    /// The number of sessions (refresh tokens) invalidated.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails; the caller must
    /// learn that a force-logout did not take effect.
    async fn blacklist_all_for_user(
        &self,
        user_id: Uuid,
        entry_expires_at: OffsetDateTime,
    ) -> AuthResult<u64>;

    /// Timestamp of the user's most recent non-expired force-logout
    /// sentinel, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn latest_force_logout(&self, user_id: Uuid) -> AuthResult<Option<OffsetDateTime>>;

    /// Returns `true` if an access token issued at `issued_at` predates
    /// the user's most recent force-logout.
    ///
    /// This is how "all access tokens issued before time T are invalid"
    /// works without storing every access token: the token's own `iat`
    /// claim is compared against the sentinel's timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn was_issued_before_force_logout(
        &self,
        user_id: Uuid,
        issued_at: OffsetDateTime,
    ) -> AuthResult<bool> {
        Ok(self.latest_force_logout(user_id).await?.is_some_and(|cutoff| {
            // iat claims are whole seconds; compare against a whole-second
            // cutoff so a token minted in the same second as the
            // force-logout is not spuriously rejected.
            let cutoff = cutoff.replace_nanosecond(0).unwrap_or(cutoff);
            issued_at < cutoff
        }))
    }

    /// Deletes expired blacklist entries and expired refresh records.
    ///
    /// Runs from the periodic cleanup task, never from the request path.
    ///
    /// # Returns
    ///
    /// The number of rows deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}

// =============================================================================
// User Store
// =============================================================================

/// User lookup interface owned by the surrounding CRUD layer.
///
/// Auth consumes the minimal projection in [`User`] and never defines the
/// user schema. Reads only, except for registration.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Finds a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>>;

    /// Finds a user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Inserts a new user (registration).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Conflict` if the email is already taken.
    async fn create(&self, user: &User) -> AuthResult<()>;
}

// =============================================================================
// Access Store
// =============================================================================

/// Per-resource grants, ownership, and project membership, owned by the
/// surrounding CRUD layer and consumed by the authorization checks.
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Explicit permission grant for a user on one resource, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn permission_level(
        &self,
        user_id: Uuid,
        resource_type: &str,
        resource_id: Uuid,
    ) -> AuthResult<Option<PermissionLevel>>;

    /// Owner of a resource, if the resource exists and has one.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn resource_owner(
        &self,
        resource_type: &str,
        resource_id: Uuid,
    ) -> AuthResult<Option<Uuid>>;

    /// The user's role within a project, if they are a member.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn project_role(&self, user_id: Uuid, project_id: Uuid)
    -> AuthResult<Option<ProjectRole>>;
}
