//! In-memory storage backends.
//!
//! Used by tests and local development. Not suitable for a horizontally
//! scaled deployment: blacklist and session state must be shared across
//! instances, which is what the PostgreSQL backend is for.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::types::{
    BlacklistEntry, BlacklistReason, FORCE_LOGOUT_SENTINEL, PermissionLevel, ProjectRole,
    RefreshTokenRecord, User,
};

use super::{AccessStore, TokenStore, UserSessionCount, UserStore};

// A poisoned lock only means another writer panicked mid-update; the data
// itself is still coherent for these map shapes, so recover it.
fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Token Store
// =============================================================================

/// In-memory [`TokenStore`].
#[derive(Default)]
pub struct MemoryTokenStore {
    refresh: RwLock<HashMap<Uuid, RefreshTokenRecord>>,
    blacklist: RwLock<Vec<BlacklistEntry>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a raw blacklist entry. Test/seed helper.
    pub fn insert_blacklist_entry(&self, entry: BlacklistEntry) {
        write(&self.blacklist).push(entry);
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn create_refresh_record(&self, record: &RefreshTokenRecord) -> AuthResult<()> {
        let mut refresh = write(&self.refresh);
        if refresh.contains_key(&record.token_id) {
            return Err(AuthError::storage(format!(
                "duplicate refresh token id {}",
                record.token_id
            )));
        }
        refresh.insert(record.token_id, record.clone());
        Ok(())
    }

    async fn find_refresh_record(&self, token_id: Uuid) -> AuthResult<Option<RefreshTokenRecord>> {
        Ok(read(&self.refresh).get(&token_id).cloned())
    }

    async fn revoke_refresh_record(&self, token_id: Uuid) -> AuthResult<()> {
        match write(&self.refresh).get_mut(&token_id) {
            Some(record) => {
                record.is_revoked = true;
                Ok(())
            }
            None => Err(AuthError::storage(format!(
                "refresh token {token_id} not found"
            ))),
        }
    }

    async fn count_active_refresh_tokens(&self, user_id: Uuid) -> AuthResult<u64> {
        Ok(read(&self.refresh)
            .values()
            .filter(|r| r.user_id == user_id && r.is_active())
            .count() as u64)
    }

    async fn list_active_refresh_tokens(
        &self,
        user_id: Uuid,
    ) -> AuthResult<Vec<RefreshTokenRecord>> {
        let mut records: Vec<RefreshTokenRecord> = read(&self.refresh)
            .values()
            .filter(|r| r.user_id == user_id && r.is_active())
            .cloned()
            .collect();
        records.sort_by_key(|r| r.issued_at);
        Ok(records)
    }

    async fn list_session_counts(&self) -> AuthResult<Vec<UserSessionCount>> {
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for record in read(&self.refresh).values().filter(|r| r.is_active()) {
            *counts.entry(record.user_id).or_default() += 1;
        }
        let mut result: Vec<UserSessionCount> = counts
            .into_iter()
            .map(|(user_id, active)| UserSessionCount { user_id, active })
            .collect();
        result.sort_by(|a, b| b.active.cmp(&a.active));
        Ok(result)
    }

    async fn blacklist_access_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
        reason: BlacklistReason,
    ) -> AuthResult<()> {
        write(&self.blacklist).push(BlacklistEntry {
            id: Uuid::new_v4(),
            user_id,
            token_hash: token_hash.to_string(),
            reason,
            blacklisted_at: OffsetDateTime::now_utc(),
            expires_at,
        });
        Ok(())
    }

    async fn is_access_token_blacklisted(&self, token: &str) -> AuthResult<bool> {
        let hash = BlacklistEntry::hash_token(token);
        Ok(read(&self.blacklist)
            .iter()
            .any(|e| !e.is_expired() && e.token_hash == hash))
    }

    async fn blacklist_all_for_user(
        &self,
        user_id: Uuid,
        entry_expires_at: OffsetDateTime,
    ) -> AuthResult<u64> {
        // Both halves under one write lock: revoke every live session,
        // then record the cutoff for already-issued access tokens.
        let mut refresh = write(&self.refresh);
        let mut revoked = 0u64;
        for record in refresh.values_mut() {
            if record.user_id == user_id && record.is_active() {
                record.is_revoked = true;
                revoked += 1;
            }
        }
        drop(refresh);

        write(&self.blacklist).push(BlacklistEntry {
            id: Uuid::new_v4(),
            user_id,
            token_hash: FORCE_LOGOUT_SENTINEL.to_string(),
            reason: BlacklistReason::ForceLogout,
            blacklisted_at: OffsetDateTime::now_utc(),
            expires_at: entry_expires_at,
        });
        Ok(revoked)
    }

    async fn latest_force_logout(&self, user_id: Uuid) -> AuthResult<Option<OffsetDateTime>> {
        Ok(read(&self.blacklist)
            .iter()
            .filter(|e| {
                e.user_id == user_id
                    && e.reason == BlacklistReason::ForceLogout
                    && e.is_sentinel()
                    && !e.is_expired()
            })
            .map(|e| e.blacklisted_at)
            .max())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let mut deleted = 0u64;

        let mut blacklist = write(&self.blacklist);
        let before = blacklist.len();
        blacklist.retain(|e| !e.is_expired());
        deleted += (before - blacklist.len()) as u64;
        drop(blacklist);

        let mut refresh = write(&self.refresh);
        let before = refresh.len();
        refresh.retain(|_, r| !r.is_expired());
        deleted += (before - refresh.len()) as u64;

        Ok(deleted)
    }
}

// =============================================================================
// User Store
// =============================================================================

/// In-memory [`UserStore`].
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a user. Test/seed helper.
    pub fn remove(&self, id: Uuid) {
        write(&self.users).remove(&id);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        Ok(read(&self.users).get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(read(&self.users)
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        let mut users = write(&self.users);
        if users.values().any(|u| u.email == user.email) {
            return Err(AuthError::conflict(format!(
                "email {} is already registered",
                user.email
            )));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }
}

// =============================================================================
// Access Store
// =============================================================================

/// In-memory [`AccessStore`].
#[derive(Default)]
pub struct MemoryAccessStore {
    grants: RwLock<HashMap<(Uuid, String, Uuid), PermissionLevel>>,
    owners: RwLock<HashMap<(String, Uuid), Uuid>>,
    members: RwLock<HashMap<(Uuid, Uuid), ProjectRole>>,
}

impl MemoryAccessStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an explicit grant. Test/seed helper.
    pub fn grant(
        &self,
        user_id: Uuid,
        resource_type: &str,
        resource_id: Uuid,
        level: PermissionLevel,
    ) {
        write(&self.grants).insert((user_id, resource_type.to_string(), resource_id), level);
    }

    /// Records resource ownership. Test/seed helper.
    pub fn set_owner(&self, resource_type: &str, resource_id: Uuid, owner: Uuid) {
        write(&self.owners).insert((resource_type.to_string(), resource_id), owner);
    }

    /// Records project membership. Test/seed helper.
    pub fn add_member(&self, project_id: Uuid, user_id: Uuid, role: ProjectRole) {
        write(&self.members).insert((project_id, user_id), role);
    }
}

#[async_trait]
impl AccessStore for MemoryAccessStore {
    async fn permission_level(
        &self,
        user_id: Uuid,
        resource_type: &str,
        resource_id: Uuid,
    ) -> AuthResult<Option<PermissionLevel>> {
        Ok(read(&self.grants)
            .get(&(user_id, resource_type.to_string(), resource_id))
            .copied())
    }

    async fn resource_owner(
        &self,
        resource_type: &str,
        resource_id: Uuid,
    ) -> AuthResult<Option<Uuid>> {
        Ok(read(&self.owners)
            .get(&(resource_type.to_string(), resource_id))
            .copied())
    }

    async fn project_role(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> AuthResult<Option<ProjectRole>> {
        Ok(read(&self.members).get(&(project_id, user_id)).copied())
    }
}

// =============================================================================
// Tests
// =============================================================================
