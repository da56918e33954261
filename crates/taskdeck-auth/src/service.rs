//! Auth service: the operation set behind the API's auth mutations.
//!
//! Login, registration, refresh rotation, logout, and administrative
//! force-logout. Unlike the request pipeline, these operations surface
//! failures to the caller: a failed revoke or blacklist write must never
//! pass silently.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::password::{hash_password, verify_password};
use crate::pipeline::RequestContext;
use crate::session::{SessionLimiter, SessionUsage};
use crate::storage::{TokenStore, UserStore};
use crate::token::TokenCodec;
use crate::types::{BlacklistEntry, BlacklistReason, RefreshTokenRecord, Role, User};

/// Token pair handed to a client on login, registration, or refresh.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    /// Signed access token.
    pub access_token: String,
    /// Signed refresh token; its record is already persisted.
    pub refresh_token: String,
    /// The authenticated user.
    pub user: User,
}

/// Session and token lifecycle operations.
pub struct AuthService {
    codec: Arc<TokenCodec>,
    store: Arc<dyn TokenStore>,
    users: Arc<dyn UserStore>,
    limiter: SessionLimiter,
}

impl AuthService {
    /// Creates a service over the given codec and stores.
    #[must_use]
    pub fn new(
        codec: Arc<TokenCodec>,
        store: Arc<dyn TokenStore>,
        users: Arc<dyn UserStore>,
        limiter: SessionLimiter,
    ) -> Self {
        Self {
            codec,
            store,
            users,
            limiter,
        }
    }

    /// Registers a new user and issues their first session.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the email is taken, or a `Storage` error if
    /// persistence fails.
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> AuthResult<IssuedTokens> {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            role: Role::Member,
            password_hash: hash_password(password)?,
        };
        self.users.create(&user).await?;

        tracing::info!(user_id = %user.id, email = %user.email, "user registered");
        self.issue_session(user).await
    }

    /// Authenticates credentials and issues a session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for an unknown email or wrong
    /// password (indistinguishable by design), or a `Storage` error.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<IssuedTokens> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "login succeeded");
        self.issue_session(user).await
    }

    /// Rotates a refresh token: revokes the presented one and issues a
    /// fresh access/refresh pair backed by exactly one new record.
    ///
    /// Replaying the old refresh token after rotation fails, because its
    /// record is revoked.
    ///
    /// # Errors
    ///
    /// Returns `TokenExpired` for an expired token, `InvalidGrant` for a
    /// revoked/unknown/forged one, or a `Storage` error.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<IssuedTokens> {
        let claims = self.codec.verify_refresh(refresh_token)?;

        let record = self
            .store
            .find_refresh_record(claims.jti)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("unknown refresh token"))?;
        if !record.is_active() {
            return Err(AuthError::invalid_grant("refresh token is revoked or expired"));
        }

        let user = self
            .users
            .find_by_id(record.user_id)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("user no longer exists"))?;

        // Rotation: the presented token dies before its replacement is
        // born, so a replay can never find an active record.
        self.store.revoke_refresh_record(claims.jti).await?;

        tracing::debug!(user_id = %user.id, "refresh token rotated");
        self.issue_session(user).await
    }

    /// Ends one session: blacklists the presented access token and
    /// revokes the presented refresh token.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` if the refresh token does not verify, or a
    /// `Storage` error if either write fails - the caller must know the
    /// logout did not fully take effect.
    pub async fn logout(
        &self,
        access_token: Option<&str>,
        refresh_token: &str,
    ) -> AuthResult<()> {
        let claims = self
            .codec
            .verify_refresh(refresh_token)
            .map_err(|e| AuthError::invalid_grant(format!("refresh token rejected: {e}")))?;

        // An expired access token needs no blacklist entry; any other
        // verification failure means the token was never ours.
        if let Some(token) = access_token {
            match self.codec.verify_access(token) {
                Ok(access_claims) => {
                    self.store
                        .blacklist_access_token(
                            access_claims.sub,
                            &BlacklistEntry::hash_token(token),
                            access_claims.expires_at()?,
                            BlacklistReason::ManualLogout,
                        )
                        .await?;
                }
                Err(err) => {
                    tracing::debug!(error = %err, "skipping blacklist of unusable access token");
                }
            }
        }

        self.store.revoke_refresh_record(claims.jti).await?;
        tracing::info!(user_id = %claims.sub, "logout completed");
        Ok(())
    }

    /// Administrative force-logout: immediately ends every session the
    /// target user holds, including already-issued access tokens.
    ///
    /// Idempotent - a second call revokes nothing further and writes a
    /// redundant, harmless sentinel with a later timestamp.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated`/`Forbidden` if the actor is not an
    /// admin, or a `Storage` error if the invalidation did not take
    /// effect.
    pub async fn force_logout_user(
        &self,
        actor: &RequestContext,
        target_user_id: Uuid,
    ) -> AuthResult<u64> {
        let admin = crate::authorize::require_role(actor, Role::Admin)?;

        // No access token issued before now outlives its TTL, so the
        // sentinel itself can expire with them.
        let entry_expires_at = OffsetDateTime::now_utc() + self.codec.access_ttl();
        let revoked = self
            .store
            .blacklist_all_for_user(target_user_id, entry_expires_at)
            .await?;

        tracing::info!(
            admin_id = %admin.id,
            target_user_id = %target_user_id,
            sessions_invalidated = revoked,
            "force-logout completed"
        );
        Ok(revoked)
    }

    /// Session usage report for the admin UI.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated`/`Forbidden` if the actor is not an
    /// admin, or a `Storage` error.
    pub async fn session_usage(&self, actor: &RequestContext) -> AuthResult<Vec<SessionUsage>> {
        crate::authorize::require_role(actor, Role::Admin)?;
        self.limiter.usage_report().await
    }

    /// Issues a fresh access/refresh pair for `user` and persists the
    /// refresh record, evicting the oldest session first if the user is
    /// at the concurrent-session limit.
    async fn issue_session(&self, user: User) -> AuthResult<IssuedTokens> {
        self.limiter.make_room(user.id).await?;

        let (access_token, _) = self.codec.issue_access(&user)?;
        let (refresh_token, refresh_claims) = self.codec.issue_refresh(&user)?;

        let issued_at = OffsetDateTime::from_unix_timestamp(refresh_claims.iat)
            .map_err(|e| AuthError::internal(format!("invalid iat: {e}")))?;
        let expires_at = OffsetDateTime::from_unix_timestamp(refresh_claims.exp)
            .map_err(|e| AuthError::internal(format!("invalid exp: {e}")))?;

        self.store
            .create_refresh_record(&RefreshTokenRecord::new(
                user.id,
                refresh_claims.jti,
                issued_at,
                expires_at,
            ))
            .await?;

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::pipeline::AuthPipeline;
    use crate::storage::{MemoryTokenStore, MemoryUserStore};

    struct Fixture {
        service: AuthService,
        pipeline: AuthPipeline,
        store: Arc<MemoryTokenStore>,
    }

    fn fixture() -> Fixture {
        fixture_with_limit(5)
    }

    fn fixture_with_limit(max_sessions: u32) -> Fixture {
        let codec = Arc::new(TokenCodec::new(&AuthConfig::new("access", "refresh")));
        let store = Arc::new(MemoryTokenStore::new());
        let users = Arc::new(MemoryUserStore::new());
        let limiter = SessionLimiter::new(store.clone(), max_sessions);

        Fixture {
            service: AuthService::new(codec.clone(), store.clone(), users.clone(), limiter),
            pipeline: AuthPipeline::new(codec, store.clone(), users),
            store,
        }
    }

    async fn admin_ctx(f: &Fixture) -> RequestContext {
        let tokens = f
            .service
            .register("root@example.com", "Root", "admin-pass")
            .await
            .unwrap();
        let mut admin = tokens.user.clone();
        admin.role = Role::Admin;
        RequestContext::authenticated(admin, tokens.access_token)
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let f = fixture();
        f.service
            .register("ana@example.com", "Ana", "hunter2!")
            .await
            .unwrap();

        let tokens = f.service.login("ana@example.com", "hunter2!").await.unwrap();
        assert_eq!(tokens.user.email, "ana@example.com");
        assert_eq!(tokens.user.role, Role::Member);
        assert_eq!(
            f.store
                .count_active_refresh_tokens(tokens.user.id)
                .await
                .unwrap(),
            2 // registration session + login session
        );
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let f = fixture();
        f.service
            .register("ana@example.com", "Ana", "hunter2!")
            .await
            .unwrap();

        assert!(matches!(
            f.service.register("ana@example.com", "Ana II", "other").await,
            Err(AuthError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let f = fixture();
        f.service
            .register("ana@example.com", "Ana", "hunter2!")
            .await
            .unwrap();

        let unknown = f.service.login("ghost@example.com", "hunter2!").await;
        let wrong = f.service.login("ana@example.com", "wrong").await;
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_rejects_replay() {
        let f = fixture();
        let tokens = f
            .service
            .register("ana@example.com", "Ana", "hunter2!")
            .await
            .unwrap();

        let rotated = f.service.refresh(&tokens.refresh_token).await.unwrap();
        assert_ne!(rotated.refresh_token, tokens.refresh_token);
        // Rotation keeps the session count at one.
        assert_eq!(
            f.store
                .count_active_refresh_tokens(tokens.user.id)
                .await
                .unwrap(),
            1
        );

        // Replaying the old token fails: its record is revoked.
        assert!(matches!(
            f.service.refresh(&tokens.refresh_token).await,
            Err(AuthError::InvalidGrant { .. })
        ));
        // The rotated token still works.
        f.service.refresh(&rotated.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_rejects_forged_token() {
        let f = fixture();
        assert!(matches!(
            f.service.refresh("not-a-token").await,
            Err(AuthError::InvalidToken { .. })
        ));
    }

    #[tokio::test]
    async fn test_session_limit_holds_across_logins() {
        let f = fixture_with_limit(3);
        f.service
            .register("ana@example.com", "Ana", "hunter2!")
            .await
            .unwrap();

        let mut user_id = None;
        for _ in 0..6 {
            let tokens = f.service.login("ana@example.com", "hunter2!").await.unwrap();
            user_id = Some(tokens.user.id);
            let count = f
                .store
                .count_active_refresh_tokens(tokens.user.id)
                .await
                .unwrap();
            assert!(count <= 3, "session count {count} exceeded the limit");
        }
        assert_eq!(
            f.store
                .count_active_refresh_tokens(user_id.unwrap())
                .await
                .unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn test_logout_blacklists_and_revokes() {
        let f = fixture();
        let tokens = f
            .service
            .register("ana@example.com", "Ana", "hunter2!")
            .await
            .unwrap();

        f.service
            .logout(Some(&tokens.access_token), &tokens.refresh_token)
            .await
            .unwrap();

        // The access token is now blacklisted and the session is gone.
        assert!(f
            .store
            .is_access_token_blacklisted(&tokens.access_token)
            .await
            .unwrap());
        assert_eq!(
            f.store
                .count_active_refresh_tokens(tokens.user.id)
                .await
                .unwrap(),
            0
        );
        // And the refresh token cannot be replayed.
        assert!(matches!(
            f.service.refresh(&tokens.refresh_token).await,
            Err(AuthError::InvalidGrant { .. })
        ));
    }

    #[tokio::test]
    async fn test_force_logout_requires_admin() {
        let f = fixture();
        let tokens = f
            .service
            .register("ana@example.com", "Ana", "hunter2!")
            .await
            .unwrap();
        let member_ctx =
            RequestContext::authenticated(tokens.user.clone(), tokens.access_token.clone());

        assert!(matches!(
            f.service.force_logout_user(&member_ctx, tokens.user.id).await,
            Err(AuthError::Forbidden { .. })
        ));
        assert!(matches!(
            f.service
                .force_logout_user(&RequestContext::anonymous(), tokens.user.id)
                .await,
            Err(AuthError::Unauthenticated { .. })
        ));
    }

    #[tokio::test]
    async fn test_force_logout_kills_issued_access_tokens() {
        let f = fixture();
        let admin = admin_ctx(&f).await;
        let tokens = f
            .service
            .register("ana@example.com", "Ana", "hunter2!")
            .await
            .unwrap();

        // Before: the access token authenticates.
        let bearer = format!("Bearer {}", tokens.access_token);
        assert!(f.pipeline.authenticate(Some(&bearer)).await.is_authenticated());

        let revoked = f
            .service
            .force_logout_user(&admin, tokens.user.id)
            .await
            .unwrap();
        assert_eq!(revoked, 1);

        // After: the same access token resolves to anonymous...
        assert!(!f.pipeline.authenticate(Some(&bearer)).await.is_authenticated());
        // ...and the refresh token is dead, forcing a re-login.
        assert!(matches!(
            f.service.refresh(&tokens.refresh_token).await,
            Err(AuthError::InvalidGrant { .. })
        ));

        // A fresh login works and authenticates again.
        let fresh = f.service.login("ana@example.com", "hunter2!").await.unwrap();
        let fresh_bearer = format!("Bearer {}", fresh.access_token);
        assert!(
            f.pipeline
                .authenticate(Some(&fresh_bearer))
                .await
                .is_authenticated()
        );
    }

    #[tokio::test]
    async fn test_force_logout_idempotent() {
        let f = fixture();
        let admin = admin_ctx(&f).await;
        let tokens = f
            .service
            .register("ana@example.com", "Ana", "hunter2!")
            .await
            .unwrap();

        let first = f
            .service
            .force_logout_user(&admin, tokens.user.id)
            .await
            .unwrap();
        let second = f
            .service
            .force_logout_user(&admin, tokens.user.id)
            .await
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 0);
        assert_eq!(
            f.store
                .count_active_refresh_tokens(tokens.user.id)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_session_usage_requires_admin() {
        let f = fixture();
        let tokens = f
            .service
            .register("ana@example.com", "Ana", "hunter2!")
            .await
            .unwrap();
        let member_ctx = RequestContext::authenticated(tokens.user, tokens.access_token);

        assert!(matches!(
            f.service.session_usage(&member_ctx).await,
            Err(AuthError::Forbidden { .. })
        ));

        let admin = admin_ctx(&f).await;
        let report = f.service.session_usage(&admin).await.unwrap();
        assert!(!report.is_empty());
    }
}
