//! Per-request authentication pipeline.
//!
//! Turns an inbound `Authorization: Bearer <token>` value into an
//! authenticated-or-anonymous [`RequestContext`]. This is a pure decision
//! sequence: every failing step short-circuits to anonymous rather than
//! raising, because most operations tolerate anonymous access and enforce
//! role checks downstream. Storage failures on this read path resolve to
//! anonymous too (fail closed), logged at error level.
//!
//! Decision order:
//!
//! 1. extract the bearer token; absent or malformed header is anonymous
//! 2. verify signature, expiry, and type tag
//! 3. check the exact-hash blacklist
//! 4. check the force-logout cutoff against the token's `iat`
//! 5. load the user record
//! 6. require at least one live refresh token (an access token whose
//!    refresh chain is gone does not authenticate)

use std::sync::Arc;

use crate::storage::{TokenStore, UserStore};
use crate::token::{TokenCodec, TokenError};
use crate::types::User;

// =============================================================================
// Request Context
// =============================================================================

/// Outcome of authenticating one request.
///
/// Cheap to clone; handed to resolvers for downstream authorization.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    user: Option<Arc<User>>,
    bearer: Option<String>,
}

impl RequestContext {
    /// An anonymous context with no bearer token.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An authenticated context. Test/composition helper; production
    /// contexts come from [`AuthPipeline::authenticate`].
    #[must_use]
    pub fn authenticated(user: User, bearer: impl Into<String>) -> Self {
        Self {
            user: Some(Arc::new(user)),
            bearer: Some(bearer.into()),
        }
    }

    /// The authenticated user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_deref()
    }

    /// Returns `true` if a user is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// The raw bearer token presented with the request, whether or not it
    /// authenticated. Logout needs it to blacklist the presented token.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer.as_deref()
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Per-request authentication decision process.
pub struct AuthPipeline {
    codec: Arc<TokenCodec>,
    store: Arc<dyn TokenStore>,
    users: Arc<dyn UserStore>,
}

impl AuthPipeline {
    /// Creates a pipeline over the given codec and stores.
    #[must_use]
    pub fn new(
        codec: Arc<TokenCodec>,
        store: Arc<dyn TokenStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            codec,
            store,
            users,
        }
    }

    /// Authenticates a request from its `Authorization` header value.
    ///
    /// Never fails: every rejection resolves to an anonymous context.
    pub async fn authenticate(&self, authorization: Option<&str>) -> RequestContext {
        let Some(token) = extract_bearer(authorization) else {
            return RequestContext::anonymous();
        };

        // Keep the raw token around even when authentication fails, so a
        // logout presented with an otherwise-dead token can still
        // blacklist it.
        let anonymous_with_token = || RequestContext {
            user: None,
            bearer: Some(token.to_string()),
        };

        let claims = match self.codec.verify_access(token) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => {
                tracing::debug!("access token expired");
                return anonymous_with_token();
            }
            Err(err) => {
                tracing::warn!(error = %err, "rejected suspicious access token");
                return anonymous_with_token();
            }
        };

        match self.store.is_access_token_blacklisted(token).await {
            Ok(false) => {}
            Ok(true) => {
                tracing::debug!(user_id = %claims.sub, "access token is blacklisted");
                return anonymous_with_token();
            }
            Err(err) => {
                tracing::error!(error = %err, "blacklist lookup failed; failing closed");
                return anonymous_with_token();
            }
        }

        let issued_at = match claims.issued_at() {
            Ok(t) => t,
            Err(err) => {
                tracing::warn!(error = %err, "access token carried an unusable iat claim");
                return anonymous_with_token();
            }
        };
        match self
            .store
            .was_issued_before_force_logout(claims.sub, issued_at)
            .await
        {
            Ok(false) => {}
            Ok(true) => {
                tracing::debug!(user_id = %claims.sub, "access token predates force-logout");
                return anonymous_with_token();
            }
            Err(err) => {
                tracing::error!(error = %err, "force-logout lookup failed; failing closed");
                return anonymous_with_token();
            }
        }

        let user = match self.users.find_by_id(claims.sub).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::debug!(user_id = %claims.sub, "token subject no longer exists");
                return anonymous_with_token();
            }
            Err(err) => {
                tracing::error!(error = %err, "user lookup failed; failing closed");
                return anonymous_with_token();
            }
        };

        match self.store.count_active_refresh_tokens(claims.sub).await {
            Ok(0) => {
                tracing::debug!(
                    user_id = %claims.sub,
                    "no live session backs this access token"
                );
                return anonymous_with_token();
            }
            Ok(_) => {}
            Err(err) => {
                tracing::error!(error = %err, "session count failed; failing closed");
                return anonymous_with_token();
            }
        }

        RequestContext {
            user: Some(Arc::new(user)),
            bearer: Some(token.to_string()),
        }
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` value.
fn extract_bearer(authorization: Option<&str>) -> Option<&str> {
    authorization?
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
}
