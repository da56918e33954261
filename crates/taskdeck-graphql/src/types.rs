//! GraphQL object types for the auth surface.

use async_graphql::SimpleObject;
use uuid::Uuid;

use taskdeck_auth::session::SessionUsage;
use taskdeck_auth::types::User;

/// A user, as exposed through the API. Never carries the password hash.
#[derive(Debug, Clone, SimpleObject)]
pub struct UserDto {
    /// User's unique identifier.
    pub id: Uuid,
    /// Login email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Application-wide role, as its canonical lowercase name.
    pub role: String,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.as_str().to_string(),
        }
    }
}

/// Token pair returned by login, registration, and refresh.
#[derive(Debug, Clone, SimpleObject)]
pub struct AuthPayload {
    /// Short-lived access token, presented as a bearer token.
    pub access_token: String,
    /// Long-lived refresh token, presented only to the refresh and
    /// logout mutations.
    pub refresh_token: String,
    /// The authenticated user.
    pub user: UserDto,
}

/// Result of an administrative force-logout.
#[derive(Debug, Clone, SimpleObject)]
pub struct ForceLogoutPayload {
    /// The targeted user.
    pub user_id: Uuid,
    /// Number of sessions invalidated. Zero means the user held no
    /// active sessions; their issued access tokens are dead either way.
    pub sessions_invalidated: u64,
}

/// One user's session usage, for the admin session view.
#[derive(Debug, Clone, SimpleObject)]
pub struct SessionUsageDto {
    /// The user.
    pub user_id: Uuid,
    /// Active session count.
    pub active: u64,
    /// Configured per-user maximum.
    pub max: u64,
    /// Whether the user is at the limit.
    pub at_limit: bool,
}

impl From<SessionUsage> for SessionUsageDto {
    fn from(usage: SessionUsage) -> Self {
        Self {
            user_id: usage.user_id,
            active: usage.active,
            max: usage.max,
            at_limit: usage.at_limit,
        }
    }
}
