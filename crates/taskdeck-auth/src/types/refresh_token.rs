//! Refresh token record.
//!
//! One active record is one session. The count of a user's active records
//! is the authoritative "is this user still logged in anywhere" signal,
//! since access tokens are stateless and cannot be enumerated.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Persisted record of an issued refresh token.
///
/// The token itself is a signed JWT carrying `token_id` as its `jti` claim;
/// the record is located by that id on refresh and revocation. Rotation
/// revokes the presented record and creates exactly one new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRecord {
    /// Unique identifier of this record.
    pub id: Uuid,

    /// User the token was issued to.
    pub user_id: Uuid,

    /// The `jti` claim of the signed token; unique per issuance.
    pub token_id: Uuid,

    /// When the token was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,

    /// When the token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Whether the token has been revoked (logout, rotation, force-logout).
    pub is_revoked: bool,
}

impl RefreshTokenRecord {
    /// Creates a new, unrevoked record.
    #[must_use]
    pub fn new(user_id: Uuid, token_id: Uuid, issued_at: OffsetDateTime, expires_at: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_id,
            issued_at,
            expires_at,
            is_revoked: false,
        }
    }

    /// Returns `true` if this record has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` if this record backs a live session
    /// (not revoked and not expired).
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_revoked && !self.is_expired()
    }
}
