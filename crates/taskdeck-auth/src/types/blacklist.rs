//! Access token blacklist entries.
//!
//! Access tokens are stateless, so early invalidation works through a
//! durable blacklist consulted on every request. Two entry shapes exist:
//!
//! - exact entries holding the SHA-256 hash of one revoked access token
//!   (manual logout), and
//! - sentinel entries (`token_hash = "*"`) written by force-logout, which
//!   invalidate every access token issued to the user before the entry's
//!   `blacklisted_at` timestamp.
//!
//! Entries carry the expiry of the token(s) they cover and are deleted by
//! the periodic cleanup task once they can no longer match a live token.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Sentinel `token_hash` value for "all tokens issued before
/// `blacklisted_at`" entries.
pub const FORCE_LOGOUT_SENTINEL: &str = "*";

/// Why a blacklist entry was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlacklistReason {
    /// Administrator force-logged-out the user.
    ForceLogout,
    /// User logged out of one session.
    ManualLogout,
    /// Token invalidated in response to a suspected compromise.
    SecurityBreach,
}

impl BlacklistReason {
    /// Canonical name, as persisted in storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ForceLogout => "force_logout",
            Self::ManualLogout => "manual_logout",
            Self::SecurityBreach => "security_breach",
        }
    }

    /// Parses a reason from its canonical name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "force_logout" => Some(Self::ForceLogout),
            "manual_logout" => Some(Self::ManualLogout),
            "security_breach" => Some(Self::SecurityBreach),
            _ => None,
        }
    }
}

/// Persisted blacklist entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistEntry {
    /// Unique identifier of this entry.
    pub id: Uuid,

    /// User whose token(s) this entry invalidates.
    pub user_id: Uuid,

    /// SHA-256 hex hash of the raw access token, or
    /// [`FORCE_LOGOUT_SENTINEL`]. The raw token is never stored.
    pub token_hash: String,

    /// Why the entry was written.
    pub reason: BlacklistReason,

    /// When the entry was written. For sentinel entries this is the
    /// force-logout cutoff: tokens issued before it are rejected.
    #[serde(with = "time::serde::rfc3339")]
    pub blacklisted_at: OffsetDateTime,

    /// When the covered token(s) naturally expire. The entry is useless
    /// past this instant and eligible for cleanup.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl BlacklistEntry {
    /// Returns `true` if this entry is past its expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` if this is a force-logout sentinel entry.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.token_hash == FORCE_LOGOUT_SENTINEL
    }

    /// Hashes a raw access token for blacklist storage and lookup.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_hash_token() {
        let hash = BlacklistEntry::hash_token("some-access-token");

        // SHA-256 produces 64 hex characters
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, BlacklistEntry::hash_token("some-access-token"));
        assert_ne!(hash, BlacklistEntry::hash_token("another-token"));
    }

    #[test]
    fn test_sentinel_detection() {
        let now = OffsetDateTime::now_utc();
        let entry = BlacklistEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: FORCE_LOGOUT_SENTINEL.to_string(),
            reason: BlacklistReason::ForceLogout,
            blacklisted_at: now,
            expires_at: now + Duration::minutes(15),
        };
        assert!(entry.is_sentinel());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_reason_round_trip() {
        for reason in [
            BlacklistReason::ForceLogout,
            BlacklistReason::ManualLogout,
            BlacklistReason::SecurityBreach,
        ] {
            assert_eq!(BlacklistReason::parse(reason.as_str()), Some(reason));
        }
        assert_eq!(BlacklistReason::parse("other"), None);
    }
}
