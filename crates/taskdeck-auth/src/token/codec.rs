//! JWT signing and verification.
//!
//! Pure, stateless logic over the two configured secrets. Access and
//! refresh tokens are signed with independent HS256 secrets so compromise
//! of one token class cannot forge the other. Verification returns a
//! tagged [`TokenError`] and never panics past this boundary; an expired
//! token is a benign, expected outcome and must not be reported as an
//! operational error.

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::types::{Role, User};

// =============================================================================
// Claims
// =============================================================================

/// Discriminator claim distinguishing access from refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived, stateless bearer credential.
    Access,
    /// Long-lived, persisted-and-revocable credential.
    Refresh,
}

impl TokenType {
    /// Canonical claim value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id.
    pub sub: Uuid,
    /// User email, for display and audit logging.
    pub email: String,
    /// User role at issuance time.
    pub role: Role,
    /// Always [`TokenType::Access`]; verified against the expected type.
    pub token_type: TokenType,
    /// Issuance instant (unix seconds). Compared against force-logout
    /// cutoffs during request authentication.
    pub iat: i64,
    /// Expiry instant (unix seconds).
    pub exp: i64,
}

impl AccessClaims {
    /// Issuance instant as an [`OffsetDateTime`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the claim is outside the
    /// representable timestamp range (only possible for a forged token
    /// that nevertheless carried a valid signature).
    pub fn issued_at(&self) -> Result<OffsetDateTime, AuthError> {
        OffsetDateTime::from_unix_timestamp(self.iat)
            .map_err(|e| AuthError::internal(format!("invalid iat claim: {e}")))
    }

    /// Expiry instant as an [`OffsetDateTime`].
    ///
    /// # Errors
    ///
    /// Same contract as [`AccessClaims::issued_at`].
    pub fn expires_at(&self) -> Result<OffsetDateTime, AuthError> {
        OffsetDateTime::from_unix_timestamp(self.exp)
            .map_err(|e| AuthError::internal(format!("invalid exp claim: {e}")))
    }
}

/// Claims carried by a refresh token.
///
/// Deliberately minimal: the persisted [`RefreshTokenRecord`] keyed by
/// `jti` is the source of truth for everything else.
///
/// [`RefreshTokenRecord`]: crate::types::RefreshTokenRecord
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// User id.
    pub sub: Uuid,
    /// Unique, unguessable token id; maps to exactly one persisted record.
    pub jti: Uuid,
    /// Always [`TokenType::Refresh`]; verified against the expected type.
    pub token_type: TokenType,
    /// Issuance instant (unix seconds).
    pub iat: i64,
    /// Expiry instant (unix seconds).
    pub exp: i64,
}

// =============================================================================
// Errors
// =============================================================================

/// Verification failures, tagged by cause.
///
/// `Expired` is benign and expected in normal operation. The other
/// variants indicate a token that was never issued by this service and
/// are worth a warning log.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token's `exp` claim is in the past.
    #[error("Token expired")]
    Expired,

    /// The signature does not verify against the configured secret.
    #[error("Invalid signature")]
    BadSignature,

    /// The token is not a structurally valid JWT or its claims do not
    /// deserialize.
    #[error("Malformed token: {message}")]
    Malformed {
        /// Description of the parse failure.
        message: String,
    },

    /// The `token_type` claim does not match what the caller expected
    /// (e.g. a refresh token presented as an access token).
    #[error("Wrong token type: expected {expected}")]
    WrongType {
        /// The expected token type.
        expected: &'static str,
    },
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::TokenExpired,
            other => Self::invalid_token(other.to_string()),
        }
    }
}

// =============================================================================
// Codec
// =============================================================================

/// Signs and verifies access and refresh tokens.
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: time::Duration,
    refresh_ttl: time::Duration,
}

impl TokenCodec {
    /// Creates a codec from the auth configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            access_ttl: time::Duration::seconds(config.access_token_ttl.as_secs() as i64),
            refresh_ttl: time::Duration::seconds(config.refresh_token_ttl.as_secs() as i64),
        }
    }

    /// Configured access token lifetime.
    #[must_use]
    pub fn access_ttl(&self) -> time::Duration {
        self.access_ttl
    }

    /// Configured refresh token lifetime.
    #[must_use]
    pub fn refresh_ttl(&self) -> time::Duration {
        self.refresh_ttl
    }

    /// Issues a signed access token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` only on a signing failure, which
    /// indicates a configuration problem rather than bad input.
    pub fn issue_access(&self, user: &User) -> Result<(String, AccessClaims), AuthError> {
        self.issue_access_at(user, OffsetDateTime::now_utc())
    }

    fn issue_access_at(
        &self,
        user: &User,
        now: OffsetDateTime,
    ) -> Result<(String, AccessClaims), AuthError> {
        let claims = AccessClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            token_type: TokenType::Access,
            iat: now.unix_timestamp(),
            exp: (now + self.access_ttl).unix_timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| AuthError::internal(format!("failed to sign access token: {e}")))?;
        Ok((token, claims))
    }

    /// Issues a signed refresh token for `user` with a fresh unique `jti`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` only on a signing failure.
    pub fn issue_refresh(&self, user: &User) -> Result<(String, RefreshClaims), AuthError> {
        self.issue_refresh_at(user, OffsetDateTime::now_utc())
    }

    fn issue_refresh_at(
        &self,
        user: &User,
        now: OffsetDateTime,
    ) -> Result<(String, RefreshClaims), AuthError> {
        let claims = RefreshClaims {
            sub: user.id,
            jti: Uuid::new_v4(),
            token_type: TokenType::Refresh,
            iat: now.unix_timestamp(),
            exp: (now + self.refresh_ttl).unix_timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(|e| AuthError::internal(format!("failed to sign refresh token: {e}")))?;
        Ok((token, claims))
    }

    /// Verifies an access token: signature, expiry, and type tag.
    ///
    /// # Errors
    ///
    /// Returns a tagged [`TokenError`] describing the failure.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        verify(token, &self.access_decoding, TokenType::Access)
    }

    /// Verifies a refresh token: signature, expiry, and type tag.
    ///
    /// # Errors
    ///
    /// Returns a tagged [`TokenError`] describing the failure.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        verify(token, &self.refresh_decoding, TokenType::Refresh)
    }
}

/// Minimal claim shape shared by both token classes.
///
/// The type tag must be checked before deserializing the full claims:
/// access and refresh payloads differ in shape, so decoding a refresh
/// token straight into [`AccessClaims`] fails on the missing fields and
/// would mask the wrong-type condition as a malformed token.
#[derive(Debug, Deserialize)]
struct TaggedClaims {
    token_type: TokenType,
}

fn verify<C: DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
    expected: TokenType,
) -> Result<C, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // No clock skew allowance: a token is invalid at its expiry instant.
    validation.leeway = 0;

    let tag: TaggedClaims = decode_claims(token, key, &validation)?;
    if tag.token_type != expected {
        return Err(TokenError::WrongType {
            expected: expected.as_str(),
        });
    }

    decode_claims(token, key, &validation)
}

fn decode_claims<C: DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
    validation: &Validation,
) -> Result<C, TokenError> {
    match decode::<C>(token, key, validation) {
        Ok(data) => Ok(data.claims),
        Err(err) => Err(match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            _ => TokenError::Malformed {
                message: err.to_string(),
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use time::Duration;

    fn test_codec() -> TokenCodec {
        TokenCodec::new(&AuthConfig::new("access-secret", "refresh-secret"))
    }

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "mira@example.com".to_string(),
            name: "Mira".to_string(),
            role: Role::Member,
            password_hash: String::new(),
        }
    }

    #[test]
    fn test_access_round_trip() {
        let codec = test_codec();
        let user = test_user();

        let (token, issued) = codec.issue_access(&user).unwrap();
        let verified = codec.verify_access(&token).unwrap();

        assert_eq!(verified.sub, user.id);
        assert_eq!(verified.email, user.email);
        assert_eq!(verified.role, Role::Member);
        assert_eq!(verified.iat, issued.iat);
        assert_eq!(verified.exp, issued.iat + 15 * 60);
    }

    #[test]
    fn test_refresh_round_trip() {
        let codec = test_codec();
        let user = test_user();

        let (token, issued) = codec.issue_refresh(&user).unwrap();
        let verified = codec.verify_refresh(&token).unwrap();

        assert_eq!(verified.sub, user.id);
        assert_eq!(verified.jti, issued.jti);
    }

    #[test]
    fn test_expired_access_token() {
        let codec = test_codec();
        let user = test_user();

        // Issue in the past so the token is already expired.
        let past = OffsetDateTime::now_utc() - Duration::hours(1);
        let (token, _) = codec.issue_access_at(&user, past).unwrap();

        assert!(matches!(
            codec.verify_access(&token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_cross_secret_rejected() {
        // A refresh token must not verify as an access token: the secrets
        // are independent, so it fails on signature before the type check.
        let codec = test_codec();
        let (refresh, _) = codec.issue_refresh(&test_user()).unwrap();

        assert!(matches!(
            codec.verify_access(&refresh),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn test_wrong_type_detected_under_same_secret() {
        // With identical secrets the signature verifies, so the type tag
        // is the only remaining defense.
        let codec = TokenCodec::new(&AuthConfig::new("shared", "shared"));
        let (refresh, _) = codec.issue_refresh(&test_user()).unwrap();

        assert!(matches!(
            codec.verify_access(&refresh),
            Err(TokenError::WrongType { expected: "access" })
        ));
    }

    #[test]
    fn test_access_rejected_by_refresh_verifier_under_same_secret() {
        let codec = TokenCodec::new(&AuthConfig::new("shared", "shared"));
        let (access, _) = codec.issue_access(&test_user()).unwrap();

        assert!(matches!(
            codec.verify_refresh(&access),
            Err(TokenError::WrongType {
                expected: "refresh"
            })
        ));
    }

    #[test]
    fn test_forged_signature_rejected() {
        let codec = test_codec();
        let other = TokenCodec::new(&AuthConfig::new("other-access", "other-refresh"));
        let (token, _) = other.issue_access(&test_user()).unwrap();

        assert!(matches!(
            codec.verify_access(&token),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = test_codec();
        assert!(matches!(
            codec.verify_access("not-a-jwt"),
            Err(TokenError::Malformed { .. })
        ));
    }

    #[test]
    fn test_refresh_jti_unique_per_issuance() {
        let codec = test_codec();
        let user = test_user();

        let jtis: HashSet<Uuid> = (0..50)
            .map(|_| codec.issue_refresh(&user).unwrap().1.jti)
            .collect();
        assert_eq!(jtis.len(), 50);
    }
}
