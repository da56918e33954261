//! Authentication configuration.
//!
//! Configuration is environment-supplied in deployments. The two signing
//! secrets are required and have no default: a process started without them
//! must fail before serving a single request, never fall back to a
//! hardcoded value.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! access_token_secret = "..."
//! refresh_token_secret = "..."
//! access_token_ttl = "15m"
//! refresh_token_ttl = "7d"
//! max_sessions_per_user = 5
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AuthError;

/// Environment variable names recognized by [`AuthConfig::from_env`].
pub mod env {
    /// Secret used to sign access tokens (required).
    pub const ACCESS_TOKEN_SECRET: &str = "ACCESS_TOKEN_SECRET";
    /// Secret used to sign refresh tokens (required).
    pub const REFRESH_TOKEN_SECRET: &str = "REFRESH_TOKEN_SECRET";
    /// Access token lifetime, humantime format (default "15m").
    pub const ACCESS_TOKEN_TTL: &str = "ACCESS_TOKEN_TTL";
    /// Refresh token lifetime, humantime format (default "7d").
    pub const REFRESH_TOKEN_TTL: &str = "REFRESH_TOKEN_TTL";
    /// Maximum concurrent sessions per user (default 5).
    pub const MAX_SESSIONS_PER_USER: &str = "MAX_SESSIONS_PER_USER";
    /// Blacklist/refresh-token cleanup period, humantime format (default "1h").
    pub const CLEANUP_INTERVAL: &str = "CLEANUP_INTERVAL";
}

/// Authentication and session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Secret for signing access tokens.
    ///
    /// Must be independent from `refresh_token_secret` so a compromise of
    /// one token class cannot forge the other.
    pub access_token_secret: String,

    /// Secret for signing refresh tokens.
    pub refresh_token_secret: String,

    /// Access token lifetime. Short: access tokens are stateless and can
    /// only be invalidated early through the blacklist.
    #[serde(default = "default_access_token_ttl", with = "humantime_serde")]
    pub access_token_ttl: Duration,

    /// Refresh token lifetime. Refresh tokens are persisted and revocable,
    /// so a longer lifetime is acceptable.
    #[serde(default = "default_refresh_token_ttl", with = "humantime_serde")]
    pub refresh_token_ttl: Duration,

    /// Maximum concurrent active sessions (refresh tokens) per user.
    #[serde(default = "default_max_sessions")]
    pub max_sessions_per_user: u32,

    /// Period of the background cleanup task.
    #[serde(default = "default_cleanup_interval", with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

fn default_access_token_ttl() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_refresh_token_ttl() -> Duration {
    Duration::from_secs(7 * 24 * 3600)
}

fn default_max_sessions() -> u32 {
    5
}

fn default_cleanup_interval() -> Duration {
    Duration::from_secs(3600)
}

impl AuthConfig {
    /// Creates a configuration with the given secrets and default lifetimes.
    #[must_use]
    pub fn new(
        access_token_secret: impl Into<String>,
        refresh_token_secret: impl Into<String>,
    ) -> Self {
        Self {
            access_token_secret: access_token_secret.into(),
            refresh_token_secret: refresh_token_secret.into(),
            access_token_ttl: default_access_token_ttl(),
            refresh_token_ttl: default_refresh_token_ttl(),
            max_sessions_per_user: default_max_sessions(),
            cleanup_interval: default_cleanup_interval(),
        }
    }

    /// Loads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if a required secret is absent or
    /// empty, or if a duration/count value fails to parse.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// Exists so tests can exercise the environment contract without
    /// mutating process-global state.
    ///
    /// # Errors
    ///
    /// Same contract as [`AuthConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        let access_token_secret = require_secret(&lookup, env::ACCESS_TOKEN_SECRET)?;
        let refresh_token_secret = require_secret(&lookup, env::REFRESH_TOKEN_SECRET)?;

        if access_token_secret == refresh_token_secret {
            return Err(AuthError::configuration(format!(
                "{} and {} must be distinct secrets",
                env::ACCESS_TOKEN_SECRET,
                env::REFRESH_TOKEN_SECRET
            )));
        }

        let access_token_ttl = parse_duration(&lookup, env::ACCESS_TOKEN_TTL)?
            .unwrap_or_else(default_access_token_ttl);
        let refresh_token_ttl = parse_duration(&lookup, env::REFRESH_TOKEN_TTL)?
            .unwrap_or_else(default_refresh_token_ttl);
        let cleanup_interval =
            parse_duration(&lookup, env::CLEANUP_INTERVAL)?.unwrap_or_else(default_cleanup_interval);

        let max_sessions_per_user = match lookup(env::MAX_SESSIONS_PER_USER) {
            Some(raw) => raw.parse::<u32>().map_err(|e| {
                AuthError::configuration(format!(
                    "invalid {}: {e}",
                    env::MAX_SESSIONS_PER_USER
                ))
            })?,
            None => default_max_sessions(),
        };

        if max_sessions_per_user == 0 {
            return Err(AuthError::configuration(format!(
                "{} must be at least 1",
                env::MAX_SESSIONS_PER_USER
            )));
        }

        Ok(Self {
            access_token_secret,
            refresh_token_secret,
            access_token_ttl,
            refresh_token_ttl,
            max_sessions_per_user,
            cleanup_interval,
        })
    }
}

fn require_secret(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, AuthError> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AuthError::configuration(format!(
            "{key} is required and must not be empty"
        ))),
    }
}

fn parse_duration(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<Duration>, AuthError> {
    match lookup(key) {
        Some(raw) => humantime::parse_duration(&raw)
            .map(Some)
            .map_err(|e| AuthError::configuration(format!("invalid {key}: {e}"))),
        None => Ok(None),
    }
}
