//! Session and token lifecycle management for the Taskdeck API.
//!
//! This crate owns the authentication core: JWT access/refresh token
//! issuance and rotation, server-side blacklisting (including
//! force-logout of all a user's sessions), concurrent-session limiting,
//! and the per-request decision pipeline that combines token validity,
//! blacklist state, and live-session checks into an
//! authenticated-or-anonymous request context.
//!
//! Storage is abstracted behind the traits in [`storage`]; a PostgreSQL
//! backend lives in `taskdeck-auth-postgres`, and the GraphQL surface in
//! `taskdeck-graphql`.
//!
//! # Token model
//!
//! - **Access tokens** are short-lived, stateless JWTs presented on every
//!   request. Early invalidation works through a hash blacklist plus a
//!   per-user force-logout cutoff compared against the token's `iat`.
//! - **Refresh tokens** are long-lived JWTs backed one-to-one by
//!   persisted, revocable records. One active record is one session;
//!   rotation revokes the presented record and creates exactly one new
//!   one.

pub mod authorize;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod middleware;
pub mod password;
pub mod pipeline;
pub mod service;
pub mod session;
pub mod storage;
pub mod token;
pub mod types;

pub use config::AuthConfig;
pub use error::AuthError;
pub use pipeline::{AuthPipeline, RequestContext};
pub use service::{AuthService, IssuedTokens};
pub use session::{SessionLimiter, SessionUsage};
pub use token::TokenCodec;
pub use types::{Role, User};

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
