//! Table and index creation.
//!
//! All DDL is idempotent (`IF NOT EXISTS`) so the server can run it on
//! every start without a separate migration step.

use sqlx_core::query::query;

use taskdeck_auth::AuthError;

use crate::{PgPool, db_error};

/// DDL statements, executed in order.
const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        role TEXT NOT NULL,
        password_hash TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS refresh_tokens (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        token_id UUID NOT NULL UNIQUE,
        issued_at TIMESTAMPTZ NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL,
        is_revoked BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user
        ON refresh_tokens (user_id)
        WHERE NOT is_revoked
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blacklisted_access_tokens (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        token_hash TEXT NOT NULL,
        reason TEXT NOT NULL,
        blacklisted_at TIMESTAMPTZ NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_blacklist_hash
        ON blacklisted_access_tokens (token_hash)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_blacklist_user
        ON blacklisted_access_tokens (user_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS resource_grants (
        user_id UUID NOT NULL,
        resource_type TEXT NOT NULL,
        resource_id UUID NOT NULL,
        permission_rank INT NOT NULL,
        PRIMARY KEY (user_id, resource_type, resource_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS resource_owners (
        resource_type TEXT NOT NULL,
        resource_id UUID NOT NULL,
        owner_id UUID NOT NULL,
        PRIMARY KEY (resource_type, resource_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS project_members (
        project_id UUID NOT NULL,
        user_id UUID NOT NULL,
        project_role TEXT NOT NULL,
        PRIMARY KEY (project_id, user_id)
    )
    "#,
];

/// Creates the auth tables and indexes if they do not exist.
///
/// # Errors
///
/// Returns `AuthError::Storage` if any statement fails.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), AuthError> {
    for statement in STATEMENTS {
        query(statement).execute(pool).await.map_err(db_error)?;
    }
    tracing::debug!("auth schema ensured");
    Ok(())
}
