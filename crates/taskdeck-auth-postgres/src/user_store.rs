//! User persistence.
//!
//! Only the projection auth needs: id, email, name, role, password hash.
//! The role column holds the canonical lowercase name; an unknown value is
//! surfaced as a storage error rather than mapped to a default role.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use uuid::Uuid;

use taskdeck_auth::AuthResult;
use taskdeck_auth::error::AuthError;
use taskdeck_auth::storage::UserStore;
use taskdeck_auth::types::{Role, User};

use crate::{PgPool, db_error};

type UserTuple = (Uuid, String, String, String, String);

fn user_from_tuple(row: UserTuple) -> AuthResult<User> {
    let role = Role::parse(&row.3)
        .ok_or_else(|| AuthError::storage(format!("unknown role '{}' for user {}", row.3, row.0)))?;
    Ok(User {
        id: row.0,
        email: row.1,
        name: row.2,
        role,
        password_hash: row.4,
    })
}

/// PostgreSQL-backed [`UserStore`].
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        let row: Option<UserTuple> = query_as(
            r#"
            SELECT id, email, name, role, password_hash
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(user_from_tuple).transpose()
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let row: Option<UserTuple> = query_as(
            r#"
            SELECT id, email, name, role, password_hash
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(user_from_tuple).transpose()
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        query(
            r#"
            INSERT INTO users (id, email, name, role, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx_core::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return AuthError::conflict("email is already registered");
            }
            db_error(e)
        })?;

        Ok(())
    }
}
