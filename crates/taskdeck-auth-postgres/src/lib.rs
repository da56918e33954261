//! PostgreSQL storage backend for taskdeck-auth.
//!
//! Implements the core storage traits over typed relational tables:
//!
//! - `refresh_tokens` - one row per issued refresh token (session)
//! - `blacklisted_access_tokens` - exact-hash and force-logout sentinel
//!   entries
//! - `users` - the minimal user projection consumed by auth
//! - `resource_grants` / `resource_owners` / `project_members` - the
//!   access-control reads behind the authorization layer
//!
//! Token hashes, never raw tokens, reach these tables. The force-logout
//! write (revoke all sessions + insert sentinel) runs in one transaction
//! so a crash cannot leave a visible sentinel with live refresh tokens
//! behind it.
//!
//! # Example
//!
//! ```ignore
//! use taskdeck_auth_postgres::PgAuthStorage;
//!
//! let storage = PgAuthStorage::connect("postgres://localhost/taskdeck").await?;
//! storage.ensure_schema().await?;
//! let token_store = storage.token_store();
//! ```

pub mod access_store;
pub mod schema;
pub mod token_store;
pub mod user_store;

use sqlx_core::pool::{Pool, PoolOptions};
use sqlx_postgres::Postgres;

use taskdeck_auth::AuthError;

pub use access_store::PgAccessStore;
pub use token_store::PgTokenStore;
pub use user_store::PgUserStore;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

/// Maps a database failure into the auth error taxonomy.
///
/// Callers in the request pipeline treat the result as "fail closed";
/// mutation paths propagate it.
pub(crate) fn db_error(err: sqlx_core::Error) -> AuthError {
    AuthError::storage(err.to_string())
}

/// Shared entry point owning the connection pool.
#[derive(Clone)]
pub struct PgAuthStorage {
    pool: PgPool,
}

impl PgAuthStorage {
    /// Connects to PostgreSQL and returns the storage entry point.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, AuthError> {
        let pool = PoolOptions::<Postgres>::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(db_error)?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the auth tables and indexes if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if a DDL statement fails.
    pub async fn ensure_schema(&self) -> Result<(), AuthError> {
        schema::ensure_schema(&self.pool).await
    }

    /// Token store backed by this pool.
    #[must_use]
    pub fn token_store(&self) -> PgTokenStore {
        PgTokenStore::new(self.pool.clone())
    }

    /// User store backed by this pool.
    #[must_use]
    pub fn user_store(&self) -> PgUserStore {
        PgUserStore::new(self.pool.clone())
    }

    /// Access store backed by this pool.
    #[must_use]
    pub fn access_store(&self) -> PgAccessStore {
        PgAccessStore::new(self.pool.clone())
    }
}
