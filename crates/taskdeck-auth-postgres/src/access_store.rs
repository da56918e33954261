//! Access-control reads.
//!
//! Grants, ownership, and project membership are owned by the surrounding
//! CRUD layer; this store only reads them for the authorization checks.

use async_trait::async_trait;
use sqlx_core::query_scalar::query_scalar;
use uuid::Uuid;

use taskdeck_auth::AuthResult;
use taskdeck_auth::storage::AccessStore;
use taskdeck_auth::types::{PermissionLevel, ProjectRole};

use crate::{PgPool, db_error};

/// PostgreSQL-backed [`AccessStore`].
#[derive(Clone)]
pub struct PgAccessStore {
    pool: PgPool,
}

impl PgAccessStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessStore for PgAccessStore {
    async fn permission_level(
        &self,
        user_id: Uuid,
        resource_type: &str,
        resource_id: Uuid,
    ) -> AuthResult<Option<PermissionLevel>> {
        let rank: Option<i32> = query_scalar(
            r#"
            SELECT permission_rank
            FROM resource_grants
            WHERE user_id = $1
              AND resource_type = $2
              AND resource_id = $3
            "#,
        )
        .bind(user_id)
        .bind(resource_type)
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        // An out-of-range rank reads as no grant; the check falls through
        // to ownership rather than failing the request.
        Ok(rank.and_then(PermissionLevel::from_rank))
    }

    async fn resource_owner(
        &self,
        resource_type: &str,
        resource_id: Uuid,
    ) -> AuthResult<Option<Uuid>> {
        let owner: Option<Uuid> = query_scalar(
            r#"
            SELECT owner_id
            FROM resource_owners
            WHERE resource_type = $1
              AND resource_id = $2
            "#,
        )
        .bind(resource_type)
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(owner)
    }

    async fn project_role(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> AuthResult<Option<ProjectRole>> {
        let role: Option<String> = query_scalar(
            r#"
            SELECT project_role
            FROM project_members
            WHERE user_id = $1
              AND project_id = $2
            "#,
        )
        .bind(user_id)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(role.as_deref().and_then(ProjectRole::parse))
    }
}
