//! Authorization enforcement.
//!
//! Built on top of the pipeline's output: authentication detection never
//! raises, but these checks always do, with a stable machine-readable
//! code (`UNAUTHENTICATED`, `FORBIDDEN`) carried by the returned
//! [`AuthError`].

use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::pipeline::RequestContext;
use crate::storage::AccessStore;
use crate::types::{PermissionLevel, ProjectRole, Role, User};

/// Requires an authenticated user.
///
/// # Errors
///
/// Returns `AuthError::Unauthenticated` for an anonymous context.
pub fn require_auth(ctx: &RequestContext) -> AuthResult<&User> {
    ctx.user()
        .ok_or_else(|| AuthError::unauthenticated("authentication required"))
}

/// Requires an authenticated user holding at least `required`.
///
/// # Errors
///
/// Returns `Unauthenticated` for an anonymous context, `Forbidden` for an
/// under-privileged one.
pub fn require_role(ctx: &RequestContext, required: Role) -> AuthResult<&User> {
    let user = require_auth(ctx)?;
    if user.role.satisfies(required) {
        Ok(user)
    } else {
        Err(AuthError::forbidden(format!(
            "requires {} role",
            required.as_str()
        )))
    }
}

/// Requires access to one resource at the given permission level.
///
/// Checks, in order: admin bypass, explicit grant at or above `level`,
/// resource-ownership fallback. First match wins.
///
/// # Errors
///
/// Returns `Unauthenticated`/`Forbidden` on failure, or `Storage` if the
/// grant lookup itself fails.
pub async fn require_permission<'a>(
    ctx: &'a RequestContext,
    access: &dyn AccessStore,
    resource_type: &str,
    resource_id: Uuid,
    level: PermissionLevel,
) -> AuthResult<&'a User> {
    let user = require_auth(ctx)?;

    if user.is_admin() {
        return Ok(user);
    }

    if let Some(granted) = access
        .permission_level(user.id, resource_type, resource_id)
        .await?
        && granted.satisfies(level)
    {
        return Ok(user);
    }

    if access.resource_owner(resource_type, resource_id).await? == Some(user.id) {
        return Ok(user);
    }

    Err(AuthError::forbidden(format!(
        "no {level:?}-level access to {resource_type} {resource_id}"
    )))
}

/// Requires membership in a project at or above `required`.
///
/// Admins bypass the membership check.
///
/// # Errors
///
/// Returns `Unauthenticated`/`Forbidden` on failure, or `Storage` if the
/// membership lookup itself fails.
pub async fn require_project_role<'a>(
    ctx: &'a RequestContext,
    access: &dyn AccessStore,
    project_id: Uuid,
    required: ProjectRole,
) -> AuthResult<&'a User> {
    let user = require_auth(ctx)?;

    if user.is_admin() {
        return Ok(user);
    }

    match access.project_role(user.id, project_id).await? {
        Some(role) if role.satisfies(required) => Ok(user),
        _ => Err(AuthError::forbidden(format!(
            "requires {} role in project {project_id}",
            required.as_str()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryAccessStore;

    fn user_with_role(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            email: "sam@example.com".to_string(),
            name: "Sam".to_string(),
            role,
            password_hash: String::new(),
        }
    }

    fn ctx_with_role(role: Role) -> RequestContext {
        RequestContext::authenticated(user_with_role(role), "token")
    }

    #[test]
    fn test_require_auth() {
        assert!(require_auth(&ctx_with_role(Role::Member)).is_ok());
        assert!(matches!(
            require_auth(&RequestContext::anonymous()),
            Err(AuthError::Unauthenticated { .. })
        ));
    }

    #[test]
    fn test_require_role_hierarchy() {
        assert!(require_role(&ctx_with_role(Role::Admin), Role::Manager).is_ok());
        assert!(require_role(&ctx_with_role(Role::Manager), Role::Manager).is_ok());
        assert!(matches!(
            require_role(&ctx_with_role(Role::Member), Role::Manager),
            Err(AuthError::Forbidden { .. })
        ));
        assert!(matches!(
            require_role(&RequestContext::anonymous(), Role::Member),
            Err(AuthError::Unauthenticated { .. })
        ));
    }

    #[tokio::test]
    async fn test_require_permission_admin_bypass() {
        let access = MemoryAccessStore::new();
        let ctx = ctx_with_role(Role::Admin);

        let result = require_permission(
            &ctx,
            &access,
            "task",
            Uuid::new_v4(),
            PermissionLevel::Manage,
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_require_permission_explicit_grant() {
        let access = MemoryAccessStore::new();
        let user = user_with_role(Role::Member);
        let task = Uuid::new_v4();
        access.grant(user.id, "task", task, PermissionLevel::Edit);
        let ctx = RequestContext::authenticated(user, "token");

        assert!(
            require_permission(&ctx, &access, "task", task, PermissionLevel::View)
                .await
                .is_ok()
        );
        assert!(matches!(
            require_permission(&ctx, &access, "task", task, PermissionLevel::Manage).await,
            Err(AuthError::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn test_require_permission_ownership_fallback() {
        let access = MemoryAccessStore::new();
        let user = user_with_role(Role::Member);
        let task = Uuid::new_v4();
        // No explicit grant, but the user owns the resource.
        access.set_owner("task", task, user.id);
        let ctx = RequestContext::authenticated(user, "token");

        assert!(
            require_permission(&ctx, &access, "task", task, PermissionLevel::Manage)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_require_permission_no_match_is_forbidden() {
        let access = MemoryAccessStore::new();
        let ctx = ctx_with_role(Role::Member);

        assert!(matches!(
            require_permission(&ctx, &access, "task", Uuid::new_v4(), PermissionLevel::View).await,
            Err(AuthError::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn test_require_project_role() {
        let access = MemoryAccessStore::new();
        let user = user_with_role(Role::Member);
        let project = Uuid::new_v4();
        access.add_member(project, user.id, ProjectRole::Contributor);
        let ctx = RequestContext::authenticated(user, "token");

        assert!(
            require_project_role(&ctx, &access, project, ProjectRole::Viewer)
                .await
                .is_ok()
        );
        assert!(matches!(
            require_project_role(&ctx, &access, project, ProjectRole::Owner).await,
            Err(AuthError::Forbidden { .. })
        ));
        // Not a member of some other project at all.
        assert!(matches!(
            require_project_role(&ctx, &access, Uuid::new_v4(), ProjectRole::Viewer).await,
            Err(AuthError::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn test_require_project_role_admin_bypass() {
        let access = MemoryAccessStore::new();
        let ctx = ctx_with_role(Role::Admin);

        assert!(
            require_project_role(&ctx, &access, Uuid::new_v4(), ProjectRole::Owner)
                .await
                .is_ok()
        );
    }
}
