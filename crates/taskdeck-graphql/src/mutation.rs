//! Mutation root: the auth operation surface.

use std::sync::Arc;

use async_graphql::{Context, Object, Result};
use uuid::Uuid;

use taskdeck_auth::pipeline::RequestContext;
use taskdeck_auth::service::{AuthService, IssuedTokens};

use crate::error::graphql_error;
use crate::types::{AuthPayload, ForceLogoutPayload, UserDto};

fn payload(tokens: IssuedTokens) -> AuthPayload {
    AuthPayload {
        user: UserDto::from(&tokens.user),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }
}

/// Root mutation type.
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Registers a new user and issues their first session.
    async fn register(
        &self,
        ctx: &Context<'_>,
        email: String,
        name: String,
        password: String,
    ) -> Result<AuthPayload> {
        let service = ctx.data::<Arc<AuthService>>()?;
        let tokens = service
            .register(&email, &name, &password)
            .await
            .map_err(|e| graphql_error(&e))?;
        Ok(payload(tokens))
    }

    /// Authenticates credentials and issues a session.
    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> Result<AuthPayload> {
        let service = ctx.data::<Arc<AuthService>>()?;
        let tokens = service
            .login(&email, &password)
            .await
            .map_err(|e| graphql_error(&e))?;
        Ok(payload(tokens))
    }

    /// Rotates a refresh token into a fresh access/refresh pair. The
    /// presented refresh token is revoked and cannot be replayed.
    async fn refresh_token(&self, ctx: &Context<'_>, refresh_token: String) -> Result<AuthPayload> {
        let service = ctx.data::<Arc<AuthService>>()?;
        let tokens = service
            .refresh(&refresh_token)
            .await
            .map_err(|e| graphql_error(&e))?;
        Ok(payload(tokens))
    }

    /// Ends the current session: blacklists the request's access token
    /// and revokes the presented refresh token.
    async fn logout(&self, ctx: &Context<'_>, refresh_token: String) -> Result<bool> {
        let request = ctx.data::<RequestContext>()?;
        let service = ctx.data::<Arc<AuthService>>()?;

        service
            .logout(request.bearer_token(), &refresh_token)
            .await
            .map_err(|e| graphql_error(&e))?;
        Ok(true)
    }

    /// Immediately ends every session a user holds, including
    /// already-issued access tokens. Admin only.
    async fn force_logout_user(
        &self,
        ctx: &Context<'_>,
        user_id: Uuid,
    ) -> Result<ForceLogoutPayload> {
        let request = ctx.data::<RequestContext>()?;
        let service = ctx.data::<Arc<AuthService>>()?;

        let sessions_invalidated = service
            .force_logout_user(request, user_id)
            .await
            .map_err(|e| graphql_error(&e))?;
        Ok(ForceLogoutPayload {
            user_id,
            sessions_invalidated,
        })
    }
}
