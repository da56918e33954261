//! Query root.

use std::sync::Arc;

use async_graphql::{Context, Object, Result};

use taskdeck_auth::pipeline::RequestContext;
use taskdeck_auth::service::AuthService;

use crate::error::graphql_error;
use crate::types::{SessionUsageDto, UserDto};

/// Root query type.
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The currently authenticated user, or null for anonymous requests.
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<UserDto>> {
        let request = ctx.data::<RequestContext>()?;
        Ok(request.user().map(UserDto::from))
    }

    /// Per-user session usage. Admin only.
    async fn session_usage(&self, ctx: &Context<'_>) -> Result<Vec<SessionUsageDto>> {
        let request = ctx.data::<RequestContext>()?;
        let service = ctx.data::<Arc<AuthService>>()?;

        let report = service
            .session_usage(request)
            .await
            .map_err(|e| graphql_error(&e))?;
        Ok(report.into_iter().map(SessionUsageDto::from).collect())
    }
}
