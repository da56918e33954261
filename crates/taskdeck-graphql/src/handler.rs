//! Axum handler for the GraphQL endpoint.
//!
//! Authentication runs before execution via the [`AuthSession`] extractor;
//! the resulting context (authenticated or anonymous) is injected into the
//! request's data so resolvers can enforce their own requirements.

use std::sync::Arc;

use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::{FromRef, State};

use taskdeck_auth::middleware::AuthSession;
use taskdeck_auth::pipeline::AuthPipeline;

use crate::schema::TaskdeckSchema;

/// State shared across GraphQL requests.
#[derive(Clone)]
pub struct GraphQLState {
    /// The executable schema.
    pub schema: TaskdeckSchema,
    /// Per-request authentication.
    pub pipeline: Arc<AuthPipeline>,
}

impl FromRef<GraphQLState> for Arc<AuthPipeline> {
    fn from_ref(state: &GraphQLState) -> Self {
        state.pipeline.clone()
    }
}

/// Handles POST requests to the GraphQL endpoint.
pub async fn graphql_handler(
    State(state): State<GraphQLState>,
    AuthSession(context): AuthSession,
    request: GraphQLRequest,
) -> GraphQLResponse {
    if let Some(user) = context.user() {
        tracing::debug!(user_id = %user.id, "executing GraphQL request");
    } else {
        tracing::debug!("executing anonymous GraphQL request");
    }

    let request = request.into_inner().data(context);
    state.schema.execute(request).await.into()
}
