//! Schema assembly.

use std::sync::Arc;

use async_graphql::{EmptySubscription, Schema};

use taskdeck_auth::service::AuthService;

use crate::mutation::MutationRoot;
use crate::query::QueryRoot;

/// The executable GraphQL schema.
pub type TaskdeckSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Builds the schema with the auth service attached.
///
/// The per-request [`RequestContext`](taskdeck_auth::pipeline::RequestContext)
/// is injected by the HTTP handler, not here.
#[must_use]
pub fn build_schema(service: Arc<AuthService>) -> TaskdeckSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(service)
        .finish()
}
