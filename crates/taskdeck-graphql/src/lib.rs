//! GraphQL API layer for the Taskdeck server.
//!
//! Exposes the auth surface: registration, login, refresh rotation,
//! logout, administrative force-logout, and the `me` / session-usage
//! queries. Resolvers pull the per-request
//! [`RequestContext`](taskdeck_auth::pipeline::RequestContext) from the
//! GraphQL context; authentication itself happens in the HTTP handler
//! before execution.

pub mod error;
pub mod handler;
pub mod mutation;
pub mod query;
pub mod schema;
pub mod types;

pub use handler::{GraphQLState, graphql_handler};
pub use mutation::MutationRoot;
pub use query::QueryRoot;
pub use schema::{TaskdeckSchema, build_schema};
