//! Taskdeck API server assembly.
//!
//! Wires the auth core, a storage backend, and the GraphQL schema into an
//! axum application. Storage is PostgreSQL when `DATABASE_URL` is set,
//! otherwise the in-memory backend (local development only; all sessions
//! die with the process).

pub mod observability;

use std::sync::Arc;

use axum::{Json, Router, routing::get, routing::post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use taskdeck_auth::config::AuthConfig;
use taskdeck_auth::error::AuthError;
use taskdeck_auth::pipeline::AuthPipeline;
use taskdeck_auth::service::AuthService;
use taskdeck_auth::session::SessionLimiter;
use taskdeck_auth::storage::{MemoryTokenStore, MemoryUserStore, TokenStore, UserStore};
use taskdeck_auth::token::TokenCodec;
use taskdeck_auth_postgres::PgAuthStorage;
use taskdeck_graphql::{GraphQLState, build_schema, graphql_handler};

/// Environment variable naming the PostgreSQL connection string.
pub const DATABASE_URL: &str = "DATABASE_URL";

/// Storage backends selected for this process.
pub struct Backend {
    /// Refresh token and blacklist persistence.
    pub token_store: Arc<dyn TokenStore>,
    /// User persistence.
    pub user_store: Arc<dyn UserStore>,
}

impl Backend {
    /// Selects a backend from the environment: PostgreSQL when
    /// `DATABASE_URL` is set, in-memory otherwise.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the database connection or schema
    /// setup fails.
    pub async fn from_env() -> Result<Self, AuthError> {
        match std::env::var(DATABASE_URL) {
            Ok(url) if !url.trim().is_empty() => {
                let storage = PgAuthStorage::connect(&url).await?;
                storage.ensure_schema().await?;
                tracing::info!("using PostgreSQL storage backend");
                Ok(Self {
                    token_store: Arc::new(storage.token_store()),
                    user_store: Arc::new(storage.user_store()),
                })
            }
            _ => {
                tracing::warn!(
                    "DATABASE_URL not set; using in-memory storage, sessions will not survive restarts"
                );
                Ok(Self {
                    token_store: Arc::new(MemoryTokenStore::new()),
                    user_store: Arc::new(MemoryUserStore::new()),
                })
            }
        }
    }
}

/// Everything the running server needs.
pub struct App {
    /// The HTTP router.
    pub router: Router,
    /// The token store, for the background cleanup task.
    pub token_store: Arc<dyn TokenStore>,
}

/// Assembles the application from configuration and a backend.
#[must_use]
pub fn build_app(config: &AuthConfig, backend: Backend) -> App {
    let codec = Arc::new(TokenCodec::new(config));
    let limiter = SessionLimiter::new(backend.token_store.clone(), config.max_sessions_per_user);

    let service = Arc::new(AuthService::new(
        codec.clone(),
        backend.token_store.clone(),
        backend.user_store.clone(),
        limiter,
    ));
    let pipeline = Arc::new(AuthPipeline::new(
        codec,
        backend.token_store.clone(),
        backend.user_store,
    ));

    let state = GraphQLState {
        schema: build_schema(service),
        pipeline,
    };

    let router = Router::new()
        .route("/graphql", post(graphql_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    App {
        router,
        token_store: backend.token_store,
    }
}

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_backend() -> Backend {
        Backend {
            token_store: Arc::new(MemoryTokenStore::new()),
            user_store: Arc::new(MemoryUserStore::new()),
        }
    }

    #[tokio::test]
    async fn test_build_app_wires_routes() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        let app = build_app(&AuthConfig::new("access", "refresh"), memory_backend());

        let response = app
            .router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_graphql_endpoint_serves_anonymous_requests() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode, header};
        use tower::ServiceExt;

        let app = build_app(&AuthConfig::new("access", "refresh"), memory_backend());

        let body = serde_json::json!({ "query": "{ me { id } }" }).to_string();
        let response = app
            .router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/graphql")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["data"]["me"], serde_json::Value::Null);
    }
}
