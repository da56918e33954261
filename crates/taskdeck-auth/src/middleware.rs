//! Axum integration for the authentication pipeline.
//!
//! Provides an extractor that runs [`AuthPipeline::authenticate`] against
//! the request's `Authorization` header. Unlike a conventional bearer
//! guard it is infallible: an anonymous context is a normal outcome, and
//! role checks happen downstream in resolvers.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::post};
//! use taskdeck_auth::middleware::AuthSession;
//!
//! async fn handler(AuthSession(ctx): AuthSession) -> String {
//!     match ctx.user() {
//!         Some(user) => format!("hello, {}", user.name),
//!         None => "hello, anonymous".to_string(),
//!     }
//! }
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::pipeline::{AuthPipeline, RequestContext};

/// Extractor yielding the request's authentication context.
pub struct AuthSession(pub RequestContext);

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    Arc<AuthPipeline>: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pipeline = Arc::<AuthPipeline>::from_ref(state);

        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        Ok(Self(pipeline.authenticate(authorization).await))
    }
}
