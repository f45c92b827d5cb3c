//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage selection and workflow wiring
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use fiscalhub_auth::Hs256JwtValidator;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::{AppServices, BootstrapError};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> Result<Router, BootstrapError> {
    let tokens = Arc::new(Hs256JwtValidator::new(config.jwt_secret.clone().into_bytes()));
    let services = services::build_services(config, tokens).await?;
    Ok(router_with(services))
}

/// Router over already-wired services.
pub fn router_with(services: AppServices) -> Router {
    let auth_state = middleware::AuthState {
        jwt: services.tokens.clone(),
    };

    // Protected routes: require a valid bearer token.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/auth", routes::auth::router())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_span))
                .layer(Extension(Arc::new(services))),
        )
}
