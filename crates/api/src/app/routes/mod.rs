use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod export;
pub mod fiscal_modules;
pub mod system;
pub mod terminals;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/export", post(export::export_objects))
        .nest("/users", users::router())
        .nest("/fiscal-modules", fiscal_modules::router())
        .nest("/terminals", terminals::router())
}
