//! Public account endpoints: self-registration and login.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;

use fiscalhub_infra::UserDraft;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<UserDraft>,
) -> axum::response::Response {
    match services.accounts.register(body).await {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let user = match services.accounts.authenticate(&body.username, &body.password).await {
        Ok(user) => user,
        Err(e) => return errors::workflow_error_to_response(e),
    };

    match services.issue_token(&user, Utc::now()) {
        Ok((token, expires_at)) => Json(dto::TokenResponse {
            token,
            token_type: "Bearer",
            expires_at,
            user,
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to sign token");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "token_error", "failed to issue token")
        }
    }
}
