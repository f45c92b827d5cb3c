use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use fiscalhub_core::UserId;
use fiscalhub_infra::{UserChanges, UserDraft};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_user).get(list_users))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Json(body): Json<UserDraft>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_admin(&principal) {
        return resp;
    }

    match services.accounts.create(body).await {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_admin(&principal) {
        return resp;
    }

    match services.accounts.list().await {
        Ok(users) => Json(dto::items(users)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: UserId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(resp) = authz::ensure_self_or_admin(&principal, id) {
        return resp;
    }

    match services.accounts.get(id).await {
        Ok(user) => Json(user).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(id): Path<String>,
    Json(body): Json<UserChanges>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_admin(&principal) {
        return resp;
    }
    let id: UserId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.accounts.update(id, body).await {
        Ok(user) => Json(user).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_admin(&principal) {
        return resp;
    }
    let id: UserId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.accounts.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}
