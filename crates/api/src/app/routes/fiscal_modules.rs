use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use fiscalhub_core::FiscalModuleId;
use fiscalhub_registry::{FiscalModulePatch, NewFiscalModule};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

/// Fiscal-module administration. Every route is admin-only.
pub fn router() -> Router {
    Router::new()
        .route("/", post(create_module).get(list_modules))
        .route("/:id", get(get_module).patch(update_module).delete(delete_module))
        .route("/:id/activate", post(activate_module))
        .route("/by-fiscal-number/:fiscal_number", get(get_module_by_fiscal_number))
}

pub async fn create_module(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Json(body): Json<NewFiscalModule>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_admin(&principal) {
        return resp;
    }

    match services.fiscal_modules.create(body).await {
        Ok(module) => (StatusCode::CREATED, Json(module)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn list_modules(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_admin(&principal) {
        return resp;
    }

    match services.fiscal_modules.list().await {
        Ok(modules) => Json(dto::items(modules)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn get_module(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_admin(&principal) {
        return resp;
    }
    let id: FiscalModuleId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.fiscal_modules.get(id).await {
        Ok(module) => Json(module).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn get_module_by_fiscal_number(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(fiscal_number): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_admin(&principal) {
        return resp;
    }

    match services.fiscal_modules.get_by_fiscal_number(&fiscal_number).await {
        Ok(module) => Json(module).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn update_module(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(id): Path<String>,
    Json(body): Json<FiscalModulePatch>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_admin(&principal) {
        return resp;
    }
    let id: FiscalModuleId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.fiscal_modules.update(id, body).await {
        Ok(module) => Json(module).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn activate_module(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_admin(&principal) {
        return resp;
    }
    let id: FiscalModuleId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.fiscal_modules.activate(id).await {
        Ok(module) => Json(module).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn delete_module(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_admin(&principal) {
        return resp;
    }
    let id: FiscalModuleId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.fiscal_modules.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}
