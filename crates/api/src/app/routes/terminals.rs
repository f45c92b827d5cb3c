use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use fiscalhub_core::TerminalId;
use fiscalhub_registry::{ProvisionTerminal, Terminal, TerminalPatch};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(provision_terminal).get(list_terminals))
        .route("/exists", post(terminal_exists))
        .route("/:id", get(get_terminal).patch(update_terminal).delete(delete_terminal))
        .route("/:id/status", get(terminal_status))
}

pub async fn provision_terminal(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<ProvisionTerminal>,
) -> axum::response::Response {
    match services.provisioning.provision(body).await {
        Ok(terminal) => (StatusCode::CREATED, Json(terminal)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

/// Admins see every terminal; everyone else only their own.
pub async fn list_terminals(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
) -> axum::response::Response {
    match services.terminals.list_visible_to(&principal.principal()).await {
        Ok(terminals) => Json(dto::items(terminals)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn terminal_exists(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::TerminalExistsRequest>,
) -> axum::response::Response {
    match services
        .terminals
        .find_by_cash_register_number(&body.cash_register_number)
        .await
    {
        Ok(terminal) => Json(dto::TerminalExistsResponse { id: terminal.id }).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn get_terminal(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(id): Path<String>,
) -> axum::response::Response {
    match load_owned(&services, &principal, &id).await {
        Ok(terminal) => Json(terminal).into_response(),
        Err(resp) => resp,
    }
}

pub async fn terminal_status(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(id): Path<String>,
) -> axum::response::Response {
    match load_owned(&services, &principal, &id).await {
        Ok(terminal) => Json(dto::TerminalStatusResponse {
            is_active: terminal.active,
        })
        .into_response(),
        Err(resp) => resp,
    }
}

pub async fn update_terminal(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(id): Path<String>,
    Json(body): Json<TerminalPatch>,
) -> axum::response::Response {
    let terminal = match load_owned(&services, &principal, &id).await {
        Ok(terminal) => terminal,
        Err(resp) => return resp,
    };

    match services.mutation.mutate(terminal.id, body, principal.role()).await {
        Ok(terminal) => Json(terminal).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn delete_terminal(
    Extension(services): Extension<Arc<AppServices>>,
    principal: PrincipalContext,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_admin(&principal) {
        return resp;
    }
    let id: TerminalId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.terminals.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

/// Parse the id, load the terminal and check the caller owns it (or is an admin).
async fn load_owned(
    services: &AppServices,
    principal: &PrincipalContext,
    raw_id: &str,
) -> Result<Terminal, axum::response::Response> {
    let id: TerminalId = dto::parse_id(raw_id)?;
    let terminal = services
        .terminals
        .get(id)
        .await
        .map_err(errors::workflow_error_to_response)?;
    authz::ensure_self_or_admin(principal, terminal.user_id)?;
    Ok(terminal)
}
