//! API-side authorization guards.
//!
//! Checked at the handler boundary before any workflow runs; the workflows
//! themselves only see the caller's role where a rule depends on it.

use axum::http::StatusCode;
use axum::response::Response;

use fiscalhub_auth::{AuthzError, require_admin, require_self_or_admin};
use fiscalhub_core::UserId;

use crate::app::errors::json_error;
use crate::context::PrincipalContext;

pub fn ensure_admin(principal: &PrincipalContext) -> Result<(), Response> {
    require_admin(&principal.principal()).map_err(authz_error_to_response)
}

pub fn ensure_self_or_admin(principal: &PrincipalContext, owner: UserId) -> Result<(), Response> {
    require_self_or_admin(&principal.principal(), owner).map_err(authz_error_to_response)
}

fn authz_error_to_response(err: AuthzError) -> Response {
    tracing::debug!(error = %err, "authorization denied");
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}
