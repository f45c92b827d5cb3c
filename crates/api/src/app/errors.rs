use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use fiscalhub_auth::PasswordError;
use fiscalhub_infra::{ExportError, WorkflowError};

pub fn workflow_error_to_response(err: WorkflowError) -> axum::response::Response {
    match err {
        WorkflowError::NotFound { .. } => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        WorkflowError::OwnerResolutionFailed(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "owner_resolution_failed", err.to_string())
        }
        WorkflowError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        WorkflowError::RoleResolutionFailed => {
            json_error(StatusCode::UNAUTHORIZED, "role_resolution_failed", err.to_string())
        }
        WorkflowError::NoRowsUpdated { .. } => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "no_rows_updated", err.to_string())
        }
        WorkflowError::PartialSuccess { terminal, source } => (
            StatusCode::MULTI_STATUS,
            axum::Json(json!({
                "error": "partial_success",
                "message": format!("terminal created but fiscal module activation failed: {source}"),
                "terminal": terminal,
            })),
        )
            .into_response(),
        WorkflowError::Persistence { .. } => {
            tracing::error!(error = %err, "persistence failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", err.to_string())
        }
        WorkflowError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        WorkflowError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        WorkflowError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid username or password")
        }
        WorkflowError::Password(PasswordError::Empty) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", "password must not be empty")
        }
        WorkflowError::Password(e) => {
            tracing::error!(error = %e, "password hashing failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "password_error", "password processing failed")
        }
    }
}

pub fn export_error_to_response(err: ExportError) -> axum::response::Response {
    match err {
        ExportError::Empty | ExportError::TooLarge => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
        }
        err => {
            tracing::error!(error = %err, "export failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "export_error", err.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
