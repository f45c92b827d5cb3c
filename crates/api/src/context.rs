use axum::http::request::Parts;
use axum::response::Response;

use fiscalhub_auth::{CallerRole, Principal};
use fiscalhub_core::UserId;
use fiscalhub_infra::WorkflowError;

use crate::app::errors;

/// Principal context for a request (authenticated user + role).
///
/// Inserted by the auth middleware. Extracting it from a request that never
/// went through the middleware fails closed with 401.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    role: CallerRole,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, role: CallerRole) -> Self {
        Self { user_id, role }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn role(&self) -> CallerRole {
        self.role
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.user_id, self.role)
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for PrincipalContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<PrincipalContext>()
            .copied()
            .ok_or_else(|| errors::workflow_error_to_response(WorkflowError::RoleResolutionFailed))
    }
}
