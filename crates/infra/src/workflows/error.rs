use thiserror::Error;

use fiscalhub_auth::PasswordError;
use fiscalhub_core::DomainError;
use fiscalhub_registry::Terminal;

use crate::store::StoreError;

/// Failure of a workflow or CRUD operation.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("no owner is bound to cash register number {0}")]
    OwnerResolutionFailed(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The caller's role could not be determined; never treated as "user".
    #[error("caller role could not be resolved")]
    RoleResolutionFailed,

    #[error("update of {entity} {id} affected no rows")]
    NoRowsUpdated { entity: &'static str, id: i64 },

    /// The terminal was written but the bound fiscal module was not activated.
    #[error("terminal created but fiscal module activation failed: {source}")]
    PartialSuccess {
        terminal: Box<Terminal>,
        #[source]
        source: Box<WorkflowError>,
    },

    #[error("{operation} failed: {source}")]
    Persistence {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl WorkflowError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Wrap any store failure as `Persistence` for `operation`.
    pub fn persistence(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Persistence { operation, source }
    }

    /// Wrap a store failure with the operation that hit it.
    ///
    /// Uniqueness violations surface as `Conflict`; every other store error
    /// becomes `Persistence`.
    pub fn store(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| match source {
            StoreError::Conflict(msg) => Self::Conflict(msg),
            source => Self::Persistence { operation, source },
        }
    }
}

impl From<DomainError> for WorkflowError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::Forbidden(msg) => Self::Forbidden(msg),
        }
    }
}
