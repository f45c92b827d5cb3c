use thiserror::Error;

use fiscalhub_core::UserId;

use crate::Principal;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: administrator role required")]
    AdminRequired,

    #[error("forbidden: resource belongs to another user")]
    NotOwner,
}

/// Require the administrator role.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn require_admin(principal: &Principal) -> Result<(), AuthzError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired)
    }
}

/// Allow administrators, or the owner of the resource.
pub fn require_self_or_admin(principal: &Principal, owner: UserId) -> Result<(), AuthzError> {
    if principal.is_admin() || principal.user_id == owner {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}
