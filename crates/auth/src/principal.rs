use fiscalhub_core::UserId;

use crate::{CallerRole, JwtClaims};

/// A fully resolved principal for authorization decisions.
///
/// Construction is decoupled from transport: the API derives it from
/// validated claims, tests build it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: CallerRole,
}

impl Principal {
    pub fn new(user_id: UserId, role: CallerRole) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<&JwtClaims> for Principal {
    fn from(claims: &JwtClaims) -> Self {
        Self::new(claims.sub, claims.role())
    }
}
