//! `fiscalhub-auth`: authentication/authorization boundary.
//!
//! This crate is decoupled from HTTP and storage: it knows how to
//! mint and validate tokens, hash passwords and answer "is this caller an
//! administrator", nothing more.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, require_admin, require_self_or_admin};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator, TokenError};
pub use password::{PasswordError, hash_password, verify_password};
pub use principal::Principal;
pub use roles::CallerRole;
