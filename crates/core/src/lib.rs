//! `fiscalhub-core`: shared domain building blocks.
//!
//! Typed identifiers and the domain error model; no infrastructure concerns.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{FiscalModuleId, TerminalId, UserId};
