//! Registry domain module: users, fiscal modules and terminals.
//!
//! This crate contains the business rules for the three linked resources,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). Orchestration across stores lives in `fiscalhub-infra`.

pub mod dates;
pub mod fiscal_module;
pub mod terminal;
pub mod user;

pub use dates::parse_lenient_timestamp;
pub use fiscal_module::{FiscalModule, FiscalModulePatch, NewFiscalModule};
pub use terminal::{NewTerminal, ProvisionTerminal, StatusChange, Terminal, TerminalPatch};
pub use user::{NewUser, User, UserPatch};
