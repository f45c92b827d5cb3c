//! Orchestration over the entity stores.
//!
//! Stores are injected as trait objects; nothing here talks to a database or
//! to HTTP directly.

mod activation;
mod error;
mod fiscal_modules;
mod mutation;
mod provisioning;
mod terminals;
mod users;

#[cfg(test)]
mod testing;

pub use activation::FiscalModuleActivation;
pub use error::WorkflowError;
pub use fiscal_modules::FiscalModuleRegistry;
pub use mutation::TerminalMutation;
pub use provisioning::TerminalProvisioning;
pub use terminals::TerminalDirectory;
pub use users::{UserAccounts, UserChanges, UserDraft};
