//! Entity store boundary.
//!
//! One set of traits, two backends: [`InMemoryStore`] for dev and tests,
//! [`PostgresStore`] for production. Lookups return `Ok(None)` for absent
//! records; `update`/`delete` report the number of rows they touched and leave
//! the interpretation of zero to the caller.

pub mod in_memory;
pub mod postgres;
mod schema;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use fiscalhub_core::{FiscalModuleId, TerminalId, UserId};
use fiscalhub_registry::{FiscalModule, NewFiscalModule, NewTerminal, NewUser, Terminal, User};

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Storage failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique key is already taken (username, factory number).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A referenced record does not exist (e.g. owner of a fiscal module).
    #[error("missing reference: {0}")]
    MissingReference(String),

    /// A write that had to touch a row did not.
    #[error("no rows affected: {0}")]
    NoRowsAffected(String),

    #[error("database error: {0}")]
    Database(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn list(&self) -> Result<Vec<User>, StoreError>;

    async fn update(&self, user: &User) -> Result<u64, StoreError>;

    /// Delete a user together with the fiscal modules and terminals they own.
    async fn delete(&self, id: UserId) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait FiscalModuleStore: Send + Sync {
    async fn create(&self, module: NewFiscalModule) -> Result<FiscalModule, StoreError>;

    async fn get_by_id(&self, id: FiscalModuleId) -> Result<Option<FiscalModule>, StoreError>;

    async fn get_by_factory_number(&self, factory_number: &str) -> Result<Option<FiscalModule>, StoreError>;

    async fn get_by_fiscal_number(&self, fiscal_number: &str) -> Result<Option<FiscalModule>, StoreError>;

    async fn list(&self) -> Result<Vec<FiscalModule>, StoreError>;

    /// Write every field except `active`, which only [`activate`](Self::activate) sets.
    async fn update(&self, module: &FiscalModule) -> Result<u64, StoreError>;

    /// Set `active = true` and `updated_at`, leaving every other column alone.
    async fn activate(&self, id: FiscalModuleId, updated_at: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn delete(&self, id: FiscalModuleId) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait TerminalStore: Send + Sync {
    /// Insert a terminal; id and timestamps are generated by the store.
    async fn create(&self, terminal: NewTerminal) -> Result<Terminal, StoreError>;

    async fn get_by_id(&self, id: TerminalId) -> Result<Option<Terminal>, StoreError>;

    async fn get_by_cash_register_number(&self, number: &str) -> Result<Option<Terminal>, StoreError>;

    /// Resolve the owner of the fiscal module whose factory number equals
    /// `number`, provided that user still exists.
    async fn get_user_id_by_cash_register_number(&self, number: &str) -> Result<Option<UserId>, StoreError>;

    async fn list(&self) -> Result<Vec<Terminal>, StoreError>;

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Terminal>, StoreError>;

    /// Write `terminal` only if the stored row still has `updated_at == loaded_at`.
    ///
    /// Zero rows means the terminal is gone or was changed since it was read.
    async fn update(&self, terminal: &Terminal, loaded_at: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn delete(&self, id: TerminalId) -> Result<u64, StoreError>;
}
