//! Fixtures and failure-injecting store wrappers for workflow tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fiscalhub_core::{FiscalModuleId, TerminalId, UserId};
use fiscalhub_registry::{
    FiscalModule, NewFiscalModule, NewTerminal, NewUser, ProvisionTerminal, Terminal, User,
};

use crate::store::{FiscalModuleStore, InMemoryStore, StoreError, TerminalStore, UserStore};

pub(crate) async fn seed_user(store: &InMemoryStore, username: &str, is_admin: bool) -> User {
    UserStore::create(
        store,
        NewUser {
            inn: "7700000000".into(),
            username: username.into(),
            password_hash: "$argon2id$fixture".into(),
            company_name: "Acme".into(),
            is_admin,
            is_active: true,
        },
    )
    .await
    .unwrap()
}

pub(crate) async fn seed_module(store: &InMemoryStore, factory_number: &str, owner: UserId) -> FiscalModule {
    FiscalModuleStore::create(
        store,
        NewFiscalModule {
            fiscal_number: format!("FN-{factory_number}"),
            factory_number: factory_number.into(),
            user_id: owner,
        },
    )
    .await
    .unwrap()
}

pub(crate) fn request(cash_register_number: &str) -> ProvisionTerminal {
    ProvisionTerminal {
        cash_register_number: cash_register_number.into(),
        assembly_number: "A-1".into(),
        inn: "7700000000".into(),
        company_name: "Acme".into(),
        address: "Main st. 1".into(),
        module_number: "M-1".into(),
        free_record_balance: 100,
        ..Default::default()
    }
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    ZeroRows,
    DatabaseError,
}

impl Failure {
    fn outcome(self) -> Result<u64, StoreError> {
        match self {
            Self::ZeroRows => Ok(0),
            Self::DatabaseError => Err(StoreError::Database("injected failure".into())),
        }
    }
}

/// Delegates to an in-memory store but fails every fiscal module write.
pub(crate) struct FailingModuleUpdates {
    inner: Arc<InMemoryStore>,
    failure: Failure,
}

impl FailingModuleUpdates {
    pub(crate) fn zero_rows(inner: Arc<InMemoryStore>) -> Self {
        Self { inner, failure: Failure::ZeroRows }
    }

    pub(crate) fn database_error(inner: Arc<InMemoryStore>) -> Self {
        Self { inner, failure: Failure::DatabaseError }
    }
}

#[async_trait]
impl FiscalModuleStore for FailingModuleUpdates {
    async fn create(&self, module: NewFiscalModule) -> Result<FiscalModule, StoreError> {
        FiscalModuleStore::create(self.inner.as_ref(), module).await
    }

    async fn get_by_id(&self, id: FiscalModuleId) -> Result<Option<FiscalModule>, StoreError> {
        FiscalModuleStore::get_by_id(self.inner.as_ref(), id).await
    }

    async fn get_by_factory_number(&self, factory_number: &str) -> Result<Option<FiscalModule>, StoreError> {
        self.inner.get_by_factory_number(factory_number).await
    }

    async fn get_by_fiscal_number(&self, fiscal_number: &str) -> Result<Option<FiscalModule>, StoreError> {
        self.inner.get_by_fiscal_number(fiscal_number).await
    }

    async fn list(&self) -> Result<Vec<FiscalModule>, StoreError> {
        FiscalModuleStore::list(self.inner.as_ref()).await
    }

    async fn update(&self, _module: &FiscalModule) -> Result<u64, StoreError> {
        self.failure.outcome()
    }

    async fn activate(&self, _id: FiscalModuleId, _updated_at: DateTime<Utc>) -> Result<u64, StoreError> {
        self.failure.outcome()
    }

    async fn delete(&self, id: FiscalModuleId) -> Result<u64, StoreError> {
        FiscalModuleStore::delete(self.inner.as_ref(), id).await
    }
}

/// Delegates to an in-memory store but fails every terminal update.
pub(crate) struct FailingTerminalUpdates {
    inner: Arc<InMemoryStore>,
    failure: Failure,
}

impl FailingTerminalUpdates {
    pub(crate) fn zero_rows(inner: Arc<InMemoryStore>) -> Self {
        Self { inner, failure: Failure::ZeroRows }
    }

    pub(crate) fn database_error(inner: Arc<InMemoryStore>) -> Self {
        Self { inner, failure: Failure::DatabaseError }
    }
}

#[async_trait]
impl TerminalStore for FailingTerminalUpdates {
    async fn create(&self, terminal: NewTerminal) -> Result<Terminal, StoreError> {
        TerminalStore::create(self.inner.as_ref(), terminal).await
    }

    async fn get_by_id(&self, id: TerminalId) -> Result<Option<Terminal>, StoreError> {
        TerminalStore::get_by_id(self.inner.as_ref(), id).await
    }

    async fn get_by_cash_register_number(&self, number: &str) -> Result<Option<Terminal>, StoreError> {
        self.inner.get_by_cash_register_number(number).await
    }

    async fn get_user_id_by_cash_register_number(&self, number: &str) -> Result<Option<UserId>, StoreError> {
        self.inner.get_user_id_by_cash_register_number(number).await
    }

    async fn list(&self) -> Result<Vec<Terminal>, StoreError> {
        TerminalStore::list(self.inner.as_ref()).await
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Terminal>, StoreError> {
        self.inner.list_by_user(user_id).await
    }

    async fn update(&self, _terminal: &Terminal, _loaded_at: DateTime<Utc>) -> Result<u64, StoreError> {
        self.failure.outcome()
    }

    async fn delete(&self, id: TerminalId) -> Result<u64, StoreError> {
        TerminalStore::delete(self.inner.as_ref(), id).await
    }
}
