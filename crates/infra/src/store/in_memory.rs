use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fiscalhub_core::{FiscalModuleId, TerminalId, UserId};
use fiscalhub_registry::{FiscalModule, NewFiscalModule, NewTerminal, NewUser, Terminal, User};

use super::{FiscalModuleStore, StoreError, TerminalStore, UserStore};

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<UserId, User>,
    modules: BTreeMap<FiscalModuleId, FiscalModule>,
    terminals: BTreeMap<TerminalId, Terminal>,
    last_user_id: i64,
    last_module_id: i64,
    last_terminal_id: i64,
}

impl State {
    fn username_taken(&self, username: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn factory_number_taken(&self, factory_number: &str, except: Option<FiscalModuleId>) -> bool {
        self.modules
            .values()
            .any(|m| m.factory_number == factory_number && Some(m.id) != except)
    }

    fn require_user(&self, id: UserId) -> Result<(), StoreError> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::MissingReference(format!("user {id}")))
        }
    }
}

/// In-memory store for tests/dev.
///
/// A single lock guards all three tables so that cross-table rules (owner
/// lookups, cascading deletes) see a consistent snapshot.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Database("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Database("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut state = self.write()?;
        if state.username_taken(&user.username, None) {
            return Err(StoreError::Conflict(format!("username {} already exists", user.username)));
        }

        state.last_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: UserId::new(state.last_user_id),
            inn: user.inn,
            username: user.username,
            password_hash: user.password_hash,
            company_name: user.company_name,
            is_admin: user.is_admin,
            is_active: user.is_active,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    async fn update(&self, user: &User) -> Result<u64, StoreError> {
        let mut state = self.write()?;
        if !state.users.contains_key(&user.id) {
            return Ok(0);
        }
        if state.username_taken(&user.username, Some(user.id)) {
            return Err(StoreError::Conflict(format!("username {} already exists", user.username)));
        }
        state.users.insert(user.id, user.clone());
        Ok(1)
    }

    async fn delete(&self, id: UserId) -> Result<u64, StoreError> {
        let mut state = self.write()?;
        if state.users.remove(&id).is_none() {
            return Ok(0);
        }
        state.modules.retain(|_, m| m.user_id != id);
        state.terminals.retain(|_, t| t.user_id != id);
        Ok(1)
    }
}

#[async_trait]
impl FiscalModuleStore for InMemoryStore {
    async fn create(&self, module: NewFiscalModule) -> Result<FiscalModule, StoreError> {
        let mut state = self.write()?;
        state.require_user(module.user_id)?;
        if state.factory_number_taken(&module.factory_number, None) {
            return Err(StoreError::Conflict(format!(
                "factory number {} already exists",
                module.factory_number
            )));
        }

        state.last_module_id += 1;
        let now = Utc::now();
        let created = FiscalModule {
            id: FiscalModuleId::new(state.last_module_id),
            fiscal_number: module.fiscal_number,
            factory_number: module.factory_number,
            user_id: module.user_id,
            active: false,
            created_at: now,
            updated_at: now,
        };
        state.modules.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: FiscalModuleId) -> Result<Option<FiscalModule>, StoreError> {
        Ok(self.read()?.modules.get(&id).cloned())
    }

    async fn get_by_factory_number(&self, factory_number: &str) -> Result<Option<FiscalModule>, StoreError> {
        Ok(self
            .read()?
            .modules
            .values()
            .find(|m| m.factory_number == factory_number)
            .cloned())
    }

    async fn get_by_fiscal_number(&self, fiscal_number: &str) -> Result<Option<FiscalModule>, StoreError> {
        Ok(self
            .read()?
            .modules
            .values()
            .find(|m| m.fiscal_number == fiscal_number)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<FiscalModule>, StoreError> {
        Ok(self.read()?.modules.values().cloned().collect())
    }

    async fn update(&self, module: &FiscalModule) -> Result<u64, StoreError> {
        let mut state = self.write()?;
        if !state.modules.contains_key(&module.id) {
            return Ok(0);
        }
        state.require_user(module.user_id)?;
        if state.factory_number_taken(&module.factory_number, Some(module.id)) {
            return Err(StoreError::Conflict(format!(
                "factory number {} already exists",
                module.factory_number
            )));
        }
        if let Some(slot) = state.modules.get_mut(&module.id) {
            *slot = FiscalModule {
                active: slot.active,
                ..module.clone()
            };
        }
        Ok(1)
    }

    async fn activate(&self, id: FiscalModuleId, updated_at: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.write()?;
        let Some(slot) = state.modules.get_mut(&id) else {
            return Ok(0);
        };
        slot.active = true;
        slot.updated_at = updated_at;
        Ok(1)
    }

    async fn delete(&self, id: FiscalModuleId) -> Result<u64, StoreError> {
        Ok(u64::from(self.write()?.modules.remove(&id).is_some()))
    }
}

#[async_trait]
impl TerminalStore for InMemoryStore {
    async fn create(&self, terminal: NewTerminal) -> Result<Terminal, StoreError> {
        let mut state = self.write()?;
        state.require_user(terminal.user_id)?;

        state.last_terminal_id += 1;
        let now = Utc::now();
        let created = Terminal {
            id: TerminalId::new(state.last_terminal_id),
            assembly_number: terminal.assembly_number,
            inn: terminal.inn,
            company_name: terminal.company_name,
            address: terminal.address,
            cash_register_number: terminal.cash_register_number,
            module_number: terminal.module_number,
            last_request_date: terminal.last_request_date,
            database_update_date: terminal.database_update_date,
            active: terminal.active,
            user_id: terminal.user_id,
            free_record_balance: terminal.free_record_balance,
            status_changed_by_admin: terminal.status_changed_by_admin,
            created_at: now,
            updated_at: now,
        };
        state.terminals.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: TerminalId) -> Result<Option<Terminal>, StoreError> {
        Ok(self.read()?.terminals.get(&id).cloned())
    }

    async fn get_by_cash_register_number(&self, number: &str) -> Result<Option<Terminal>, StoreError> {
        Ok(self
            .read()?
            .terminals
            .values()
            .find(|t| t.cash_register_number == number)
            .cloned())
    }

    async fn get_user_id_by_cash_register_number(&self, number: &str) -> Result<Option<UserId>, StoreError> {
        let state = self.read()?;
        Ok(state
            .modules
            .values()
            .find(|m| m.factory_number == number)
            .map(|m| m.user_id)
            .filter(|owner| state.users.contains_key(owner)))
    }

    async fn list(&self) -> Result<Vec<Terminal>, StoreError> {
        Ok(self.read()?.terminals.values().cloned().collect())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Terminal>, StoreError> {
        Ok(self
            .read()?
            .terminals
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update(&self, terminal: &Terminal, loaded_at: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.write()?;
        match state.terminals.get_mut(&terminal.id) {
            Some(slot) if slot.updated_at == loaded_at => {
                *slot = terminal.clone();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn delete(&self, id: TerminalId) -> Result<u64, StoreError> {
        Ok(u64::from(self.write()?.terminals.remove(&id).is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            inn: String::new(),
            username: username.to_string(),
            password_hash: "hash".to_string(),
            company_name: String::new(),
            is_admin: false,
            is_active: true,
        }
    }

    fn new_module(factory_number: &str, owner: UserId) -> NewFiscalModule {
        NewFiscalModule {
            fiscal_number: format!("FN-{factory_number}"),
            factory_number: factory_number.to_string(),
            user_id: owner,
        }
    }

    #[tokio::test]
    async fn usernames_and_factory_numbers_are_unique() {
        let store = InMemoryStore::new();
        let alice = UserStore::create(&store, new_user("alice")).await.unwrap();

        assert!(matches!(
            UserStore::create(&store, new_user("alice")).await,
            Err(StoreError::Conflict(_))
        ));

        FiscalModuleStore::create(&store, new_module("FM-1", alice.id)).await.unwrap();
        assert!(matches!(
            FiscalModuleStore::create(&store, new_module("FM-1", alice.id)).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn module_owner_must_exist() {
        let store = InMemoryStore::new();
        let err = FiscalModuleStore::create(&store, new_module("FM-1", UserId::new(42)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingReference(_)));
    }

    #[tokio::test]
    async fn owner_lookup_goes_through_the_fiscal_module() {
        let store = InMemoryStore::new();
        let alice = UserStore::create(&store, new_user("alice")).await.unwrap();
        FiscalModuleStore::create(&store, new_module("FM-1", alice.id)).await.unwrap();

        assert_eq!(
            store.get_user_id_by_cash_register_number("FM-1").await.unwrap(),
            Some(alice.id)
        );
        assert_eq!(store.get_user_id_by_cash_register_number("FM-2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleting_a_user_cascades_to_owned_records() {
        let store = InMemoryStore::new();
        let alice = UserStore::create(&store, new_user("alice")).await.unwrap();
        let bob = UserStore::create(&store, new_user("bob")).await.unwrap();
        FiscalModuleStore::create(&store, new_module("FM-A", alice.id)).await.unwrap();
        FiscalModuleStore::create(&store, new_module("FM-B", bob.id)).await.unwrap();

        assert_eq!(UserStore::delete(&store, alice.id).await.unwrap(), 1);
        assert_eq!(UserStore::delete(&store, alice.id).await.unwrap(), 0);

        let remaining = FiscalModuleStore::list(&store).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].user_id, bob.id);
    }

    #[tokio::test]
    async fn update_of_missing_row_reports_zero() {
        let store = InMemoryStore::new();
        let alice = UserStore::create(&store, new_user("alice")).await.unwrap();
        let mut ghost = alice.clone();
        ghost.id = UserId::new(99);
        assert_eq!(UserStore::update(&store, &ghost).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn module_update_never_writes_active() {
        let store = InMemoryStore::new();
        let alice = UserStore::create(&store, new_user("alice")).await.unwrap();
        let module = FiscalModuleStore::create(&store, new_module("FM-1", alice.id)).await.unwrap();

        // Snapshot taken while inactive, written back after activation.
        let mut stale = module.clone();
        stale.fiscal_number = "FN-renamed".into();
        assert_eq!(store.activate(module.id, Utc::now()).await.unwrap(), 1);
        assert_eq!(FiscalModuleStore::update(&store, &stale).await.unwrap(), 1);

        let stored = FiscalModuleStore::get_by_id(&store, module.id).await.unwrap().unwrap();
        assert!(stored.active);
        assert_eq!(stored.fiscal_number, "FN-renamed");

        assert_eq!(store.activate(FiscalModuleId::new(99), Utc::now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn terminal_update_requires_the_loaded_version() {
        let store = InMemoryStore::new();
        let alice = UserStore::create(&store, new_user("alice")).await.unwrap();
        let terminal = TerminalStore::create(
            &store,
            NewTerminal {
                assembly_number: "A-1".into(),
                inn: String::new(),
                company_name: String::new(),
                address: String::new(),
                cash_register_number: "FM-1".into(),
                module_number: String::new(),
                last_request_date: None,
                database_update_date: None,
                active: true,
                user_id: alice.id,
                free_record_balance: 0,
                status_changed_by_admin: false,
            },
        )
        .await
        .unwrap();
        let loaded_at = terminal.updated_at;

        let mut first = terminal.clone();
        first.active = false;
        first.status_changed_by_admin = true;
        first.updated_at = loaded_at + chrono::Duration::seconds(1);
        assert_eq!(TerminalStore::update(&store, &first, loaded_at).await.unwrap(), 1);

        let mut stale = terminal.clone();
        stale.address = "overwrite".into();
        stale.updated_at = loaded_at + chrono::Duration::seconds(2);
        assert_eq!(TerminalStore::update(&store, &stale, loaded_at).await.unwrap(), 0);

        let stored = TerminalStore::get_by_id(&store, terminal.id).await.unwrap().unwrap();
        assert_eq!(stored, first);
    }
}
