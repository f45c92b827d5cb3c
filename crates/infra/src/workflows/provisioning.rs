use std::sync::Arc;

use tracing::instrument;

use fiscalhub_registry::{NewTerminal, ProvisionTerminal, Terminal};

use crate::store::{FiscalModuleStore, TerminalStore};

use super::{FiscalModuleActivation, WorkflowError};

/// Creates terminals against a factory-registered fiscal module.
///
/// Flow:
///
/// ```text
/// cash_register_number
///   -> fiscal module by factory number   (absent: NotFound)
///   -> owning user via the module        (absent: OwnerResolutionFailed)
///   -> insert terminal (active, unlocked)
///   -> activate fiscal module            (failure: PartialSuccess)
/// ```
///
/// The terminal insert and the activation are separate writes. A failed
/// activation leaves the terminal in place; retrying the activation is safe.
#[derive(Clone)]
pub struct TerminalProvisioning {
    modules: Arc<dyn FiscalModuleStore>,
    terminals: Arc<dyn TerminalStore>,
    activation: FiscalModuleActivation,
}

impl TerminalProvisioning {
    pub fn new(modules: Arc<dyn FiscalModuleStore>, terminals: Arc<dyn TerminalStore>) -> Self {
        Self {
            activation: FiscalModuleActivation::new(modules.clone()),
            modules,
            terminals,
        }
    }

    #[instrument(
        skip(self, request),
        fields(cash_register_number = %request.cash_register_number),
        err
    )]
    pub async fn provision(&self, request: ProvisionTerminal) -> Result<Terminal, WorkflowError> {
        let key = request.cash_register_number.clone();

        let module = self
            .modules
            .get_by_factory_number(&key)
            .await
            .map_err(WorkflowError::persistence("get_fiscal_module_by_factory_number"))?
            .ok_or_else(|| WorkflowError::not_found("fiscal module", &key))?;

        let owner = self
            .terminals
            .get_user_id_by_cash_register_number(&key)
            .await
            .map_err(WorkflowError::persistence("get_user_id_by_cash_register_number"))?
            .ok_or_else(|| WorkflowError::OwnerResolutionFailed(key.clone()))?;

        let terminal = self
            .terminals
            .create(NewTerminal::provisioned(request, owner))
            .await
            .map_err(WorkflowError::persistence("create_terminal"))?;

        tracing::info!(terminal_id = %terminal.id, user_id = %owner, "terminal provisioned");

        match self.activation.activate(module.id).await {
            Ok(_) => Ok(terminal),
            Err(source) => {
                tracing::error!(
                    terminal_id = %terminal.id,
                    fiscal_module_id = %module.id,
                    error = %source,
                    "terminal created but fiscal module activation failed"
                );
                Err(WorkflowError::PartialSuccess {
                    terminal: Box::new(terminal),
                    source: Box::new(source),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::testing::{request, seed_module, seed_user, FailingModuleUpdates};
    use crate::InMemoryStore;

    fn provisioning(store: &Arc<InMemoryStore>) -> TerminalProvisioning {
        TerminalProvisioning::new(store.clone(), store.clone())
    }

    #[tokio::test]
    async fn provisioning_binds_owner_and_activates_module() {
        let store = Arc::new(InMemoryStore::new());
        let owner = seed_user(&store, "owner", false).await;
        let module = seed_module(&store, "FM-1", owner.id).await;
        assert!(!module.active);

        let mut req = request("FM-1");
        req.last_request_date = Some("2024-05-01T10:00:00Z".into());
        let terminal = provisioning(&store).provision(req).await.unwrap();

        assert_eq!(terminal.user_id, owner.id);
        assert!(terminal.active);
        assert!(!terminal.status_changed_by_admin);
        assert!(terminal.last_request_date.is_some());

        let module = FiscalModuleStore::get_by_id(store.as_ref(), module.id).await.unwrap().unwrap();
        assert!(module.active);
    }

    #[tokio::test]
    async fn unknown_cash_register_number_writes_nothing() {
        let store = Arc::new(InMemoryStore::new());
        seed_user(&store, "owner", false).await;

        let err = provisioning(&store).provision(request("UNKNOWN")).await.unwrap_err();

        assert!(matches!(err, WorkflowError::NotFound { entity: "fiscal module", .. }));
        assert!(TerminalStore::list(store.as_ref()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_owner_binding_fails_without_writing() {
        let store = Arc::new(InMemoryStore::new());
        let owner = seed_user(&store, "owner", false).await;
        seed_module(&store, "FM-1", owner.id).await;

        // The terminal side has no module-to-user binding for FM-1.
        let unbound = Arc::new(InMemoryStore::new());
        let workflow = TerminalProvisioning::new(store.clone(), unbound.clone());
        let err = workflow.provision(request("FM-1")).await.unwrap_err();

        assert!(matches!(err, WorkflowError::OwnerResolutionFailed(key) if key == "FM-1"));
        assert!(TerminalStore::list(unbound.as_ref()).await.unwrap().is_empty());
        assert!(TerminalStore::list(store.as_ref()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn caller_supplied_owner_is_ignored() {
        let store = Arc::new(InMemoryStore::new());
        let owner = seed_user(&store, "owner", false).await;
        let intruder = seed_user(&store, "intruder", false).await;
        seed_module(&store, "FM-1", owner.id).await;

        let req: ProvisionTerminal = serde_json::from_value(serde_json::json!({
            "cash_register_number": "FM-1",
            "user_id": intruder.id,
        }))
        .unwrap();
        let terminal = provisioning(&store).provision(req).await.unwrap();

        assert_eq!(terminal.user_id, owner.id);
        assert_ne!(terminal.user_id, intruder.id);
    }

    #[tokio::test]
    async fn failed_activation_returns_partial_success_with_the_terminal() {
        let store = Arc::new(InMemoryStore::new());
        let owner = seed_user(&store, "owner", false).await;
        let module = seed_module(&store, "FM-1", owner.id).await;

        let modules = Arc::new(FailingModuleUpdates::database_error(store.clone()));
        let workflow = TerminalProvisioning::new(modules, store.clone());
        let err = workflow.provision(request("FM-1")).await.unwrap_err();

        let WorkflowError::PartialSuccess { terminal, source } = err else {
            panic!("expected partial success, got {err:?}");
        };
        assert_eq!(terminal.user_id, owner.id);
        assert!(matches!(*source, WorkflowError::Persistence { .. }));

        let stored = TerminalStore::get_by_id(store.as_ref(), terminal.id).await.unwrap();
        assert_eq!(stored.as_ref(), Some(terminal.as_ref()));
        let module = FiscalModuleStore::get_by_id(store.as_ref(), module.id).await.unwrap().unwrap();
        assert!(!module.active);

        // Retrying activation later completes the pair.
        FiscalModuleActivation::new(store.clone()).activate(module.id).await.unwrap();
        let module = FiscalModuleStore::get_by_id(store.as_ref(), module.id).await.unwrap().unwrap();
        assert!(module.active);
    }
}
