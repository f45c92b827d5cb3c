use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use fiscalhub_core::{FiscalModuleId, UserId};
use fiscalhub_registry::{FiscalModule, FiscalModulePatch, NewFiscalModule};

use crate::store::{FiscalModuleStore, StoreError, UserStore};

use super::{FiscalModuleActivation, WorkflowError};

/// Administrative CRUD over fiscal modules.
///
/// Updates never touch `active`; [`FiscalModuleRegistry::activate`] delegates
/// to [`FiscalModuleActivation`].
#[derive(Clone)]
pub struct FiscalModuleRegistry {
    modules: Arc<dyn FiscalModuleStore>,
    users: Arc<dyn UserStore>,
    activation: FiscalModuleActivation,
}

impl FiscalModuleRegistry {
    pub fn new(modules: Arc<dyn FiscalModuleStore>, users: Arc<dyn UserStore>) -> Self {
        Self {
            activation: FiscalModuleActivation::new(modules.clone()),
            modules,
            users,
        }
    }

    async fn ensure_owner_exists(&self, owner: UserId) -> Result<(), WorkflowError> {
        self.users
            .get_by_id(owner)
            .await
            .map_err(WorkflowError::persistence("get_user"))?
            .map(|_| ())
            .ok_or_else(|| WorkflowError::not_found("user", owner))
    }

    #[instrument(skip(self, module), fields(factory_number = %module.factory_number, user_id = %module.user_id), err)]
    pub async fn create(&self, module: NewFiscalModule) -> Result<FiscalModule, WorkflowError> {
        module.validate()?;
        self.ensure_owner_exists(module.user_id).await?;

        let owner = module.user_id;
        let created = self.modules.create(module).await.map_err(|e| match e {
            StoreError::MissingReference(_) => WorkflowError::not_found("user", owner),
            e => WorkflowError::store("create_fiscal_module")(e),
        })?;

        tracing::info!(fiscal_module_id = %created.id, "fiscal module created");
        Ok(created)
    }

    pub async fn get(&self, id: FiscalModuleId) -> Result<FiscalModule, WorkflowError> {
        self.modules
            .get_by_id(id)
            .await
            .map_err(WorkflowError::persistence("get_fiscal_module"))?
            .ok_or_else(|| WorkflowError::not_found("fiscal module", id))
    }

    pub async fn get_by_fiscal_number(&self, fiscal_number: &str) -> Result<FiscalModule, WorkflowError> {
        self.modules
            .get_by_fiscal_number(fiscal_number)
            .await
            .map_err(WorkflowError::persistence("get_fiscal_module_by_fiscal_number"))?
            .ok_or_else(|| WorkflowError::not_found("fiscal module", fiscal_number))
    }

    pub async fn list(&self) -> Result<Vec<FiscalModule>, WorkflowError> {
        self.modules
            .list()
            .await
            .map_err(WorkflowError::persistence("list_fiscal_modules"))
    }

    #[instrument(skip(self, patch), fields(fiscal_module_id = %id), err)]
    pub async fn update(&self, id: FiscalModuleId, patch: FiscalModulePatch) -> Result<FiscalModule, WorkflowError> {
        let mut module = self.get(id).await?;
        if let Some(owner) = patch.user_id {
            self.ensure_owner_exists(owner).await?;
        }

        patch.apply_to(&mut module)?;
        module.updated_at = Utc::now();

        let rows = self
            .modules
            .update(&module)
            .await
            .map_err(WorkflowError::store("update_fiscal_module"))?;
        if rows == 0 {
            tracing::warn!(fiscal_module_id = %id, "fiscal module update affected no rows");
            return Err(WorkflowError::NoRowsUpdated {
                entity: "fiscal module",
                id: id.get(),
            });
        }

        // `active` was not written; report what is stored now.
        self.get(id).await
    }

    #[instrument(skip(self), fields(fiscal_module_id = %id), err)]
    pub async fn delete(&self, id: FiscalModuleId) -> Result<(), WorkflowError> {
        let rows = self
            .modules
            .delete(id)
            .await
            .map_err(WorkflowError::persistence("delete_fiscal_module"))?;
        if rows == 0 {
            return Err(WorkflowError::not_found("fiscal module", id));
        }
        Ok(())
    }

    pub async fn activate(&self, id: FiscalModuleId) -> Result<FiscalModule, WorkflowError> {
        self.activation.activate(id).await
    }
}
