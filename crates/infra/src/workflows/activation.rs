use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use fiscalhub_core::FiscalModuleId;
use fiscalhub_registry::FiscalModule;

use crate::store::{FiscalModuleStore, StoreError};

use super::WorkflowError;

/// Idempotent activation of a fiscal module.
///
/// This is the only path that flips `active`; there is no deactivation.
#[derive(Clone)]
pub struct FiscalModuleActivation {
    modules: Arc<dyn FiscalModuleStore>,
}

impl FiscalModuleActivation {
    pub fn new(modules: Arc<dyn FiscalModuleStore>) -> Self {
        Self { modules }
    }

    #[instrument(skip(self), fields(fiscal_module_id = %id), err)]
    pub async fn activate(&self, id: FiscalModuleId) -> Result<FiscalModule, WorkflowError> {
        let mut module = self
            .modules
            .get_by_id(id)
            .await
            .map_err(WorkflowError::persistence("get_fiscal_module"))?
            .ok_or_else(|| WorkflowError::not_found("fiscal module", id))?;

        if !module.activate() {
            tracing::debug!("fiscal module already active; nothing to write");
            return Ok(module);
        }

        module.updated_at = Utc::now();
        let rows = self
            .modules
            .activate(id, module.updated_at)
            .await
            .map_err(WorkflowError::persistence("activate_fiscal_module"))?;

        if rows == 0 {
            return Err(WorkflowError::Persistence {
                operation: "activate_fiscal_module",
                source: StoreError::NoRowsAffected(format!("fiscal module {id}")),
            });
        }

        tracing::info!(factory_number = %module.factory_number, "fiscal module activated");
        Ok(module)
    }
}
