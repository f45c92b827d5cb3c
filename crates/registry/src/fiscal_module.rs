use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fiscalhub_core::{DomainError, DomainResult, FiscalModuleId, UserId};

/// A fiscal storage device registered to a user.
///
/// `active` only ever moves from `false` to `true`, through [`FiscalModule::activate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiscalModule {
    pub id: FiscalModuleId,
    pub fiscal_number: String,
    /// Unique; terminals reference it as their cash-register number.
    pub factory_number: String,
    pub user_id: UserId,
    #[serde(rename = "is_active")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FiscalModule {
    /// Mark the module active. Returns `false` when it already was, so callers
    /// can skip the write.
    pub fn activate(&mut self) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewFiscalModule {
    #[serde(default)]
    pub fiscal_number: String,
    pub factory_number: String,
    pub user_id: UserId,
}

impl NewFiscalModule {
    pub fn validate(&self) -> DomainResult<()> {
        if self.factory_number.trim().is_empty() {
            return Err(DomainError::validation("factory_number must not be empty"));
        }
        Ok(())
    }
}

/// Partial update. There is no `active` field: activation has its own path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FiscalModulePatch {
    pub fiscal_number: Option<String>,
    pub factory_number: Option<String>,
    pub user_id: Option<UserId>,
}

impl FiscalModulePatch {
    pub fn apply_to(self, module: &mut FiscalModule) -> DomainResult<()> {
        if let Some(v) = &self.factory_number {
            if v.trim().is_empty() {
                return Err(DomainError::validation("factory_number must not be empty"));
            }
        }

        if let Some(v) = self.fiscal_number {
            module.fiscal_number = v;
        }
        if let Some(v) = self.factory_number {
            module.factory_number = v;
        }
        if let Some(v) = self.user_id {
            module.user_id = v;
        }
        Ok(())
    }
}
