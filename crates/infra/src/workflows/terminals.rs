use std::sync::Arc;

use tracing::instrument;

use fiscalhub_auth::Principal;
use fiscalhub_core::TerminalId;
use fiscalhub_registry::Terminal;

use crate::store::TerminalStore;

use super::WorkflowError;

/// Read and delete operations on terminals.
#[derive(Clone)]
pub struct TerminalDirectory {
    terminals: Arc<dyn TerminalStore>,
}

impl TerminalDirectory {
    pub fn new(terminals: Arc<dyn TerminalStore>) -> Self {
        Self { terminals }
    }

    pub async fn get(&self, id: TerminalId) -> Result<Terminal, WorkflowError> {
        self.terminals
            .get_by_id(id)
            .await
            .map_err(WorkflowError::persistence("get_terminal"))?
            .ok_or_else(|| WorkflowError::not_found("terminal", id))
    }

    /// Administrators see every terminal, everyone else only their own.
    pub async fn list_visible_to(&self, principal: &Principal) -> Result<Vec<Terminal>, WorkflowError> {
        let listed = if principal.is_admin() {
            self.terminals.list().await
        } else {
            self.terminals.list_by_user(principal.user_id).await
        };
        listed.map_err(WorkflowError::persistence("list_terminals"))
    }

    pub async fn find_by_cash_register_number(&self, number: &str) -> Result<Terminal, WorkflowError> {
        self.terminals
            .get_by_cash_register_number(number)
            .await
            .map_err(WorkflowError::persistence("get_terminal_by_cash_register_number"))?
            .ok_or_else(|| WorkflowError::not_found("terminal", number))
    }

    #[instrument(skip(self), fields(terminal_id = %id), err)]
    pub async fn delete(&self, id: TerminalId) -> Result<(), WorkflowError> {
        let rows = self
            .terminals
            .delete(id)
            .await
            .map_err(WorkflowError::persistence("delete_terminal"))?;
        if rows == 0 {
            return Err(WorkflowError::not_found("terminal", id));
        }
        tracing::info!("terminal deleted");
        Ok(())
    }
}
