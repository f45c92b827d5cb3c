use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tracing::instrument;

use fiscalhub_auth::CallerRole;
use fiscalhub_core::TerminalId;
use fiscalhub_registry::{StatusChange, Terminal, TerminalPatch};

use crate::store::TerminalStore;

use super::WorkflowError;

const TERMINAL_UPDATE_SHAPE: &str =
    "UPDATE terminals SET <all mutable columns> WHERE id = $1 AND updated_at = <loaded updated_at>";

/// Stamp for the next write: microsecond precision so it survives a Postgres
/// round trip, and strictly after the version it replaces.
fn next_version(loaded_at: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(6);
    if now > loaded_at {
        now
    } else {
        loaded_at + Duration::microseconds(1)
    }
}

/// Partial update of a terminal with the admin lock on `active`.
#[derive(Clone)]
pub struct TerminalMutation {
    terminals: Arc<dyn TerminalStore>,
}

impl TerminalMutation {
    pub fn new(terminals: Arc<dyn TerminalStore>) -> Self {
        Self { terminals }
    }

    /// Load, patch on behalf of `role`, persist.
    ///
    /// A rejected status change returns `Forbidden` before anything is written.
    /// The write only lands if the row is unchanged since it was loaded;
    /// otherwise the result is `NoRowsUpdated` and the caller should reload.
    #[instrument(skip(self, patch), fields(terminal_id = %id, role = %role), err)]
    pub async fn mutate(
        &self,
        id: TerminalId,
        patch: TerminalPatch,
        role: CallerRole,
    ) -> Result<Terminal, WorkflowError> {
        let mut terminal = self
            .terminals
            .get_by_id(id)
            .await
            .map_err(WorkflowError::persistence("get_terminal"))?
            .ok_or_else(|| WorkflowError::not_found("terminal", id))?;

        let loaded_at = terminal.updated_at;
        let change = terminal.apply_patch(patch, role).map_err(|e| {
            tracing::warn!(error = %e, "status change rejected");
            WorkflowError::from(e)
        })?;

        terminal.updated_at = next_version(loaded_at);
        let rows = self
            .terminals
            .update(&terminal, loaded_at)
            .await
            .map_err(WorkflowError::persistence("update_terminal"))?;

        if rows == 0 {
            tracing::warn!(query = TERMINAL_UPDATE_SHAPE, terminal_id = %id, "terminal update affected no rows");
            return Err(WorkflowError::NoRowsUpdated {
                entity: "terminal",
                id: id.get(),
            });
        }

        if let StatusChange::Changed { active, by_admin } = change {
            tracing::info!(active, by_admin, "terminal status changed");
        }

        Ok(terminal)
    }
}
