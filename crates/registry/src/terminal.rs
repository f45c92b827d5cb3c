use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fiscalhub_auth::CallerRole;
use fiscalhub_core::{DomainError, DomainResult, TerminalId, UserId};

use crate::dates::parse_lenient_timestamp;

/// A cash register bound to a fiscal module through its cash-register number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Terminal {
    pub id: TerminalId,
    pub assembly_number: String,
    pub inn: String,
    pub company_name: String,
    pub address: String,
    /// Equals the factory number of the bound fiscal module.
    pub cash_register_number: String,
    pub module_number: String,
    pub last_request_date: Option<DateTime<Utc>>,
    pub database_update_date: Option<DateTime<Utc>>,
    #[serde(rename = "is_active")]
    pub active: bool,
    /// Derived from the fiscal module binding at creation; never client-supplied.
    pub user_id: UserId,
    pub free_record_balance: i64,
    /// Once set, only an administrator may change `active`.
    pub status_changed_by_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client request to provision a terminal.
///
/// Any `user_id` in the payload is ignored; the owner is resolved server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProvisionTerminal {
    pub cash_register_number: String,
    pub assembly_number: String,
    pub inn: String,
    pub company_name: String,
    pub address: String,
    pub module_number: String,
    pub last_request_date: Option<String>,
    pub database_update_date: Option<String>,
    pub free_record_balance: i64,
}

/// A terminal ready to be written: owner resolved, dates parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTerminal {
    pub assembly_number: String,
    pub inn: String,
    pub company_name: String,
    pub address: String,
    pub cash_register_number: String,
    pub module_number: String,
    pub last_request_date: Option<DateTime<Utc>>,
    pub database_update_date: Option<DateTime<Utc>>,
    pub active: bool,
    pub user_id: UserId,
    pub free_record_balance: i64,
    pub status_changed_by_admin: bool,
}

impl NewTerminal {
    /// Build the record for a freshly provisioned terminal: active, not
    /// admin-locked, owned by `owner`.
    pub fn provisioned(request: ProvisionTerminal, owner: UserId) -> Self {
        Self {
            last_request_date: parse_lenient_timestamp(
                "last_request_date",
                request.last_request_date.as_deref(),
            ),
            database_update_date: parse_lenient_timestamp(
                "database_update_date",
                request.database_update_date.as_deref(),
            ),
            assembly_number: request.assembly_number,
            inn: request.inn,
            company_name: request.company_name,
            address: request.address,
            cash_register_number: request.cash_register_number,
            module_number: request.module_number,
            active: true,
            user_id: owner,
            free_record_balance: request.free_record_balance,
            status_changed_by_admin: false,
        }
    }
}

/// Partial update of a terminal.
///
/// Each field is independently optional. `None` leaves the stored value alone;
/// `Some("")` is an explicit empty value. Date strings are parsed leniently, so a
/// present but unparseable date clears the stored timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TerminalPatch {
    pub assembly_number: Option<String>,
    pub inn: Option<String>,
    pub company_name: Option<String>,
    pub address: Option<String>,
    pub cash_register_number: Option<String>,
    pub module_number: Option<String>,
    pub last_request_date: Option<String>,
    pub database_update_date: Option<String>,
    pub free_record_balance: Option<i64>,
    #[serde(rename = "is_active")]
    pub active: Option<bool>,
}

/// What a patch did to the `active` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Unchanged,
    Changed { active: bool, by_admin: bool },
}

impl Terminal {
    /// Check whether `role` may touch `active` on this terminal.
    pub fn ensure_status_change_allowed(&self, role: CallerRole) -> DomainResult<()> {
        if self.status_changed_by_admin && !role.is_admin() {
            return Err(DomainError::forbidden(
                "terminal status was set by an administrator",
            ));
        }
        Ok(())
    }

    /// Apply `patch` on behalf of a caller with `role`.
    ///
    /// The status guard runs before anything is written, so on `Forbidden`
    /// the terminal is left exactly as it was.
    pub fn apply_patch(&mut self, patch: TerminalPatch, role: CallerRole) -> DomainResult<StatusChange> {
        if patch.active.is_some() {
            self.ensure_status_change_allowed(role)?;
        }

        if let Some(v) = patch.assembly_number {
            self.assembly_number = v;
        }
        if let Some(v) = patch.inn {
            self.inn = v;
        }
        if let Some(v) = patch.company_name {
            self.company_name = v;
        }
        if let Some(v) = patch.address {
            self.address = v;
        }
        if let Some(v) = patch.cash_register_number {
            self.cash_register_number = v;
        }
        if let Some(v) = patch.module_number {
            self.module_number = v;
        }
        if let Some(v) = patch.last_request_date {
            self.last_request_date = parse_lenient_timestamp("last_request_date", Some(&v));
        }
        if let Some(v) = patch.database_update_date {
            self.database_update_date = parse_lenient_timestamp("database_update_date", Some(&v));
        }
        if let Some(v) = patch.free_record_balance {
            self.free_record_balance = v;
        }

        match patch.active {
            Some(active) if active != self.active => {
                self.active = active;
                self.status_changed_by_admin = role.is_admin();
                Ok(StatusChange::Changed {
                    active,
                    by_admin: role.is_admin(),
                })
            }
            _ => Ok(StatusChange::Unchanged),
        }
    }
}
