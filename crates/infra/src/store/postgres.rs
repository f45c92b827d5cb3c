//! Postgres-backed entity store.
//!
//! ## Error mapping
//!
//! | SQLx error | Postgres code | `StoreError` |
//! |------------|---------------|--------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `MissingReference` |
//! | anything else | | `Database` |
//!
//! Every message carries the name of the failing operation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use fiscalhub_core::{FiscalModuleId, TerminalId, UserId};
use fiscalhub_registry::{FiscalModule, NewFiscalModule, NewTerminal, NewUser, Terminal, User};

use super::schema;
use super::{FiscalModuleStore, StoreError, TerminalStore, UserStore};

const USER_COLUMNS: &str =
    "id, inn, username, password, company_name, is_admin, is_active, created_at, updated_at";

const MODULE_COLUMNS: &str =
    "id, fiscal_number, factory_number, user_id, is_active, created_at, updated_at";

const TERMINAL_COLUMNS: &str = "id, assembly_number, inn, company_name, address, cash_register_number, \
     module_number, last_request_date, database_update_date, is_active, user_id, free_record_balance, \
     status_changed_by_admin, created_at, updated_at";

/// Postgres implementation of all three store traits over one pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for &(name, ddl) in schema::STATEMENTS {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error(name, e))?;
            tracing::debug!(object = name, "schema object ensured");
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, user), fields(username = %user.username), err)]
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (inn, username, password, company_name, is_admin, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.inn)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.company_name)
        .bind(user.is_admin)
        .bind(user.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;

        user_from_row(&row).map_err(|e| map_sqlx_error("create_user", e))
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .and_then(|row| row.as_ref().map(user_from_row).transpose())
            .map_err(|e| map_sqlx_error("get_user_by_id", e))
    }

    #[instrument(skip(self), err)]
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .and_then(|row| row.as_ref().map(user_from_row).transpose())
            .map_err(|e| map_sqlx_error("get_user_by_username", e))
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .and_then(|rows| rows.iter().map(user_from_row).collect())
            .map_err(|e| map_sqlx_error("list_users", e))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update(&self, user: &User) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET inn = $2, username = $3, password = $4, company_name = $5,
                is_admin = $6, is_active = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(user.id.get())
        .bind(&user.inn)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.company_name)
        .bind(user.is_admin)
        .bind(user.is_active)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;

        Ok(result.rows_affected())
    }

    /// Owned fiscal modules and terminals go with the user via `ON DELETE CASCADE`.
    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn delete(&self, id: UserId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl FiscalModuleStore for PostgresStore {
    #[instrument(skip(self, module), fields(factory_number = %module.factory_number), err)]
    async fn create(&self, module: NewFiscalModule) -> Result<FiscalModule, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO fiscal_modules (fiscal_number, factory_number, user_id, is_active)
            VALUES ($1, $2, $3, FALSE)
            RETURNING {MODULE_COLUMNS}
            "#
        ))
        .bind(&module.fiscal_number)
        .bind(&module.factory_number)
        .bind(module.user_id.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_fiscal_module", e))?;

        module_from_row(&row).map_err(|e| map_sqlx_error("create_fiscal_module", e))
    }

    #[instrument(skip(self), fields(fiscal_module_id = %id), err)]
    async fn get_by_id(&self, id: FiscalModuleId) -> Result<Option<FiscalModule>, StoreError> {
        sqlx::query(&format!("SELECT {MODULE_COLUMNS} FROM fiscal_modules WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .and_then(|row| row.as_ref().map(module_from_row).transpose())
            .map_err(|e| map_sqlx_error("get_fiscal_module_by_id", e))
    }

    #[instrument(skip(self), err)]
    async fn get_by_factory_number(&self, factory_number: &str) -> Result<Option<FiscalModule>, StoreError> {
        sqlx::query(&format!(
            "SELECT {MODULE_COLUMNS} FROM fiscal_modules WHERE factory_number = $1"
        ))
        .bind(factory_number)
        .fetch_optional(&self.pool)
        .await
        .and_then(|row| row.as_ref().map(module_from_row).transpose())
        .map_err(|e| map_sqlx_error("get_fiscal_module_by_factory_number", e))
    }

    #[instrument(skip(self), err)]
    async fn get_by_fiscal_number(&self, fiscal_number: &str) -> Result<Option<FiscalModule>, StoreError> {
        sqlx::query(&format!(
            "SELECT {MODULE_COLUMNS} FROM fiscal_modules WHERE fiscal_number = $1 ORDER BY id LIMIT 1"
        ))
        .bind(fiscal_number)
        .fetch_optional(&self.pool)
        .await
        .and_then(|row| row.as_ref().map(module_from_row).transpose())
        .map_err(|e| map_sqlx_error("get_fiscal_module_by_fiscal_number", e))
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<FiscalModule>, StoreError> {
        sqlx::query(&format!("SELECT {MODULE_COLUMNS} FROM fiscal_modules ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .and_then(|rows| rows.iter().map(module_from_row).collect())
            .map_err(|e| map_sqlx_error("list_fiscal_modules", e))
    }

    #[instrument(skip(self, module), fields(fiscal_module_id = %module.id), err)]
    async fn update(&self, module: &FiscalModule) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE fiscal_modules
            SET fiscal_number = $2, factory_number = $3, user_id = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(module.id.get())
        .bind(&module.fiscal_number)
        .bind(&module.factory_number)
        .bind(module.user_id.get())
        .bind(module.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_fiscal_module", e))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(fiscal_module_id = %id), err)]
    async fn activate(&self, id: FiscalModuleId, updated_at: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE fiscal_modules SET is_active = TRUE, updated_at = $2 WHERE id = $1")
            .bind(id.get())
            .bind(updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("activate_fiscal_module", e))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(fiscal_module_id = %id), err)]
    async fn delete(&self, id: FiscalModuleId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM fiscal_modules WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_fiscal_module", e))?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TerminalStore for PostgresStore {
    #[instrument(
        skip(self, terminal),
        fields(cash_register_number = %terminal.cash_register_number, user_id = %terminal.user_id),
        err
    )]
    async fn create(&self, terminal: NewTerminal) -> Result<Terminal, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO terminals (
                assembly_number, inn, company_name, address, cash_register_number, module_number,
                last_request_date, database_update_date, is_active, user_id, free_record_balance,
                status_changed_by_admin
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {TERMINAL_COLUMNS}
            "#
        ))
        .bind(&terminal.assembly_number)
        .bind(&terminal.inn)
        .bind(&terminal.company_name)
        .bind(&terminal.address)
        .bind(&terminal.cash_register_number)
        .bind(&terminal.module_number)
        .bind(terminal.last_request_date)
        .bind(terminal.database_update_date)
        .bind(terminal.active)
        .bind(terminal.user_id.get())
        .bind(terminal.free_record_balance)
        .bind(terminal.status_changed_by_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_terminal", e))?;

        terminal_from_row(&row).map_err(|e| map_sqlx_error("create_terminal", e))
    }

    #[instrument(skip(self), fields(terminal_id = %id), err)]
    async fn get_by_id(&self, id: TerminalId) -> Result<Option<Terminal>, StoreError> {
        sqlx::query(&format!("SELECT {TERMINAL_COLUMNS} FROM terminals WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .and_then(|row| row.as_ref().map(terminal_from_row).transpose())
            .map_err(|e| map_sqlx_error("get_terminal_by_id", e))
    }

    #[instrument(skip(self), err)]
    async fn get_by_cash_register_number(&self, number: &str) -> Result<Option<Terminal>, StoreError> {
        sqlx::query(&format!(
            "SELECT {TERMINAL_COLUMNS} FROM terminals WHERE cash_register_number = $1 ORDER BY id LIMIT 1"
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .and_then(|row| row.as_ref().map(terminal_from_row).transpose())
        .map_err(|e| map_sqlx_error("get_terminal_by_cash_register_number", e))
    }

    #[instrument(skip(self), err)]
    async fn get_user_id_by_cash_register_number(&self, number: &str) -> Result<Option<UserId>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT u.id AS user_id
            FROM fiscal_modules fm
            JOIN users u ON u.id = fm.user_id
            WHERE fm.factory_number = $1
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_user_id_by_cash_register_number", e))?;

        row.map(|r| r.try_get::<i64, _>("user_id").map(UserId::new))
            .transpose()
            .map_err(|e| map_sqlx_error("get_user_id_by_cash_register_number", e))
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Terminal>, StoreError> {
        sqlx::query(&format!("SELECT {TERMINAL_COLUMNS} FROM terminals ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .and_then(|rows| rows.iter().map(terminal_from_row).collect())
            .map_err(|e| map_sqlx_error("list_terminals", e))
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Terminal>, StoreError> {
        sqlx::query(&format!(
            "SELECT {TERMINAL_COLUMNS} FROM terminals WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await
        .and_then(|rows| rows.iter().map(terminal_from_row).collect())
        .map_err(|e| map_sqlx_error("list_terminals_by_user", e))
    }

    #[instrument(skip(self, terminal), fields(terminal_id = %terminal.id), err)]
    async fn update(&self, terminal: &Terminal, loaded_at: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE terminals
            SET assembly_number = $2, inn = $3, company_name = $4, address = $5,
                cash_register_number = $6, module_number = $7, last_request_date = $8,
                database_update_date = $9, is_active = $10, free_record_balance = $11,
                status_changed_by_admin = $12, updated_at = $13
            WHERE id = $1 AND updated_at = $14
            "#,
        )
        .bind(terminal.id.get())
        .bind(&terminal.assembly_number)
        .bind(&terminal.inn)
        .bind(&terminal.company_name)
        .bind(&terminal.address)
        .bind(&terminal.cash_register_number)
        .bind(&terminal.module_number)
        .bind(terminal.last_request_date)
        .bind(terminal.database_update_date)
        .bind(terminal.active)
        .bind(terminal.free_record_balance)
        .bind(terminal.status_changed_by_admin)
        .bind(terminal.updated_at)
        .bind(loaded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_terminal", e))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(terminal_id = %id), err)]
    async fn delete(&self, id: TerminalId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM terminals WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_terminal", e))?;

        Ok(result.rows_affected())
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: UserId::new(row.try_get("id")?),
        inn: row.try_get("inn")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password")?,
        company_name: row.try_get("company_name")?,
        is_admin: row.try_get("is_admin")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn module_from_row(row: &PgRow) -> Result<FiscalModule, sqlx::Error> {
    Ok(FiscalModule {
        id: FiscalModuleId::new(row.try_get("id")?),
        fiscal_number: row.try_get("fiscal_number")?,
        factory_number: row.try_get("factory_number")?,
        user_id: UserId::new(row.try_get("user_id")?),
        active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn terminal_from_row(row: &PgRow) -> Result<Terminal, sqlx::Error> {
    Ok(Terminal {
        id: TerminalId::new(row.try_get("id")?),
        assembly_number: row.try_get("assembly_number")?,
        inn: row.try_get("inn")?,
        company_name: row.try_get("company_name")?,
        address: row.try_get("address")?,
        cash_register_number: row.try_get("cash_register_number")?,
        module_number: row.try_get("module_number")?,
        last_request_date: row.try_get("last_request_date")?,
        database_update_date: row.try_get("database_update_date")?,
        active: row.try_get("is_active")?,
        user_id: UserId::new(row.try_get("user_id")?),
        free_record_balance: row.try_get("free_record_balance")?,
        status_changed_by_admin: row.try_get("status_changed_by_admin")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Map SQLx errors to `StoreError`, keeping the operation name in the message.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::MissingReference(msg),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}
