use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use fiscalhub_auth::{hash_password, verify_password};
use fiscalhub_core::UserId;
use fiscalhub_registry::{NewUser, User, UserPatch};

use crate::store::UserStore;

use super::WorkflowError;

/// Account creation input; the password is plain text until hashed here.
#[derive(Clone, Deserialize)]
pub struct UserDraft {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub inn: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl core::fmt::Debug for UserDraft {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserDraft")
            .field("username", &self.username)
            .field("is_admin", &self.is_admin)
            .finish_non_exhaustive()
    }
}

/// Partial account update; a present password is re-hashed.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserChanges {
    pub inn: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub company_name: Option<String>,
    pub is_admin: Option<bool>,
    pub is_active: Option<bool>,
}

impl core::fmt::Debug for UserChanges {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserChanges")
            .field("username", &self.username)
            .field("password_changed", &self.password.is_some())
            .field("is_admin", &self.is_admin)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

/// Accounts: registration, administration and credential checks.
#[derive(Clone)]
pub struct UserAccounts {
    users: Arc<dyn UserStore>,
}

impl UserAccounts {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Self-service registration: always a regular, active account.
    pub async fn register(&self, draft: UserDraft) -> Result<User, WorkflowError> {
        self.create(UserDraft {
            is_admin: false,
            ..draft
        })
        .await
    }

    #[instrument(skip(self, draft), fields(username = %draft.username, is_admin = draft.is_admin), err)]
    pub async fn create(&self, draft: UserDraft) -> Result<User, WorkflowError> {
        let new_user = NewUser {
            password_hash: hash_password(&draft.password)?,
            inn: draft.inn,
            username: draft.username,
            company_name: draft.company_name,
            is_admin: draft.is_admin,
            is_active: true,
        };
        new_user.validate()?;

        let user = self
            .users
            .create(new_user)
            .await
            .map_err(WorkflowError::store("create_user"))?;

        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Create the administrator account `username` unless that name is taken.
    ///
    /// Returns `true` when an account was created.
    #[instrument(skip(self, password), err)]
    pub async fn ensure_admin(&self, username: &str, password: &str) -> Result<bool, WorkflowError> {
        let existing = self
            .users
            .get_by_username(username)
            .await
            .map_err(WorkflowError::persistence("get_user_by_username"))?;
        if existing.is_some() {
            return Ok(false);
        }

        self.create(UserDraft {
            username: username.to_string(),
            password: password.to_string(),
            inn: String::new(),
            company_name: String::new(),
            is_admin: true,
        })
        .await?;
        Ok(true)
    }

    /// Check credentials. Every failure is `InvalidCredentials`, whatever the cause.
    #[instrument(skip(self, password), err)]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, WorkflowError> {
        let Some(user) = self
            .users
            .get_by_username(username)
            .await
            .map_err(WorkflowError::persistence("get_user_by_username"))?
        else {
            tracing::debug!("unknown username");
            return Err(WorkflowError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "password mismatch");
            return Err(WorkflowError::InvalidCredentials);
        }
        if !user.is_active {
            tracing::debug!(user_id = %user.id, "inactive account");
            return Err(WorkflowError::InvalidCredentials);
        }

        Ok(user)
    }

    pub async fn get(&self, id: UserId) -> Result<User, WorkflowError> {
        self.users
            .get_by_id(id)
            .await
            .map_err(WorkflowError::persistence("get_user"))?
            .ok_or_else(|| WorkflowError::not_found("user", id))
    }

    pub async fn list(&self) -> Result<Vec<User>, WorkflowError> {
        self.users
            .list()
            .await
            .map_err(WorkflowError::persistence("list_users"))
    }

    #[instrument(skip(self, changes), fields(user_id = %id), err)]
    pub async fn update(&self, id: UserId, changes: UserChanges) -> Result<User, WorkflowError> {
        let mut user = self.get(id).await?;

        let password_hash = changes
            .password
            .as_deref()
            .map(hash_password)
            .transpose()?;

        UserPatch {
            inn: changes.inn,
            username: changes.username,
            password_hash,
            company_name: changes.company_name,
            is_admin: changes.is_admin,
            is_active: changes.is_active,
        }
        .apply_to(&mut user)?;
        user.updated_at = Utc::now();

        let rows = self
            .users
            .update(&user)
            .await
            .map_err(WorkflowError::store("update_user"))?;
        if rows == 0 {
            tracing::warn!(user_id = %id, "user update affected no rows");
            return Err(WorkflowError::NoRowsUpdated {
                entity: "user",
                id: id.get(),
            });
        }

        Ok(user)
    }

    /// Delete a user; owned fiscal modules and terminals go with them.
    #[instrument(skip(self), fields(user_id = %id), err)]
    pub async fn delete(&self, id: UserId) -> Result<(), WorkflowError> {
        let rows = self
            .users
            .delete(id)
            .await
            .map_err(WorkflowError::persistence("delete_user"))?;
        if rows == 0 {
            return Err(WorkflowError::not_found("user", id));
        }
        tracing::info!("user deleted");
        Ok(())
    }
}
