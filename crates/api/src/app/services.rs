use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use fiscalhub_auth::{Hs256JwtValidator, JwtClaims, TokenError};
use fiscalhub_infra::{
    Exporter, FiscalModuleRegistry, FiscalModuleStore, InMemoryStore, PostgresStore, StoreError,
    TerminalDirectory, TerminalMutation, TerminalProvisioning, TerminalStore, UserAccounts,
    UserStore, WorkflowError,
};
use fiscalhub_registry::User;

use crate::config::ApiConfig;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("storage unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("administrator bootstrap failed: {0}")]
    Admin(#[from] WorkflowError),
}

/// Everything the handlers need, shared behind an `Arc` extension.
#[derive(Clone)]
pub struct AppServices {
    pub accounts: UserAccounts,
    pub fiscal_modules: FiscalModuleRegistry,
    pub provisioning: TerminalProvisioning,
    pub mutation: TerminalMutation,
    pub terminals: TerminalDirectory,
    pub exporter: Exporter,
    pub tokens: Arc<Hs256JwtValidator>,
    pub token_ttl: Duration,
}

impl AppServices {
    pub fn from_stores(
        users: Arc<dyn UserStore>,
        modules: Arc<dyn FiscalModuleStore>,
        terminals: Arc<dyn TerminalStore>,
        tokens: Arc<Hs256JwtValidator>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            accounts: UserAccounts::new(users.clone()),
            fiscal_modules: FiscalModuleRegistry::new(modules.clone(), users.clone()),
            provisioning: TerminalProvisioning::new(modules, terminals.clone()),
            mutation: TerminalMutation::new(terminals.clone()),
            terminals: TerminalDirectory::new(terminals),
            exporter: Exporter::new(users),
            tokens,
            token_ttl,
        }
    }

    pub fn in_memory(tokens: Arc<Hs256JwtValidator>, token_ttl: Duration) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::from_stores(store.clone(), store.clone(), store, tokens, token_ttl)
    }

    /// Mint a bearer token for `user`; the admin flag is captured as of now.
    pub fn issue_token(&self, user: &User, now: DateTime<Utc>) -> Result<(String, DateTime<Utc>), TokenError> {
        let claims = JwtClaims::new(user.id, user.is_admin, now, self.token_ttl);
        let token = self.tokens.issue(&claims)?;
        Ok((token, claims.expires_at))
    }
}

/// Wire storage from config: Postgres when `DATABASE_URL` is set, in-memory otherwise.
pub async fn build_services(
    config: &ApiConfig,
    tokens: Arc<Hs256JwtValidator>,
) -> Result<AppServices, BootstrapError> {
    let services = match config.database_url.as_deref() {
        Some(url) => {
            let store = Arc::new(PostgresStore::connect(url).await?);
            store.ensure_schema().await?;
            tracing::info!("using postgres storage");
            AppServices::from_stores(store.clone(), store.clone(), store, tokens, config.token_ttl)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory storage");
            AppServices::in_memory(tokens, config.token_ttl)
        }
    };

    if let Some(admin) = &config.admin {
        let created = services.accounts.ensure_admin(&admin.username, &admin.password).await?;
        if created {
            tracing::info!(username = %admin.username, "bootstrap administrator created");
        }
    }

    Ok(services)
}
