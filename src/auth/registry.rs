//! Multi-account registry with per-account token documents.
//!
//! On disk the registry is a directory holding `accounts.json`, an index of
//! account metadata keyed by id, and one `<id>.tokens.json` document per
//! account. Secrets never appear in the index.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::backend::{FileTokenBackend, TokenBackend};
use super::error::AuthError;
use super::inflight::RefreshGuard;
use super::refresher::TokenRefresher;
use super::store::default_refresh_window;
use super::token::TokenRecord;
use crate::util::fs::{atomic_write, read_optional};

const INDEX_FILE: &str = "accounts.json";

/// A Microsoft identity the server can act for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub user_principal_name: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    #[serde(skip)]
    pub tokens: Option<TokenRecord>,
}

impl Account {
    pub fn has_valid_tokens(&self) -> bool {
        self.tokens.as_ref().is_some_and(TokenRecord::is_live)
    }
}

/// Read-only view of an account without token material.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    pub user_principal_name: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    pub has_valid_tokens: bool,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            user_principal_name: account.user_principal_name.clone(),
            display_name: account.display_name.clone(),
            created_at: account.created_at,
            last_used: account.last_used,
            has_valid_tokens: account.has_valid_tokens(),
        }
    }
}

/// Insertion-ordered collection of accounts, each with its own token lifecycle.
///
/// The in-memory map is authoritative while the process runs. Every mutation
/// writes the index and the affected token document; a failed write is logged
/// at `error` level and does not undo the in-memory change.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use outlook_auth::auth::{AccountRegistry, ClientCredentials, TokenRefresher};
///
/// # async fn run() -> Result<(), outlook_auth::auth::AuthError> {
/// let refresher = Arc::new(TokenRefresher::new(
///     ClientCredentials::new("client-id", "client-secret"),
///     vec!["offline_access".to_string()],
/// )?);
/// let registry = AccountRegistry::open("/tmp/outlook-accounts", refresher).await;
/// for account in registry.list().await {
///     println!("{} valid={}", account.user_principal_name, account.has_valid_tokens);
/// }
/// # Ok(())
/// # }
/// ```
pub struct AccountRegistry {
    accounts: RwLock<IndexMap<String, Account>>,
    dir: Option<PathBuf>,
    refresher: Arc<TokenRefresher>,
    guard: RefreshGuard,
    refresh_window: Duration,
}

impl AccountRegistry {
    /// Open a directory-backed registry, starting empty if nothing can be read.
    pub async fn open(dir: impl Into<PathBuf>, refresher: Arc<TokenRefresher>) -> Self {
        let dir = dir.into();
        let accounts = match load_accounts(&dir).await {
            Ok(accounts) => {
                debug!(count = accounts.len(), dir = %dir.display(), "loaded account registry");
                accounts
            }
            Err(error) => {
                warn!(
                    %error,
                    dir = %dir.display(),
                    "could not load account registry; starting empty"
                );
                IndexMap::new()
            }
        };
        Self::with_accounts(accounts, Some(dir), refresher)
    }

    /// Registry that lives only in this process.
    pub fn in_memory(refresher: Arc<TokenRefresher>) -> Self {
        Self::with_accounts(IndexMap::new(), None, refresher)
    }

    fn with_accounts(
        accounts: IndexMap<String, Account>,
        dir: Option<PathBuf>,
        refresher: Arc<TokenRefresher>,
    ) -> Self {
        Self {
            accounts: RwLock::new(accounts),
            dir,
            refresher,
            guard: RefreshGuard::new(),
            refresh_window: default_refresh_window(),
        }
    }

    pub fn with_refresh_window(mut self, window: Duration) -> Self {
        self.refresh_window = window;
        self
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }

    /// Register an account and return its new id.
    pub async fn add(
        &self,
        user_principal_name: &str,
        display_name: Option<&str>,
        tokens: Option<TokenRecord>,
    ) -> String {
        let now = Utc::now();
        let account = Account {
            id: uuid::Uuid::new_v4().to_string(),
            user_principal_name: user_principal_name.to_string(),
            display_name: display_name.unwrap_or(user_principal_name).to_string(),
            created_at: now,
            last_used: now,
            tokens,
        };
        let id = account.id.clone();

        let mut accounts = self.accounts.write().await;
        accounts.insert(id.clone(), account.clone());
        self.persist_index(&accounts).await;
        if let Some(tokens) = &account.tokens {
            self.persist_tokens(&id, tokens).await;
        }
        info!(account_id = %id, upn = %user_principal_name, "account added");
        id
    }

    /// Remove an account and its token document.
    pub async fn remove(&self, account_id: &str) -> bool {
        let mut accounts = self.accounts.write().await;
        if accounts.shift_remove(account_id).is_none() {
            return false;
        }
        if let Some(path) = self.token_path(account_id) {
            if let Err(error) = FileTokenBackend::new(path).clear().await {
                error!(account_id, %error, "failed to delete account token file");
            }
        }
        self.persist_index(&accounts).await;
        drop(accounts);
        self.guard.forget(account_id);
        info!(account_id, "account removed");
        true
    }

    /// Replace an account's tokens wholesale and mark it used.
    pub async fn update_tokens(&self, account_id: &str, tokens: TokenRecord) -> bool {
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.get_mut(account_id) else {
            return false;
        };
        account.tokens = Some(tokens.clone());
        account.last_used = Utc::now();
        self.persist_index(&accounts).await;
        self.persist_tokens(account_id, &tokens).await;
        true
    }

    /// Access token for an account, refreshed first when close to expiry.
    ///
    /// Returns `None` when the account is unknown, has no tokens, or needs a
    /// refresh that fails.
    pub async fn access_token(&self, account_id: &str) -> Option<String> {
        let tokens = self.tokens_of(account_id).await?;
        if !tokens.expires_within(self.refresh_window) {
            return Some(tokens.access_token);
        }
        if !tokens.can_refresh() {
            debug!(account_id, "token near expiry without refresh token");
            return (!tokens.is_expired()).then_some(tokens.access_token);
        }

        let _permit = self.guard.lock(account_id).await;
        // Another caller may have refreshed while this one waited.
        let tokens = self.tokens_of(account_id).await?;
        if !tokens.expires_within(self.refresh_window) {
            debug!(account_id, "reusing token refreshed by a concurrent caller");
            return Some(tokens.access_token);
        }
        let refresh_token = tokens.refresh_token.as_deref()?;
        let Some(fresh) = self.refresher.refresh(refresh_token).await else {
            warn!(account_id, "account token refresh failed");
            return None;
        };
        if !self.update_tokens(account_id, fresh.clone()).await {
            debug!(account_id, "account removed during refresh");
            return None;
        }
        Some(fresh.access_token)
    }

    pub async fn get(&self, account_id: &str) -> Option<Account> {
        self.accounts.read().await.get(account_id).cloned()
    }

    /// Case-insensitive exact match on the user principal name.
    pub async fn find_by_email(&self, email: &str) -> Option<Account> {
        let wanted = email.to_lowercase();
        self.accounts
            .read()
            .await
            .values()
            .find(|account| account.user_principal_name.to_lowercase() == wanted)
            .cloned()
    }

    /// First account, in insertion order, holding a live token.
    pub async fn default_account(&self) -> Option<Account> {
        self.accounts
            .read()
            .await
            .values()
            .find(|account| account.has_valid_tokens())
            .cloned()
    }

    pub async fn list(&self) -> Vec<AccountSummary> {
        self.accounts
            .read()
            .await
            .values()
            .map(AccountSummary::from)
            .collect()
    }

    async fn tokens_of(&self, account_id: &str) -> Option<TokenRecord> {
        self.accounts
            .read()
            .await
            .get(account_id)?
            .tokens
            .clone()
            .filter(TokenRecord::has_access_token)
    }

    fn token_path(&self, account_id: &str) -> Option<PathBuf> {
        self.dir.as_deref().map(|dir| token_file(dir, account_id))
    }

    async fn persist_index(&self, accounts: &IndexMap<String, Account>) {
        let Some(dir) = &self.dir else {
            return;
        };
        let path = dir.join(INDEX_FILE);
        let result = match serde_json::to_vec_pretty(accounts) {
            Ok(serialized) => atomic_write(&path, &serialized).await.map_err(AuthError::from),
            Err(error) => Err(error.into()),
        };
        if let Err(error) = result {
            error!(path = %path.display(), %error, "failed to persist account index");
        }
    }

    async fn persist_tokens(&self, account_id: &str, tokens: &TokenRecord) {
        let Some(path) = self.token_path(account_id) else {
            return;
        };
        if let Err(error) = FileTokenBackend::new(path).save(tokens).await {
            error!(account_id, %error, "failed to persist account tokens");
        }
    }
}

fn token_file(dir: &Path, account_id: &str) -> PathBuf {
    dir.join(format!("{account_id}.tokens.json"))
}

async fn load_accounts(dir: &Path) -> Result<IndexMap<String, Account>, AuthError> {
    let Some(raw) = read_optional(&dir.join(INDEX_FILE)).await? else {
        return Ok(IndexMap::new());
    };
    let mut accounts: IndexMap<String, Account> = serde_json::from_str(&raw)?;
    for (id, account) in accounts.iter_mut() {
        let tokens = FileTokenBackend::new(token_file(dir, id)).load().await?;
        // Expired documents load as absent; refresh only happens on access.
        account.tokens = tokens.filter(|t| t.has_access_token() && !t.is_expired());
    }
    Ok(accounts)
}
