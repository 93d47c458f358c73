use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::backend::FileTokenBackend;
use super::error::AuthError;
use super::refresher::{ClientCredentials, TokenRefresher};
use super::registry::{AccountRegistry, AccountSummary};
use super::store::TokenStore;
use crate::config::{Config, StorageKind};
use crate::error::OutlookError;

/// Snapshot of every token source the gate can draw from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub accounts: Vec<AccountSummary>,
    pub default_account_id: Option<String>,
    pub legacy_token_live: bool,
    pub test_mode: bool,
}

impl AuthStatus {
    pub fn is_authenticated(&self) -> bool {
        self.default_account_id.is_some() || self.legacy_token_live || self.test_mode
    }
}

/// The single funnel tool handlers use to obtain a bearer token.
///
/// Resolution order is: explicit account, the registry's default account,
/// then the legacy single-token store. Nothing below this type returns an
/// error for a missing token; this is where "no token" becomes
/// [`AuthError::AuthenticationRequired`].
///
/// # Example
/// ```no_run
/// use outlook_auth::auth::AuthService;
/// use outlook_auth::config::Config;
///
/// # async fn run() -> Result<(), outlook_auth::error::OutlookError> {
/// let service = AuthService::from_config(&Config::load()?).await?;
/// match service.ensure_authenticated(None, false).await {
///     Ok(token) => println!("bearer {} chars", token.len()),
///     Err(error) => println!("{}", error.user_message()),
/// }
/// # Ok(())
/// # }
/// ```
pub struct AuthService {
    registry: Arc<AccountRegistry>,
    legacy: TokenStore,
    test_mode: bool,
}

impl AuthService {
    pub fn new(registry: Arc<AccountRegistry>, legacy: TokenStore) -> Self {
        Self {
            registry,
            legacy,
            test_mode: false,
        }
    }

    /// Allow the gate to mint a local test token when nothing else is available.
    pub fn with_test_mode(mut self, enabled: bool) -> Self {
        self.test_mode = enabled;
        self
    }

    /// Wire the refresher, registry and legacy store from configuration.
    ///
    /// Missing client credentials are a configuration error unless test mode
    /// is enabled, in which case placeholder credentials are used and no
    /// refresh can succeed.
    pub async fn from_config(config: &Config) -> Result<Self, OutlookError> {
        let credentials = match config.credentials() {
            Ok(credentials) => credentials,
            Err(_) if config.test_mode => {
                warn!("client credentials missing; continuing in test mode");
                ClientCredentials::new("test-client-id", "test-client-secret")
            }
            Err(error) => return Err(error),
        };
        let refresher = Arc::new(
            TokenRefresher::with_timeout(
                credentials,
                config.scopes.clone(),
                config.refresh_timeout(),
            )?
            .with_token_url(config.token_endpoint.clone()),
        );

        let window = config.refresh_window();
        let (registry, legacy) = match config.storage {
            StorageKind::File => {
                let registry =
                    AccountRegistry::open(&config.accounts_dir, Arc::clone(&refresher)).await;
                let legacy = TokenStore::new(Arc::clone(&refresher))
                    .with_disk(Arc::new(FileTokenBackend::new(&config.token_path)));
                (registry, legacy)
            }
            StorageKind::Memory => (
                AccountRegistry::in_memory(Arc::clone(&refresher)),
                TokenStore::new(Arc::clone(&refresher)),
            ),
        };
        info!(storage = %config.storage, test_mode = config.test_mode, "auth service ready");

        Ok(Self::new(
            Arc::new(registry.with_refresh_window(window)),
            legacy.with_refresh_window(window),
        )
        .with_test_mode(config.test_mode))
    }

    pub fn registry(&self) -> &Arc<AccountRegistry> {
        &self.registry
    }

    pub fn legacy(&self) -> &TokenStore {
        &self.legacy
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    /// Resolve a bearer token, refreshing as needed.
    ///
    /// `force_new` always fails so the caller routes the user through
    /// interactive sign-in instead of reusing stored credentials.
    pub async fn ensure_authenticated(
        &self,
        account_id: Option<&str>,
        force_new: bool,
    ) -> Result<String, AuthError> {
        if force_new {
            debug!("fresh sign-in requested");
            return Err(AuthError::required("a new sign-in was requested"));
        }

        if let Some(id) = account_id {
            return match self.registry.access_token(id).await {
                Some(token) => Ok(token),
                None => {
                    warn!(account_id = id, "no usable token for requested account");
                    Err(AuthError::required(format!(
                        "account {id} has no valid token"
                    )))
                }
            };
        }

        if let Some(account) = self.registry.default_account().await {
            if let Some(token) = self.registry.access_token(&account.id).await {
                debug!(account_id = %account.id, "using default account");
                return Ok(token);
            }
            debug!(account_id = %account.id, "default account unusable; trying legacy token");
        }

        if let Some(token) = self.legacy.access_token().await {
            debug!("using legacy token");
            return Ok(token);
        }

        if self.test_mode {
            info!("test mode: issuing local test token");
            return Ok(self.legacy.create_test_token().await.access_token);
        }

        Err(AuthError::required("no accounts configured"))
    }

    pub async fn status(&self) -> AuthStatus {
        let accounts = self.registry.list().await;
        let default_account_id = accounts
            .iter()
            .find(|account| account.has_valid_tokens)
            .map(|account| account.id.clone());
        AuthStatus {
            accounts,
            default_account_id,
            legacy_token_live: self.legacy.stored().await.is_some_and(|t| t.is_live()),
            test_mode: self.test_mode,
        }
    }
}
