use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, error, warn};

use super::backend::{MemoryTokenBackend, TokenBackend};
use super::inflight::RefreshGuard;
use super::refresher::TokenRefresher;
use super::token::{expires_at_from_now, TokenRecord};

/// Refresh key used for the single legacy token.
const LEGACY_KEY: &str = "legacy";
const TEST_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Tokens expiring within this window are refreshed before use.
pub fn default_refresh_window() -> Duration {
    Duration::minutes(5)
}

/// Legacy single-account token storage.
///
/// Holds one bearer token in a process-scoped memory slot, optionally backed
/// by a disk document. The slot is consulted first and always written; disk
/// writes are best effort. Every read path reports failure as `None`.
///
/// Clones share the same slot, refresh lock and counters.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use outlook_auth::auth::{ClientCredentials, FileTokenBackend, TokenRefresher, TokenStore};
///
/// # async fn run() -> Result<(), outlook_auth::auth::AuthError> {
/// let refresher = Arc::new(TokenRefresher::new(
///     ClientCredentials::new("client-id", "client-secret"),
///     vec!["offline_access".to_string()],
/// )?);
/// let store = TokenStore::new(refresher)
///     .with_disk(Arc::new(FileTokenBackend::new("/tmp/outlook-tokens.json")));
/// let token = store.access_token().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TokenStore {
    cache: MemoryTokenBackend,
    disk: Option<Arc<dyn TokenBackend>>,
    refresher: Arc<TokenRefresher>,
    guard: Arc<RefreshGuard>,
    refresh_window: Duration,
    background_failures: Arc<AtomicU64>,
}

impl TokenStore {
    /// Memory-only store.
    pub fn new(refresher: Arc<TokenRefresher>) -> Self {
        Self {
            cache: MemoryTokenBackend::new(),
            disk: None,
            refresher,
            guard: Arc::new(RefreshGuard::new()),
            refresh_window: default_refresh_window(),
            background_failures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_disk(mut self, disk: Arc<dyn TokenBackend>) -> Self {
        self.disk = Some(disk);
        self
    }

    /// Share a memory slot owned by the hosting deployment.
    pub fn with_cache(mut self, cache: MemoryTokenBackend) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_refresh_window(mut self, window: Duration) -> Self {
        self.refresh_window = window;
        self
    }

    pub fn cache(&self) -> &MemoryTokenBackend {
        &self.cache
    }

    /// Number of detached refreshes that failed since startup.
    pub fn background_refresh_failures(&self) -> u64 {
        self.background_failures.load(Ordering::Relaxed)
    }

    /// Load the stored token, refreshing it first if it has expired.
    pub async fn load(&self) -> Option<TokenRecord> {
        let token = self.read_stored().await?;
        if !token.is_expired() {
            return Some(token);
        }
        match usable_refresh_token(&token) {
            Some(refresh_token) => {
                debug!("stored token expired; refreshing");
                self.refresh_if_stale(&refresh_token).await
            }
            None => {
                debug!("stored token expired and has no refresh token");
                None
            }
        }
    }

    /// Stored token as-is, without refreshing or writing anything.
    pub async fn stored(&self) -> Option<TokenRecord> {
        self.read_stored().await
    }

    /// Store a token in memory and, best effort, on disk.
    pub async fn save(&self, token: &TokenRecord) {
        self.cache.inject(token.clone());
        if let Some(disk) = &self.disk {
            if let Err(error) = disk.save(token).await {
                error!(
                    backend = disk.kind(),
                    %error,
                    "failed to persist token; in-memory copy remains authoritative"
                );
            }
        }
    }

    /// Exchange `refresh_token` and store the result.
    ///
    /// Always contacts the provider, even when the cached token is still
    /// fresh. Serialized with every other refresh of the legacy token.
    pub async fn refresh(&self, refresh_token: &str) -> Option<TokenRecord> {
        let _permit = self.guard.lock(LEGACY_KEY).await;
        self.exchange_and_save(refresh_token).await
    }

    /// Refresh unless a caller that held the lock first already did.
    async fn refresh_if_stale(&self, refresh_token: &str) -> Option<TokenRecord> {
        let _permit = self.guard.lock(LEGACY_KEY).await;
        if let Some(current) = self.cache.current() {
            if current.has_access_token() && !current.expires_within(self.refresh_window) {
                debug!("token already refreshed by a concurrent caller");
                return Some(current);
            }
        }
        self.exchange_and_save(refresh_token).await
    }

    async fn exchange_and_save(&self, refresh_token: &str) -> Option<TokenRecord> {
        let token = self.refresher.refresh(refresh_token).await?;
        self.save(&token).await;
        Some(token)
    }

    /// Cached access token, without any I/O.
    ///
    /// Inside the refresh window a detached refresh is started and the cached
    /// token is returned anyway; an already expired token yields `None`.
    /// Callers that need a guaranteed fresh token use [`Self::access_token`].
    pub fn access_token_sync(&self) -> Option<String> {
        let token = self.cache.current().filter(TokenRecord::has_access_token)?;
        if token.expires_within(self.refresh_window) {
            if let Some(refresh_token) = usable_refresh_token(&token) {
                self.spawn_background_refresh(refresh_token);
            }
        }
        if token.is_expired() {
            return None;
        }
        Some(token.access_token)
    }

    /// Access token that is valid for at least the refresh window.
    pub async fn access_token(&self) -> Option<String> {
        let token = self.load().await?;
        if !token.expires_within(self.refresh_window) {
            return Some(token.access_token);
        }
        match usable_refresh_token(&token) {
            Some(refresh_token) => self
                .refresh_if_stale(&refresh_token)
                .await
                .map(|fresh| fresh.access_token),
            None if token.is_expired() => None,
            None => Some(token.access_token),
        }
    }

    /// Synthesize and store a one-hour token without contacting the provider.
    pub async fn create_test_token(&self) -> TokenRecord {
        let stamp = Utc::now().timestamp_millis();
        let token = TokenRecord {
            access_token: format!("test_access_token_{stamp}"),
            refresh_token: Some(format!("test_refresh_token_{stamp}")),
            expires_at: expires_at_from_now(TEST_TOKEN_LIFETIME_SECS, Utc::now()),
            token_type: Some("Bearer".to_string()),
            ..Default::default()
        };
        self.save(&token).await;
        token
    }

    /// Forget the stored token in memory and on disk.
    pub async fn clear(&self) {
        self.cache.reset();
        if let Some(disk) = &self.disk {
            if let Err(error) = disk.clear().await {
                error!(backend = disk.kind(), %error, "failed to delete stored token");
            }
        }
    }

    async fn read_stored(&self) -> Option<TokenRecord> {
        if let Some(token) = self.cache.current().filter(TokenRecord::has_access_token) {
            return Some(token);
        }
        let disk = self.disk.as_ref()?;
        match disk.load().await {
            Ok(Some(token)) if token.has_access_token() => {
                self.cache.inject(token.clone());
                Some(token)
            }
            Ok(_) => None,
            Err(error) => {
                warn!(backend = disk.kind(), %error, "could not read stored token");
                None
            }
        }
    }

    fn spawn_background_refresh(&self, refresh_token: String) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime; skipping background token refresh");
            return;
        };
        let store = self.clone();
        runtime.spawn(async move {
            if store.refresh_if_stale(&refresh_token).await.is_none() {
                let failures = store.background_failures.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(failures, "background token refresh failed");
            }
        });
    }
}

fn usable_refresh_token(token: &TokenRecord) -> Option<String> {
    token
        .refresh_token
        .as_ref()
        .filter(|value| !value.is_empty())
        .cloned()
}
