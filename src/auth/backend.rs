//! Storage backends for a single token record.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::error::AuthError;
use super::token::TokenRecord;
use crate::util::fs::{atomic_write, read_optional, remove_if_exists};

/// Storage abstraction for one persisted token record.
#[async_trait]
pub trait TokenBackend: Send + Sync {
    /// Short label used in log fields.
    fn kind(&self) -> &'static str;
    async fn load(&self) -> Result<Option<TokenRecord>, AuthError>;
    async fn save(&self, token: &TokenRecord) -> Result<(), AuthError>;
    async fn clear(&self) -> Result<(), AuthError>;
}

/// File-backed token storage: one pretty-printed JSON document.
///
/// # Example
/// ```no_run
/// use outlook_auth::auth::{FileTokenBackend, TokenBackend, TokenRecord};
///
/// # async fn run() -> Result<(), outlook_auth::auth::AuthError> {
/// let backend = FileTokenBackend::new("/tmp/outlook-tokens.json");
/// backend.save(&TokenRecord::issued("access", None, 3600)).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenBackend {
    path: PathBuf,
}

impl FileTokenBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenBackend for FileTokenBackend {
    fn kind(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> Result<Option<TokenRecord>, AuthError> {
        let Some(raw) = read_optional(&self.path).await? else {
            return Ok(None);
        };
        let token: TokenRecord = serde_json::from_str(&raw)?;
        Ok(Some(token))
    }

    async fn save(&self, token: &TokenRecord) -> Result<(), AuthError> {
        let serialized = serde_json::to_vec_pretty(token)?;
        atomic_write(&self.path, &serialized).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), AuthError> {
        remove_if_exists(&self.path).await?;
        Ok(())
    }
}

/// Process-scoped in-memory slot.
///
/// Clones share the same slot, so a hosting layer can keep a handle and
/// inject a token without touching disk. The slot is also readable without
/// awaiting, which is what the synchronous access-token path relies on.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenBackend {
    slot: Arc<RwLock<Option<TokenRecord>>>,
}

impl MemoryTokenBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the slot with a record supplied by the surrounding deployment.
    pub fn inject(&self, token: TokenRecord) {
        self.put(Some(token));
    }

    /// Empty the slot.
    pub fn reset(&self) {
        self.put(None);
    }

    /// Current record, read without I/O.
    pub fn current(&self) -> Option<TokenRecord> {
        self.slot.read().ok()?.clone()
    }

    fn put(&self, token: Option<TokenRecord>) {
        match self.slot.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }
}

#[async_trait]
impl TokenBackend for MemoryTokenBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> Result<Option<TokenRecord>, AuthError> {
        Ok(self.current())
    }

    async fn save(&self, token: &TokenRecord) -> Result<(), AuthError> {
        self.put(Some(token.clone()));
        Ok(())
    }

    async fn clear(&self) -> Result<(), AuthError> {
        self.reset();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn file_backend_round_trip_is_pretty_json() {
        let dir = TempDir::new().unwrap();
        let backend = FileTokenBackend::new(dir.path().join("tokens.json"));
        let token = TokenRecord::issued("access", Some("refresh".to_string()), 3600);

        backend.save(&token).await.unwrap();
        let raw = std::fs::read_to_string(backend.path()).unwrap();
        assert!(raw.contains("\n  \"access_token\""));

        let loaded = backend.load().await.unwrap().unwrap();
        assert_eq!(loaded, token);
    }

    #[tokio::test]
    async fn file_backend_reports_corrupt_documents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, "{not-json").unwrap();
        let backend = FileTokenBackend::new(path);

        assert!(matches!(
            backend.load().await,
            Err(AuthError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn file_backend_clear_removes_document() {
        let dir = TempDir::new().unwrap();
        let backend = FileTokenBackend::new(dir.path().join("tokens.json"));
        backend
            .save(&TokenRecord::issued("access", None, 60))
            .await
            .unwrap();
        backend.clear().await.unwrap();
        assert!(backend.load().await.unwrap().is_none());
        backend.clear().await.unwrap();
    }

    #[tokio::test]
    async fn memory_backend_clones_share_slot() {
        let backend = MemoryTokenBackend::new();
        let handle = backend.clone();
        handle.inject(TokenRecord::issued("injected", None, 60));

        let loaded = backend.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "injected");

        backend.clear().await.unwrap();
        assert!(handle.current().is_none());
    }
}
