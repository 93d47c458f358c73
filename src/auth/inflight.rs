//! Per-key serialization of token refreshes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed async lock that lets only one refresh per account run at a time.
///
/// Callers take the lock, then re-read the stored token before exchanging:
/// a caller that waited behind another refresh finds the fresh token and
/// skips its own exchange, so concurrent callers coalesce into one request.
#[derive(Debug, Default)]
pub struct RefreshGuard {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RefreshGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive refresh rights on `key`.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        entry.lock_owned().await
    }

    /// Drop the lock entry for a key that no longer exists.
    pub fn forget(&self, key: &str) {
        if let Ok(mut locks) = self.locks.lock() {
            locks.remove(key);
        }
    }
}
