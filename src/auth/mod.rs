//! Token lifecycle: storage, refresh, multi-account registry and the
//! authentication gate.

pub mod backend;
pub mod error;
pub mod inflight;
pub mod refresher;
pub mod registry;
pub mod service;
pub mod store;
pub mod token;

pub use backend::{FileTokenBackend, MemoryTokenBackend, TokenBackend};
pub use error::AuthError;
pub use inflight::RefreshGuard;
pub use refresher::{ClientCredentials, TokenRefresher};
pub use registry::{Account, AccountRegistry, AccountSummary};
pub use service::{AuthService, AuthStatus};
pub use store::TokenStore;
pub use token::TokenRecord;
