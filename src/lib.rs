//! Outlook MCP authentication core.
//!
//! Keeps Microsoft identity-platform bearer tokens usable for the tools of an
//! Outlook MCP server: a legacy single-token store, a multi-account registry,
//! refresh-token exchange and the [`auth::AuthService::ensure_authenticated`]
//! gate every tool handler calls.
//!
//! # Quick Start
//!
//! ```no_run
//! use outlook_auth::auth::AuthService;
//! use outlook_auth::config::Config;
//!
//! # async fn example() -> outlook_auth::error::Result<()> {
//! let config = Config::load()?;
//! let auth = AuthService::from_config(&config).await?;
//! let bearer = auth.ensure_authenticated(None, false).await?;
//! println!("{} chars", bearer.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
