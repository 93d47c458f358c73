//! Configuration (layered: defaults < TOML file < environment).

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::auth::refresher::{ClientCredentials, DEFAULT_TOKEN_URL};
use crate::error::OutlookError;

/// Environment variable naming an optional TOML configuration file.
pub const CONFIG_PATH_ENV: &str = "OUTLOOK_MCP_CONFIG";

const DEFAULT_SCOPES: &[&str] = &[
    "offline_access",
    "User.Read",
    "Mail.Read",
    "Mail.ReadWrite",
    "Mail.Send",
    "Calendars.Read",
    "Calendars.ReadWrite",
];

const PLACEHOLDER_VALUES: &[&str] = &[
    "YOUR_CLIENT_ID",
    "YOUR_CLIENT_SECRET",
    "your-client-id",
    "your-client-secret",
    "changeme",
];

/// Where account and legacy tokens are persisted.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageKind {
    #[default]
    File,
    /// Process-scoped only; nothing touches disk.
    Memory,
}

/// Runtime configuration for the authentication core.
///
/// # Example
/// ```
/// use outlook_auth::config::{Config, StorageKind};
///
/// let config = Config::builder()
///     .client_id("app-id")
///     .client_secret("app-secret")
///     .storage(StorageKind::Memory)
///     .build();
/// assert!(config.credentials().is_ok());
/// ```
#[derive(Debug, Clone, Deserialize, bon::Builder)]
#[serde(default)]
pub struct Config {
    #[builder(into)]
    pub client_id: Option<String>,
    #[builder(into)]
    pub client_secret: Option<String>,
    #[builder(default = default_scopes())]
    pub scopes: Vec<String>,
    #[builder(default = DEFAULT_TOKEN_URL.to_string(), into)]
    pub token_endpoint: String,
    #[builder(default = default_home_path(".outlook-mcp-tokens.json"), into)]
    pub token_path: PathBuf,
    #[builder(default = default_home_path(".outlook-mcp/accounts"), into)]
    pub accounts_dir: PathBuf,
    #[builder(default)]
    pub storage: StorageKind,
    #[builder(default = 30)]
    pub refresh_timeout_secs: u64,
    #[builder(default = 300)]
    pub refresh_window_secs: i64,
    #[builder(default)]
    pub test_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Config {
    /// Defaults overridden by the environment (after loading `.env`).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Defaults, then the TOML file named by `OUTLOOK_MCP_CONFIG`, then the environment.
    pub fn load() -> Result<Self, OutlookError> {
        let _ = dotenvy::dotenv();
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_toml_file(Path::new(&path))?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, OutlookError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            OutlookError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, OutlookError> {
        toml::from_str(raw)
            .map_err(|e| OutlookError::Configuration(format!("invalid config file: {e}")))
    }

    /// Apply overrides from a variable lookup. Unparseable numeric or boolean
    /// values leave the current setting in place.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| lookup(name).filter(|value| !value.trim().is_empty()))
        };

        if let Some(value) = var(&["OUTLOOK_CLIENT_ID", "MS_CLIENT_ID"]) {
            self.client_id = Some(value);
        }
        if let Some(value) = var(&["OUTLOOK_CLIENT_SECRET", "MS_CLIENT_SECRET"]) {
            self.client_secret = Some(value);
        }
        if let Some(value) = var(&["OUTLOOK_SCOPES"]) {
            self.scopes = value.split_whitespace().map(String::from).collect();
        }
        if let Some(value) = var(&["OUTLOOK_TOKEN_ENDPOINT"]) {
            self.token_endpoint = value;
        }
        if let Some(value) = var(&["OUTLOOK_TOKEN_PATH"]) {
            self.token_path = PathBuf::from(value);
        }
        if let Some(value) = var(&["OUTLOOK_ACCOUNTS_DIR"]) {
            self.accounts_dir = PathBuf::from(value);
        }
        if let Some(kind) = parse_value(var(&["OUTLOOK_TOKEN_STORAGE"])) {
            self.storage = kind;
        }
        if let Some(secs) = parse_value(var(&["OUTLOOK_REFRESH_TIMEOUT_SECS"])) {
            self.refresh_timeout_secs = secs;
        }
        if let Some(secs) = parse_value(var(&["OUTLOOK_REFRESH_WINDOW_SECS"])) {
            self.refresh_window_secs = secs;
        }
        let flag = var(&["OUTLOOK_TEST_MODE", "USE_TEST_MODE"]).and_then(|v| parse_flag(&v));
        if let Some(flag) = flag {
            self.test_mode = flag;
        }
    }

    /// Validated client credentials for the token endpoint.
    pub fn credentials(&self) -> Result<ClientCredentials, OutlookError> {
        let client_id = required(self.client_id.as_deref(), "client_id", "OUTLOOK_CLIENT_ID")?;
        let client_secret = required(
            self.client_secret.as_deref(),
            "client_secret",
            "OUTLOOK_CLIENT_SECRET",
        )?;
        Ok(ClientCredentials::new(client_id, client_secret))
    }

    pub fn refresh_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_timeout_secs.max(1))
    }

    pub fn refresh_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_window_secs.max(0))
    }
}

fn required<'a>(value: Option<&'a str>, field: &str, env: &str) -> Result<&'a str, OutlookError> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() && !PLACEHOLDER_VALUES.contains(&value) => Ok(value),
        _ => Err(OutlookError::Configuration(format!(
            "{field} not configured. Set {env} or add it to the file named by {CONFIG_PATH_ENV}"
        ))),
    }
}

fn parse_value<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|scope| scope.to_string()).collect()
}

fn default_home_path(relative: &str) -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(relative))
        .unwrap_or_else(|| PathBuf::from(relative))
}
