use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "LabDash";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Region used when neither the config file nor the environment names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Transport timeout applied to every Record Service and identity call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const ENV_API_URL: &str = "LABDASH_API_URL";
pub const ENV_REGION: &str = "LABDASH_COGNITO_REGION";
pub const ENV_USER_POOL_ID: &str = "LABDASH_USER_POOL_ID";
pub const ENV_CLIENT_ID: &str = "LABDASH_CLIENT_ID";
pub const ENV_IDENTITY_ENDPOINT: &str = "LABDASH_COGNITO_ENDPOINT";
pub const ENV_TIMEOUT_SECS: &str = "LABDASH_TIMEOUT_SECS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("Cannot determine the user configuration directory")]
    NoConfigDir,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-user application directory (`<config dir>/labdash`).
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("labdash"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Optional JSON config file read by [`DashboardConfig::load`].
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(app_data_dir()?.join("config.json"))
}

/// Where the identity provider's tokens are persisted between runs.
pub fn session_file() -> Result<PathBuf, ConfigError> {
    Ok(app_data_dir()?.join("session.json"))
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "labdash_lib=info,labdash=info,warn"
}

/// Managed identity provider (Cognito user pool) settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub region: String,
    pub user_pool_id: Option<String>,
    pub client_id: String,
    /// Overrides `https://cognito-idp.{region}.amazonaws.com/`.
    pub endpoint: Option<String>,
}

impl IdentityConfig {
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://cognito-idp.{}.amazonaws.com/", self.region),
        }
    }
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Base URL of the Record Service, e.g. `https://api.example.com/prod`.
    pub api_base_url: String,
    pub identity: IdentityConfig,
    pub request_timeout_secs: u64,
}

/// On-disk shape of `config.json`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileConfig {
    api_base_url: Option<String>,
    region: Option<String>,
    user_pool_id: Option<String>,
    client_id: Option<String>,
    identity_endpoint: Option<String>,
    request_timeout_secs: Option<u64>,
}

impl DashboardConfig {
    /// Load defaults, then the config file (if present), then environment
    /// variables. Later layers win.
    pub fn load() -> Result<Self, ConfigError> {
        let file = read_file_config(&config_file()?)?;
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Load from an explicit config file path plus the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let file = read_file_config(path)?;
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    fn resolve(
        file: FileConfig,
        env: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |key| env(key).filter(|v: &String| !v.trim().is_empty());

        let api_base_url = lookup(ENV_API_URL)
            .or(file.api_base_url)
            .ok_or(ConfigError::Missing(ENV_API_URL))?;
        let client_id = lookup(ENV_CLIENT_ID)
            .or(file.client_id)
            .ok_or(ConfigError::Missing(ENV_CLIENT_ID))?;
        let user_pool_id = lookup(ENV_USER_POOL_ID).or(file.user_pool_id);
        let region = lookup(ENV_REGION)
            .or(file.region)
            .or_else(|| user_pool_id.as_deref().and_then(pool_region))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let request_timeout_secs = match lookup(ENV_TIMEOUT_SECS) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: ENV_TIMEOUT_SECS,
                value: raw,
            })?,
            None => file.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_base_url,
            identity: IdentityConfig {
                region,
                user_pool_id,
                client_id,
                endpoint: lookup(ENV_IDENTITY_ENDPOINT).or(file.identity_endpoint),
            },
            request_timeout_secs,
        })
    }
}

/// Region prefix of a user-pool id (`ap-south-1_AbC123` → `ap-south-1`).
fn pool_region(pool_id: &str) -> Option<String> {
    pool_id
        .split_once('_')
        .map(|(region, _)| region)
        .filter(|region| !region.is_empty())
        .map(str::to_string)
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(serde_json::from_str(&raw)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(e) => Err(e.into()),
    }
}
