use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::vfs::{DEFAULT_PAGE_SIZE, RetryPolicy};

const APP_DIR_NAME: &str = "dup";
const CREDENTIALS_FILE_NAME: &str = "credentials.json";
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_OAUTH_TIMEOUT_SECS: u64 = 180;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration directory is unavailable; set DUP_CONFIG_DIR")]
    NoConfigDir,
    #[error(
        "OAuth client credentials not found: set DUP_CLIENT_ID and DUP_CLIENT_SECRET or place credentials.json in {}",
        .0.display()
    )]
    MissingCredentials(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    CredentialsUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("credentials.json is malformed: {0}")]
    CredentialsMalformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub config_dir: PathBuf,
    pub api_base_url: Option<String>,
    pub oauth_base_url: Option<String>,
    pub retry: RetryPolicy,
    pub page_size: u32,
    pub oauth_timeout: Duration,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config_dir = match std::env::var_os("DUP_CONFIG_DIR") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .ok_or(ConfigError::NoConfigDir)?
                .join(APP_DIR_NAME),
        };
        let retry = RetryPolicy::new(
            read_u32_env("DUP_RETRY_ATTEMPTS", DEFAULT_RETRY_ATTEMPTS),
            Duration::from_millis(read_u64_env("DUP_RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS)),
        );
        let page_size = read_u32_env("DUP_PAGE_SIZE", DEFAULT_PAGE_SIZE);
        let oauth_timeout = Duration::from_secs(read_u64_env(
            "DUP_OAUTH_TIMEOUT_SECS",
            DEFAULT_OAUTH_TIMEOUT_SECS,
        ));

        Ok(Self {
            config_dir,
            api_base_url: read_string_env("DUP_API_URL"),
            oauth_base_url: read_string_env("DUP_OAUTH_URL"),
            retry,
            page_size,
            oauth_timeout,
            client_id: read_string_env("DUP_CLIENT_ID"),
            client_secret: read_string_env("DUP_CLIENT_SECRET"),
        })
    }

    /// A config rooted at `config_dir` with default tuning and no overrides.
    pub fn with_config_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            api_base_url: None,
            oauth_base_url: None,
            retry: RetryPolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
            oauth_timeout: Duration::from_secs(DEFAULT_OAUTH_TIMEOUT_SECS),
            client_id: None,
            client_secret: None,
        }
    }

    /// OAuth client id/secret from the environment, else from `credentials.json`.
    pub fn client_credentials(&self) -> Result<ClientCredentials, ConfigError> {
        if let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret) {
            return Ok(ClientCredentials {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            });
        }
        read_credentials_file(&self.config_dir.join(CREDENTIALS_FILE_NAME))
    }
}

// Google's downloadable client secret: {"installed": {...}} or {"web": {...}}.
#[derive(Deserialize)]
struct CredentialsFile {
    installed: Option<CredentialsSection>,
    web: Option<CredentialsSection>,
}

#[derive(Deserialize)]
struct CredentialsSection {
    client_id: String,
    client_secret: String,
}

fn read_credentials_file(path: &Path) -> Result<ClientCredentials, ConfigError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::MissingCredentials(path.to_path_buf()));
        }
        Err(source) => {
            return Err(ConfigError::CredentialsUnreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let file: CredentialsFile = serde_json::from_slice(&bytes)?;
    file.installed
        .or(file.web)
        .map(|section| ClientCredentials {
            client_id: section.client_id,
            client_secret: section.client_secret,
        })
        .ok_or_else(|| ConfigError::MissingCredentials(path.to_path_buf()))
}

fn read_string_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_u64_env(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn read_u32_env(name: &str, default: u32) -> u32 {
    saturate_u32(read_u64_env(name, u64::from(default)))
}

fn saturate_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
