/*
[INPUT]:  YAML configuration file + CASEGEN_* environment overrides
[OUTPUT]: Parsed and validated CLI configuration
[POS]:    Configuration layer - connection, credentials, polling, downloads
[UPDATE]: When adding new configuration options
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use casegen_adapter::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};

pub const USERNAME_ENV: &str = "CASEGEN_USERNAME";
pub const PASSWORD_ENV: &str = "CASEGEN_PASSWORD";

/// Top-level configuration for the casegen CLI
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub downloads: DownloadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Service connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// API root, e.g. `http://127.0.0.1:8000/api/v1/`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Login credentials; either may be left out and asked for interactively
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    #[serde(default = "default_download_dir")]
    pub directory: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: default_download_dir(),
        }
    }
}

/// File logging; stderr is used when no directory is set
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_interval_secs() -> u64 {
    10
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

impl CliConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // an empty file is a valid, all-defaults configuration
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content).context("parse YAML config")?;
        Ok(config)
    }

    /// Load `path` if given, else the default location if it exists, else defaults.
    /// Environment credentials are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override credentials from the environment (lookup is injectable for tests)
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(username) = lookup(USERNAME_ENV).filter(|v| !v.trim().is_empty()) {
            self.credentials.username = Some(username);
        }
        if let Some(password) = lookup(PASSWORD_ENV).filter(|v| !v.is_empty()) {
            self.credentials.password = Some(password);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.base_url.trim().is_empty() {
            return Err(anyhow!("server.base_url cannot be empty"));
        }
        if self.server.timeout_secs == 0 {
            return Err(anyhow!("server.timeout_secs must be positive"));
        }
        if self.polling.page_size == 0 {
            return Err(anyhow!("polling.page_size must be positive"));
        }
        if self.polling.interval_secs == 0 {
            return Err(anyhow!("polling.interval_secs must be at least 1"));
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.server.base_url.clone(),
            timeout: Duration::from_secs(self.server.timeout_secs),
            ..ClientConfig::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_secs)
    }
}

/// `<config dir>/casegen/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("casegen").join("config.yaml"))
}
