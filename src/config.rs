use anyhow::{Context, Result};
use content_sync_core::models::Host;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    pub host: HostConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default = "default_fallback_version")]
    pub fallback_version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: None,
            fallback_version: default_fallback_version(),
        }
    }
}

fn default_fallback_version() -> String {
    "0.0.0-beta".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct HostConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl HostConfig {
    pub fn to_host(&self) -> Host {
        match self.kind.as_str() {
            "jupyter" => Host::Jupyter {
                base_url: self.base_url.clone().unwrap_or_default(),
                token: self.token.clone(),
            },
            "local" => Host::Local,
            other => Host::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct DownloadConfig {
    #[serde(default = "default_download_dir")]
    pub dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            dir: default_download_dir(),
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

impl Config {
    /// The version to stamp into saved notebooks.
    pub fn effective_version(&self) -> &str {
        self.app
            .version
            .as_deref()
            .unwrap_or(&self.app.fallback_version)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.host.kind == "jupyter" {
        let base_url = config
            .host
            .base_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("host.base_url is required when host.type is 'jupyter'"))?;
        reqwest::Url::parse(base_url)
            .with_context(|| format!("host.base_url is not a valid URL: '{}'", base_url))?;
    }

    if config.client.timeout_secs == 0 {
        anyhow::bail!("client.timeout_secs must be > 0");
    }

    if config.app.fallback_version.trim().is_empty() {
        anyhow::bail!("app.fallback_version must not be empty");
    }

    Ok(())
}
