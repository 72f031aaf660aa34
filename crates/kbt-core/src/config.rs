use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::manager::TransferSettings;
use crate::retry::RetryPolicy;

/// Knowledge-base server the transport talks to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the knowledge-base server.
    pub base_url: String,
    /// Download path relative to `base_url`; `{id}` is replaced by the resource id.
    pub download_path: String,
    /// Optional bearer token sent with every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            download_path: "api/documents/{id}/download".to_string(),
            auth_token: None,
        }
    }
}

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Automatic retries after the first attempt.
    pub max_retries: u32,
    /// Delay in seconds before each retry; the last entry repeats.
    pub delays_secs: Vec<f64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delays_secs: vec![1.0, 2.0, 4.0],
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> Result<RetryPolicy> {
        let delays = self
            .delays_secs
            .iter()
            .map(|s| {
                Duration::try_from_secs_f64(*s)
                    .with_context(|| format!("invalid retry delay: {} seconds", s))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RetryPolicy::new(self.max_retries, delays))
    }
}

/// Global configuration loaded from `~/.config/kbt/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbtConfig {
    /// Transfers running at once in a batch.
    pub batch_concurrency: usize,
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,
    /// Where downloads are saved (None = current directory).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
    #[serde(default)]
    pub server: ServerConfig,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

impl Default for KbtConfig {
    fn default() -> Self {
        Self {
            batch_concurrency: 3,
            timeout_secs: 300,
            download_dir: None,
            server: ServerConfig::default(),
            retry: None,
        }
    }
}

/// Upper bound for the per-attempt timeout (24h). Larger values overflow
/// libcurl's millisecond timeout.
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Checks a per-attempt timeout taken from config or the command line.
pub fn validate_timeout_secs(secs: u64) -> Result<Duration> {
    if secs == 0 {
        anyhow::bail!("timeout_secs must be at least 1");
    }
    if secs > MAX_TIMEOUT_SECS {
        anyhow::bail!("timeout_secs must be at most {} (24h), got {}", MAX_TIMEOUT_SECS, secs);
    }
    Ok(Duration::from_secs(secs))
}

impl KbtConfig {
    /// Validated settings for a [`TransferManager`](crate::TransferManager).
    pub fn transfer_settings(&self) -> Result<TransferSettings> {
        if self.batch_concurrency == 0 {
            anyhow::bail!("batch_concurrency must be at least 1");
        }
        let timeout = validate_timeout_secs(self.timeout_secs)?;
        let retry_policy = self.retry.clone().unwrap_or_default().to_policy()?;
        Ok(TransferSettings {
            retry_policy,
            timeout,
            batch_concurrency: self.batch_concurrency,
        })
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("kbt")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<KbtConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = KbtConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<KbtConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: KbtConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
