//! Configuration types and loading
//!
//! Config precedence: `--config` CLI arg > CONFIG_PATH env var > default
//! path. The file is optional; a missing file means every default applies.
//! Account passwords live in the account file, never in the TOML.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use relay::{ProxyEntry, RetryPolicy};
use serde::Deserialize;
use solix_auth::constants::{DEFAULT_API_BASE, Endpoints};
use solix_pool::ScheduleConfig;
use tracing::{info, warn};

/// Default config file name when neither CLI nor env selects one
pub const DEFAULT_CONFIG_PATH: &str = "solix-lite-mode.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub files: FilesConfig,
    pub api: ApiConfig,
    pub schedule: ScheduleSection,
    pub retry: RetrySection,
    pub status: StatusConfig,
}

/// Input and state document locations
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub accounts: PathBuf,
    pub sessions: PathBuf,
    pub proxies: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            accounts: PathBuf::from("accounts.yaml"),
            sessions: PathBuf::from("data.yaml"),
            proxies: PathBuf::from("proxy.txt"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    pub login_interval_secs: u64,
    pub status_interval_secs: u64,
    pub full_interval_secs: u64,
    pub status_pause_ms: u64,
    pub full_pause_ms: u64,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            login_interval_secs: 3590,
            status_interval_secs: 15,
            full_interval_secs: 600,
            status_pause_ms: 150,
            full_pause_ms: 200,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub max_proxy_swaps: u32,
    pub retry_delay_secs: u64,
    pub rate_limit_multiplier: u32,
    pub proxy_retry_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            max_proxy_swaps: 10,
            retry_delay_secs: 15,
            rate_limit_multiplier: 3,
            proxy_retry_delay_ms: 500,
            request_timeout_secs: 60,
        }
    }
}

/// Optional health/metrics listener
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub listen_addr: Option<SocketAddr>,
}

impl Config {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> common::Result<Self> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            info!(path = %path.display(), "config file not found, using defaults");
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        let base_url = &self.api.base_url;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "api.base_url must start with http:// or https://, got: {base_url}"
            )));
        }

        let non_zero = [
            ("schedule.login_interval_secs", self.schedule.login_interval_secs),
            ("schedule.status_interval_secs", self.schedule.status_interval_secs),
            ("schedule.full_interval_secs", self.schedule.full_interval_secs),
            ("retry.max_attempts", u64::from(self.retry.max_attempts)),
            ("retry.max_proxy_swaps", u64::from(self.retry.max_proxy_swaps)),
            ("retry.rate_limit_multiplier", u64::from(self.retry.rate_limit_multiplier)),
            ("retry.request_timeout_secs", self.retry.request_timeout_secs),
        ];
        if let Some((name, _)) = non_zero.iter().find(|(_, value)| *value == 0) {
            return Err(common::Error::Config(format!(
                "{name} must be greater than 0"
            )));
        }
        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(&self.api.base_url)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            max_proxy_swaps: self.retry.max_proxy_swaps,
            retry_delay: Duration::from_secs(self.retry.retry_delay_secs),
            rate_limit_multiplier: self.retry.rate_limit_multiplier,
            proxy_retry_delay: Duration::from_millis(self.retry.proxy_retry_delay_ms),
            request_timeout: Duration::from_secs(self.retry.request_timeout_secs),
        }
    }

    pub fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig {
            login_interval: Duration::from_secs(self.schedule.login_interval_secs),
            status_interval: Duration::from_secs(self.schedule.status_interval_secs),
            full_interval: Duration::from_secs(self.schedule.full_interval_secs),
            status_pause: Duration::from_millis(self.schedule.status_pause_ms),
            full_pause: Duration::from_millis(self.schedule.full_pause_ms),
        }
    }
}

/// Load the proxy list. A missing file means no proxies.
pub async fn load_proxies(path: &Path) -> common::Result<Vec<ProxyEntry>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => {
            let proxies = ProxyEntry::parse_list(&contents);
            info!(path = %path.display(), proxies = proxies.len(), "loaded proxies");
            Ok(proxies)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "proxy file not found");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}
