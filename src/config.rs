//! TOML configuration for the `zs` client.
//!
//! Every field has a default, so an empty file (or no file at all, via
//! [`Config::minimal`]) yields a client pointed at `http://localhost:8000`
//! that asks for ten results per search.
//!
//! ```toml
//! [service]
//! base_url = "http://localhost:8000"
//! timeout_secs = 30
//!
//! [search]
//! top_k = 10
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable that overrides `service.base_url`.
pub const URL_ENV: &str = "ZEROSTACK_URL";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout. Unset means requests may wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    10
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.service.timeout_secs.map(Duration::from_secs)
    }

    /// Replace the service base URL (from `--url` or [`URL_ENV`]) and re-validate.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Result<Self> {
        self.service.base_url = url.into();
        validate(&self)?;
        Ok(self)
    }
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;

    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
/// A file that exists but fails to parse is still an error.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    let url = reqwest::Url::parse(&config.service.base_url).with_context(|| {
        format!(
            "service.base_url is not a valid URL: {}",
            config.service.base_url
        )
    })?;
    match url.scheme() {
        "http" | "https" => {}
        other => anyhow::bail!("service.base_url must use http or https, got '{}'", other),
    }

    if config.service.timeout_secs == Some(0) {
        anyhow::bail!("service.timeout_secs must be > 0 when set");
    }

    if config.search.top_k == 0 {
        anyhow::bail!("search.top_k must be >= 1");
    }

    Ok(())
}
