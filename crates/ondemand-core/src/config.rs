//! ondemand.toml configuration parser.
//!
//! The file is read once at process start, then environment overrides are
//! applied through an injected lookup so tests never touch process state.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::InstanceRef;

pub const ENV_INSTANCE_ID: &str = "INSTANCE_ID";
pub const ENV_PROVIDER_ENDPOINT: &str = "ONDEMAND_PROVIDER_ENDPOINT";
pub const ENV_PROVIDER_REGION: &str = "ONDEMAND_PROVIDER_REGION";
pub const ENV_PROVIDER_TOKEN: &str = "ONDEMAND_PROVIDER_TOKEN";
pub const ENV_LISTEN: &str = "ONDEMAND_LISTEN";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid duration {0:?} (expected e.g. \"500ms\", \"20s\", \"5m\")")]
    Duration(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OndemandConfig {
    #[serde(default)]
    pub instance: InstanceConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub idle_check: IdleCheckConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Provider identifier of the managed instance.
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Remote control plane over HTTP.
    #[default]
    Http,
    /// In-process simulated provider for dry runs.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    /// Per-call bound against the provider (e.g. "20s").
    #[serde(default = "default_provider_timeout")]
    pub timeout: String,
    /// Bearer credential. Only ever taken from the environment.
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            endpoint: None,
            region: None,
            timeout: default_provider_timeout(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdleCheckConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_idle_interval")]
    pub interval: String,
}

impl Default for IdleCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_idle_interval(),
        }
    }
}

fn default_provider_timeout() -> String {
    "20s".to_string()
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_idle_interval() -> String {
    "5m".to_string()
}

fn default_true() -> bool {
    true
}

impl OndemandConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides on top of the file values.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`. Empty values are ignored.
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(id) = get(ENV_INSTANCE_ID) {
            self.instance.id = id;
        }
        if let Some(endpoint) = get(ENV_PROVIDER_ENDPOINT) {
            self.provider.endpoint = Some(endpoint);
        }
        if let Some(region) = get(ENV_PROVIDER_REGION) {
            self.provider.region = Some(region);
        }
        if let Some(token) = get(ENV_PROVIDER_TOKEN) {
            self.provider.token = Some(token);
        }
        if let Some(listen) = get(ENV_LISTEN) {
            self.server.listen = listen;
        }
        self
    }

    /// Check that the config is complete enough to start the daemon.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.instance.id.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "instance id is required (set [instance].id or {ENV_INSTANCE_ID})"
            )));
        }

        if self.provider.kind == ProviderKind::Http {
            match self.provider.endpoint.as_deref() {
                None => {
                    return Err(ConfigError::Invalid(format!(
                        "http provider requires an endpoint (set [provider].endpoint or {ENV_PROVIDER_ENDPOINT})"
                    )));
                }
                Some(endpoint) if !endpoint.starts_with("http://") => {
                    return Err(ConfigError::Invalid(format!(
                        "provider endpoint must be an http:// URL, got {endpoint:?}"
                    )));
                }
                Some(_) => {}
            }
        }

        if self.provider_timeout()?.is_zero() {
            return Err(ConfigError::Invalid("provider timeout must be non-zero".to_string()));
        }
        if self.idle_interval()?.is_zero() {
            return Err(ConfigError::Invalid("idle check interval must be non-zero".to_string()));
        }
        self.listen_addr()?;

        Ok(())
    }

    pub fn instance_ref(&self) -> InstanceRef {
        InstanceRef::new(self.instance.id.trim())
    }

    pub fn provider_timeout(&self) -> ConfigResult<Duration> {
        parse_duration(&self.provider.timeout)
    }

    pub fn idle_interval(&self) -> ConfigResult<Duration> {
        parse_duration(&self.idle_check.interval)
    }

    pub fn listen_addr(&self) -> ConfigResult<SocketAddr> {
        self.server
            .listen
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid listen address {:?}", self.server.listen)))
    }
}

/// Parse a duration string like "500ms", "20s", "5m", or bare seconds.
pub fn parse_duration(s: &str) -> ConfigResult<Duration> {
    let s = s.trim();
    let parsed = if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    };
    parsed.ok_or_else(|| ConfigError::Duration(s.to_string()))
}
