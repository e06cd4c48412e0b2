//! Server configuration
//!
//! Resolution order, later wins:
//! 1. Built-in defaults
//! 2. YAML file named by `WMB_CONFIG` (missing keys keep their defaults)
//! 3. Individual `WMB_*` environment variables
//!
//! The binary loads `.env` through `dotenvy` before calling [`BrowserConfig::from_env`].

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use wmb_agentic::AgentBackend;

use crate::error::ConfigError;

/// Default ceiling on live panels per session
pub const DEFAULT_MAX_PANELS: usize = 24;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub bind_address: String,
    pub port: u16,
    /// Maximum live panels per session
    pub max_panels: usize,
    /// Whether unparsable lines go to the LLM when the request does not say
    pub fallback_default: bool,
    pub llm_timeout_secs: u64,
    pub llm_backend: AgentBackend,
    /// Provider default when unset
    pub llm_model: Option<String>,
    /// HiGlass tile server serving the cell-type tracks
    pub higlass_server: String,
    /// JSON bundle with cells, genome and track table
    pub dataset_bundle: PathBuf,
    /// Base URL used when building share links
    pub public_base_url: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            max_panels: DEFAULT_MAX_PANELS,
            fallback_default: false,
            llm_timeout_secs: 30,
            llm_backend: AgentBackend::default(),
            llm_model: None,
            higlass_server: "http://localhost:8989/api/v1".to_string(),
            dataset_bundle: PathBuf::from("data/demo_bundle.json"),
            public_base_url: "http://localhost:3000/".to_string(),
        }
    }
}

impl BrowserConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup("WMB_CONFIG") {
            Some(path) => Self::from_yaml_file(&path)?,
            None => Self::default(),
        };

        if let Some(v) = lookup("WMB_BIND_ADDRESS") {
            config.bind_address = v;
        }
        if let Some(v) = lookup("WMB_PORT") {
            config.port = parse_var("WMB_PORT", &v)?;
        }
        if let Some(v) = lookup("WMB_MAX_PANELS") {
            config.max_panels = parse_var("WMB_MAX_PANELS", &v)?;
        }
        if let Some(v) = lookup("WMB_FALLBACK") {
            config.fallback_default = parse_bool("WMB_FALLBACK", &v)?;
        }
        if let Some(v) = lookup("WMB_LLM_TIMEOUT_SECS") {
            config.llm_timeout_secs = parse_var("WMB_LLM_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("WMB_LLM_BACKEND") {
            config.llm_backend = parse_var("WMB_LLM_BACKEND", &v)?;
        }
        if let Some(v) = lookup("WMB_LLM_MODEL") {
            config.llm_model = Some(v.trim().to_string()).filter(|m| !m.is_empty());
        }
        if let Some(v) = lookup("WMB_HIGLASS_SERVER") {
            config.higlass_server = v;
        }
        if let Some(v) = lookup("WMB_DATASET_BUNDLE") {
            config.dataset_bundle = PathBuf::from(v);
        }
        if let Some(v) = lookup("WMB_PUBLIC_URL") {
            config.public_base_url = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!("Loading browser config from {}", path.display());
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_panels == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_panels".into(),
                value: "0".into(),
            });
        }
        url::Url::parse(&self.public_base_url).map_err(|source| ConfigError::InvalidUrl {
            value: self.public_base_url.clone(),
            source,
        })?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.bind_address, self.port);
        raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: "bind_address".into(),
            value: raw,
        })
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
