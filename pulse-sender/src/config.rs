use std::path::Path;
use std::time::Duration;

use pulse_bridge::{AppBridgeConfig, DEFAULT_MAX_FRAME_BYTES};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bridge: BridgeConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }
}

/// Which bridge client the sender drives.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BridgeConfig {
    /// Log events locally instead of publishing them.
    #[default]
    Noop,
    AppBridge(AppBridgeSettings),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppBridgeSettings {
    pub remote_app_id: String,
    pub remote_app_url_scheme: String,
    pub ios_app_group_id: String,
    /// Where the companion app accepts bridge connections.
    pub addr: String,
    pub timeout_secs: u64,
    pub max_frame_bytes: u32,
}

impl AppBridgeSettings {
    pub fn app_config(&self) -> AppBridgeConfig {
        AppBridgeConfig {
            remote_app_id: self.remote_app_id.clone(),
            remote_app_url_scheme: self.remote_app_url_scheme.clone(),
            ios_app_group_id: self.ios_app_group_id.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AppBridgeSettings {
    fn default() -> Self {
        let app = AppBridgeConfig::default();
        Self {
            remote_app_id: app.remote_app_id,
            remote_app_url_scheme: app.remote_app_url_scheme,
            ios_app_group_id: app.ios_app_group_id,
            addr: "127.0.0.1:9400".to_owned(),
            timeout_secs: 5,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}
