//! Configuration types for the dashboard client

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub toasts: ToastConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Where the KidsGuard backend lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Periods of the background pollers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_relay_interval", with = "humantime_serde")]
    pub relay_interval: Duration,
    #[serde(default = "default_webhook_interval", with = "humantime_serde")]
    pub webhook_interval: Duration,
    #[serde(default = "default_jobs_interval", with = "humantime_serde")]
    pub jobs_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            relay_interval: default_relay_interval(),
            webhook_interval: default_webhook_interval(),
            jobs_interval: default_jobs_interval(),
        }
    }
}

/// Stream preview settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Host name passed to the Twitch player as `parent`
    #[serde(default = "default_embed_parent")]
    pub embed_parent: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            embed_parent: default_embed_parent(),
        }
    }
}

/// Toast tray settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToastConfig {
    #[serde(default = "default_max_visible")]
    pub max_visible: usize,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            max_visible: default_max_visible(),
        }
    }
}

/// Local dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_dashboard_port(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5001".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_relay_interval() -> Duration {
    Duration::from_secs(6)
}

fn default_webhook_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_jobs_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_embed_parent() -> String {
    "localhost".to_string()
}

fn default_max_visible() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_dashboard_port() -> u16 {
    11120
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::KidsGuardError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
