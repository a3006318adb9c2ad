//! # Monitor Configuration System
//!
//! YAML-based configuration with per-environment override sections, followed
//! by `DFM_*` environment variable overrides.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use durable_monitor::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let page_size = manager.config().listing.instance_page_size;
//! let timeout = manager.config().parent_resolution.timeout();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_INSTANCE_PAGE_SIZE, PARENT_SEARCH_TIMEOUT, PARENT_SEARCH_WINDOW};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring monitor-config.yaml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Storage connections (default and alternatives)
    pub storage: StorageConfig,

    /// Task hub allow-list sourcing
    pub task_hubs: TaskHubsConfig,

    /// Instance listing
    pub listing: ListingConfig,

    /// Parent instance resolution
    pub parent_resolution: ParentResolutionConfig,

    /// Custom tab templates
    pub templates: TemplatesConfig,

    /// HTTP surface
    pub web: WebConfig,

    /// Request gate
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Connection URL of the default storage backend
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Named alternative connections; their hubs are exposed as `<name>-<hub>`
    pub alternative_connections: BTreeMap<String, String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 10,
            alternative_connections: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TaskHubsConfig {
    /// Comma-separated explicit allow-list. Skips storage entirely when set.
    pub hub_names: Option<String>,
    /// Deployment descriptor (host.json) consulted for the hub name
    pub host_json_path: Option<PathBuf>,
    /// Allow-list is reloaded when older than this
    pub refresh_interval_seconds: u64,
}

impl Default for TaskHubsConfig {
    fn default() -> Self {
        Self {
            hub_names: None,
            host_json_path: None,
            refresh_interval_seconds: 300,
        }
    }
}

impl TaskHubsConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }

    /// Explicit allow-list override, split and trimmed
    pub fn explicit_hub_names(&self) -> Option<Vec<String>> {
        let raw = self.hub_names.as_deref()?;
        let names: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(names)
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListingConfig {
    pub instance_page_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            instance_page_size: DEFAULT_INSTANCE_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ParentResolutionConfig {
    pub search_window_seconds: u64,
    pub timeout_seconds: u64,
}

impl Default for ParentResolutionConfig {
    fn default() -> Self {
        Self {
            search_window_seconds: PARENT_SEARCH_WINDOW.as_secs(),
            timeout_seconds: PARENT_SEARCH_TIMEOUT.as_secs(),
        }
    }
}

impl ParentResolutionConfig {
    pub fn search_window(&self) -> Duration {
        Duration::from_secs(self.search_window_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Local folder with a `tab-templates` subfolder. When unset, templates
    /// are read from the storage backend.
    pub folder: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebConfig {
    pub bind_address: String,
    pub request_timeout_ms: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:7072".to_string(),
            request_timeout_ms: 230_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// When set, every request must carry it in `x-dfm-nonce`
    pub nonce: Option<String>,
    /// Compare the XSRF header against the XSRF cookie
    pub xsrf_check: bool,
    pub allowed_user_names: Option<Vec<String>>,
    pub read_only: bool,
}

impl MonitorConfig {
    /// Validate the loaded configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.listing.instance_page_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "listing.instance_page_size",
                "0",
                "Page size must be greater than zero",
            ));
        }

        if self.parent_resolution.timeout_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "parent_resolution.timeout_seconds",
                "0",
                "Timeout must be greater than zero",
            ));
        }

        if self.storage.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "storage.max_connections",
                "0",
                "Pool size must be greater than zero",
            ));
        }

        if self
            .web
            .bind_address
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigurationError::invalid_value(
                "web.bind_address",
                self.web.bind_address.clone(),
                "Expected host:port",
            ));
        }

        for (name, url) in &self.storage.alternative_connections {
            if url.trim().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    format!("storage.alternative_connections.{name}"),
                    "",
                    "Connection string cannot be empty",
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.listing.instance_page_size, 500);
        assert_eq!(config.parent_resolution.timeout(), Duration::from_secs(15));
        assert_eq!(config.parent_resolution.search_window(), Duration::from_secs(5));
    }

    #[test]
    fn test_explicit_hub_names_split() {
        let config = TaskHubsConfig {
            hub_names: Some(" HubA, HubB ,,".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.explicit_hub_names(),
            Some(vec!["HubA".to_string(), "HubB".to_string()])
        );

        let empty = TaskHubsConfig {
            hub_names: Some(" , ".to_string()),
            ..Default::default()
        };
        assert_eq!(empty.explicit_hub_names(), None);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = MonitorConfig::default();
        config.listing.instance_page_size = 0;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.web.bind_address = "not-an-address".to_string();
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config
            .storage
            .alternative_connections
            .insert("backup".to_string(), "  ".to_string());
        assert!(config.validate().is_err());
    }
}
