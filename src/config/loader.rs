//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles YAML file discovery,
//! environment detection, override merging and `DFM_*` variable overrides.

use super::error::{ConfigResult, ConfigurationError};
use super::MonitorConfig;
use serde_yaml::Value as YamlValue;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CONFIG_FILE_NAMES: [&str; 2] = ["monitor-config.yaml", "monitor-config.yml"];
const ENVIRONMENT_SECTIONS: [&str; 3] = ["development", "test", "production"];
const ALTERNATIVE_CONNECTION_PREFIX: &str = "DFM_ALTERNATIVE_CONNECTION_STRING_";

/// Loaded configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: MonitorConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = crate::logging::get_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    ///
    /// Process environment variables are applied on top of the YAML values.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_overrides(config_dir, environment, env::vars())
    }

    /// Load configuration with an explicit set of environment variables
    pub fn load_with_overrides<I>(
        config_dir: Option<PathBuf>,
        environment: &str,
        vars: I,
    ) -> ConfigResult<Arc<ConfigManager>>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading monitor configuration"
        );

        let mut config = match Self::find_config_file(&config_directory) {
            Ok(config_file) => Self::load_and_merge_config(&config_file, environment)?,
            Err(e) => {
                debug!(error = %e, "No configuration file found, using defaults");
                MonitorConfig::default()
            }
        };

        apply_environment_overrides(&mut config, vars);
        config.validate()?;

        info!(
            environment = %environment,
            explicit_hubs = config.task_hubs.hub_names.is_some(),
            alternative_connections = config.storage.alternative_connections.len(),
            read_only = config.auth.read_only,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    fn find_config_file(config_directory: &Path) -> ConfigResult<PathBuf> {
        let mut searched_paths = Vec::new();

        for name in CONFIG_FILE_NAMES {
            let config_path = config_directory.join(name);
            searched_paths.push(config_path.clone());

            if config_path.is_file() {
                debug!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        Err(ConfigurationError::config_file_not_found(searched_paths))
    }

    fn load_and_merge_config(config_file: &Path, environment: &str) -> ConfigResult<MonitorConfig> {
        let yaml_content = std::fs::read_to_string(config_file)
            .map_err(|e| ConfigurationError::file_read_error(config_file.display().to_string(), e))?;

        let mut yaml_data: YamlValue = serde_yaml::from_str(&yaml_content)
            .map_err(|e| ConfigurationError::invalid_yaml(config_file.display().to_string(), e))?;

        if let Some(env_overrides) = yaml_data
            .get(YamlValue::String(environment.to_string()))
            .cloned()
        {
            debug!("Applying environment-specific overrides for: {}", environment);
            merge_yaml_values(&mut yaml_data, env_overrides);
        }

        if let YamlValue::Mapping(ref mut map) = yaml_data {
            for section in ENVIRONMENT_SECTIONS {
                map.remove(YamlValue::String(section.to_string()));
            }
        }

        serde_yaml::from_value(yaml_data).map_err(|e| {
            ConfigurationError::invalid_yaml(
                config_file.display().to_string(),
                format!("Failed to deserialize configuration: {e}"),
            )
        })
    }
}

/// Recursively merge YAML values (environment overrides into base config)
fn merge_yaml_values(base: &mut YamlValue, override_value: YamlValue) {
    match (&mut *base, override_value) {
        (YamlValue::Mapping(base_map), YamlValue::Mapping(override_map)) => {
            for (key, value) in override_map {
                if let Some(existing_value) = base_map.get_mut(&key) {
                    merge_yaml_values(existing_value, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_ref, override_val) => {
            *base_ref = override_val;
        }
    }
}

/// Apply `DFM_*` environment variables on top of the file configuration
pub fn apply_environment_overrides<I>(config: &mut MonitorConfig, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        if value.trim().is_empty() {
            continue;
        }

        match key.as_str() {
            "DFM_HUB_NAME" => config.task_hubs.hub_names = Some(value),
            "DFM_HOST_JSON_PATH" => config.task_hubs.host_json_path = Some(PathBuf::from(value)),
            "DFM_DATABASE_URL" => config.storage.database_url = Some(value),
            "DFM_CUSTOM_TEMPLATES_FOLDER" => config.templates.folder = Some(PathBuf::from(value)),
            "DFM_NONCE" => config.auth.nonce = Some(value),
            "DFM_MODE" => config.auth.read_only = value.eq_ignore_ascii_case("readonly"),
            "DFM_ALLOWED_USER_NAMES" => {
                config.auth.allowed_user_names = Some(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(String::from)
                        .collect(),
                )
            }
            other => {
                if let Some(connection_name) = other.strip_prefix(ALTERNATIVE_CONNECTION_PREFIX) {
                    if !connection_name.is_empty() {
                        config
                            .storage
                            .alternative_connections
                            .insert(connection_name.to_string(), value);
                    }
                }
            }
        }
    }
}
