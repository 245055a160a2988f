//! # Tessera Configuration
//!
//! Loader settings ([`LoaderConfig`]) and the file formats shared by
//! configuration files and module manifests ([`ConfigFormat`]).
//!
//! JSON is always available; YAML and TOML sit behind the `yaml-config` and
//! `toml-config` features (both enabled by default).
pub mod error;

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::kernel::constants;
use crate::kernel::error::SharedError;
use crate::module_system::registry::is_valid_name;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }

    /// Human-readable format name, used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "JSON",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "YAML",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "TOML",
        }
    }

    /// Deserialize a document in this format
    pub fn deserialize<T: DeserializeOwned>(&self, data: &str) -> Result<T, SharedError> {
        match self {
            ConfigFormat::Json => serde_json::from_str(data).map_err(|e| Arc::new(e) as SharedError),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| Arc::new(e) as SharedError),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(|e| Arc::new(e) as SharedError),
        }
    }

    /// Serialize a value to this format
    pub fn serialize<T: Serialize>(&self, value: &T) -> Result<String, SharedError> {
        match self {
            ConfigFormat::Json => serde_json::to_string_pretty(value).map_err(|e| Arc::new(e) as SharedError),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(value).map_err(|e| Arc::new(e) as SharedError),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(value).map_err(|e| Arc::new(e) as SharedError),
        }
    }
}

/// How the stop orchestrator walks the ranked modules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopStrategy {
    /// One module at a time, strictly by descending rank.
    #[default]
    Sequential,
    /// All modules of a rank concurrently, rank tiers in descending order.
    Tiered,
}

/// Settings for a [`ModuleLoader`](crate::kernel::ModuleLoader).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Prefix of generated names for anonymous modules
    pub anonymous_prefix: String,
    /// Stop orchestration variant
    pub stop_strategy: StopStrategy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            anonymous_prefix: constants::DEFAULT_ANONYMOUS_PREFIX.to_string(),
            stop_strategy: StopStrategy::default(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from a file, choosing the format by extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::UnsupportedConfigFormat(path.display().to_string()))?;
        let data = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: Arc::new(e),
        })?;
        log::debug!("Loading {} loader configuration from {}", format.name(), path.display());
        Self::parse(&data, format)
    }

    /// Parse configuration from a string
    pub fn parse(data: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let config: LoaderConfig = format
            .deserialize(data)
            .map_err(|source| ConfigError::DeserializationError {
                format: format.name().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a string
    pub fn to_string_as(&self, format: ConfigFormat) -> Result<String, ConfigError> {
        format.serialize(self).map_err(|source| ConfigError::SerializationError {
            format: format.name().to_string(),
            source,
        })
    }

    /// Reject settings the registry cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_name(&self.anonymous_prefix) {
            return Err(ConfigError::InvalidValue {
                key: "anonymous_prefix".to_string(),
                reason: format!("'{}' is not a valid module name prefix", self.anonymous_prefix),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
