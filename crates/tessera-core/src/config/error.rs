//! # Tessera Configuration Errors
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::kernel::error::SharedError;

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("I/O error while reading configuration '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Unsupported configuration format: {0}")]
    UnsupportedConfigFormat(String),

    #[error("Serialization to '{format}' failed: {source}")]
    SerializationError {
        format: String,
        #[source]
        source: SharedError,
    },

    #[error("Deserialization from '{format}' failed: {source}")]
    DeserializationError {
        format: String,
        #[source]
        source: SharedError,
    },

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}
