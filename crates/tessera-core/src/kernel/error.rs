//! # Tessera Kernel Errors
//!
//! Defines the root error type of the orchestrator.
//!
//! [`Error`] wraps the subsystem errors ([`ModuleSystemError`],
//! [`ManifestError`], [`ConfigError`]) and carries the lifecycle failures
//! raised while modules start and stop. Every variant is `Clone`, since a
//! single failure is observed through shared futures by every dependent
//! module, by `resolve` callers and by the aggregate start/stop handles.
use std::error::Error as StdError;
use std::result::Result as StdResult;
use std::sync::Arc;

use thiserror::Error as ThisError;

use crate::config::error::ConfigError;
use crate::module_system::error::{ManifestError, ModuleSystemError};

/// Error raised by a module's own start or stop behavior, shared between observers.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Clone, ThisError)]
pub enum Error {
    /// Registration, validation and graph ordering errors
    #[error("Module system error: {0}")]
    ModuleSystem(#[from] ModuleSystemError),

    /// Errors while loading module manifests from disk
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Errors while loading loader configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A deferred task was triggered a second time
    #[error("Task already executed")]
    AlreadyExecuted,

    /// `stop` was requested before `start`
    #[error("Cannot stop, loader not even started")]
    NotStarted,

    /// A module's start behavior returned an error
    #[error("Module '{module}' failed to start: {source}")]
    StartFailed {
        module: String,
        #[source]
        source: SharedError,
    },

    /// A module could not start because one of its dependencies failed
    #[error("Module '{module}' could not start, dependency '{dependency}' failed: {source}")]
    DependencyFailed {
        module: String,
        dependency: String,
        #[source]
        source: Box<Error>,
    },

    /// A module's stop behavior returned an error
    #[error("Module '{module}' failed to stop: {source}")]
    StopFailed {
        module: String,
        #[source]
        source: SharedError,
    },
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl Error {
    /// Follows `DependencyFailed` wrappers down to the failure that caused them.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::DependencyFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Whether this error only reports the failure of another module.
    pub fn is_propagated(&self) -> bool {
        matches!(self, Error::DependencyFailed { .. })
    }
}
