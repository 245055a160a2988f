//! # Tessera Module System Errors
//!
//! [`ModuleSystemError`] covers registration faults (rejected synchronously
//! by `register`) and graph faults (detected once, before any module runs).
//! [`ManifestError`] covers loading module definitions from disk.
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::kernel::error::SharedError;

/// Why a module definition was rejected at registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionFault {
    #[error("a module name is required")]
    MissingName,

    #[error("name must only contain letters, digits, '-' and '_'")]
    InvalidName,

    #[error("a module with this name is already registered")]
    Duplicate,

    #[error("dependencies must be a string or a sequence of strings")]
    InvalidDependencies,

    #[error("a module cannot depend on itself")]
    SelfDependency,

    #[error("invalid dependency names: {}", .0.join(", "))]
    InvalidDependencyNames(Vec<String>),

    #[error("value cannot be null")]
    MissingValue,
}

#[derive(Debug, Clone, Error)]
pub enum ModuleSystemError {
    #[error("Invalid definition for module '{module}': {fault}")]
    InvalidDefinition { module: String, fault: DefinitionFault },

    #[error("Cannot register module '{module}' once the loader has been started")]
    RegistrationClosed { module: String },

    #[error("Invalid module name: '{name}'")]
    InvalidName { name: String },

    #[error("Some dependencies could not be resolved: {}", .names.join(", "))]
    MissingDependency { names: Vec<String> },

    #[error("No module found without dependencies")]
    NoRootModule,

    #[error("Circular dependencies detected, some modules could not be ordered: {}", .modules.join(", "))]
    CircularDependency { modules: Vec<String> },

    #[error("Module '{module}' already has rank {rank}")]
    RankAlreadyAssigned { module: String, rank: usize },

    #[error("Module '{module}' should return a value to be used by other modules")]
    MissingStartValue { module: String },
}

impl ModuleSystemError {
    pub(crate) fn invalid(module: impl Into<String>, fault: DefinitionFault) -> Self {
        ModuleSystemError::InvalidDefinition { module: module.into(), fault }
    }

    /// True for faults that concern the dependency graph as a whole.
    pub fn is_graph_fault(&self) -> bool {
        matches!(
            self,
            ModuleSystemError::MissingDependency { .. }
                | ModuleSystemError::NoRootModule
                | ModuleSystemError::CircularDependency { .. }
        )
    }
}

#[derive(Debug, Clone, Error)]
pub enum ManifestError {
    #[error("I/O error during operation '{operation}' on path '{path}': {source}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Unsupported manifest format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Cannot derive a module name from path: {0}")]
    InvalidFileName(PathBuf),

    #[error("Failed to parse {format} manifest '{path}': {source}")]
    Parse {
        path: PathBuf,
        format: String,
        #[source]
        source: SharedError,
    },

    #[error("File {0} does not contain a valid module definition")]
    EmptyDefinition(PathBuf),

    #[error("Manifest '{path}' is not a valid module definition: {source}")]
    InvalidDefinition {
        path: PathBuf,
        #[source]
        source: ModuleSystemError,
    },

    #[error("Manifest '{path}' has a 'kind' that is not a string")]
    InvalidKind { path: PathBuf },

    #[error("Manifest '{path}' refers to unknown module kind '{kind}'")]
    UnknownKind { path: PathBuf, kind: String },

    #[error("Factory '{kind}' rejected manifest '{path}': {source}")]
    Factory {
        path: PathBuf,
        kind: String,
        #[source]
        source: SharedError,
    },

    #[error("Directory not found at path: {0}")]
    DirectoryNotFound(PathBuf),
}

impl ManifestError {
    pub(crate) fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        ManifestError::Io {
            path,
            operation: operation.into(),
            source: Arc::new(source),
        }
    }
}
