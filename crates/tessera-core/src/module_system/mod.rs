//! # Tessera Module System
//!
//! Everything that describes modules before they run: how they are defined,
//! validated, stored and ordered.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`definition`]**: [`ModuleDefinition`], the builder every registration
//!   shape goes through, and the [`Component`] trait for binding an object's
//!   lifecycle as a module.
//! - **[`value`]**: [`ModuleValue`], the type-erased shared value a module
//!   produces, and [`Dependencies`], the values a behavior receives.
//! - **[`record`]**: [`ModuleRecord`], one registered module and its lifecycle
//!   state.
//! - **[`registry`]**: [`ModuleRegistry`], validation and insertion-ordered
//!   storage of records.
//! - **[`resolver`]**: [`OrderResolver`], dependency ranking with missing
//!   dependency and cycle detection.
//! - **[`loader`]**: [`ManifestLoader`], module definitions read from JSON,
//!   TOML or YAML files.
//! - **[`error`]**: registration, graph and manifest errors.
pub mod definition;
pub mod error;
pub mod loader;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod value;

pub use definition::{BoxError, Component, DependencyList, ModuleDefinition, ModuleDescriptor};
pub use error::{DefinitionFault, ManifestError, ModuleSystemError};
pub use loader::{ManifestContext, ManifestLoader, ModuleFactory};
pub use record::{ModuleRecord, ModuleState};
pub use registry::ModuleRegistry;
pub use resolver::{OrderResolver, RankedModule};
pub use value::{Dependencies, ModuleValue};

// Test module declaration
#[cfg(test)]
mod tests;
