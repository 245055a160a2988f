//! # Tessera Kernel
//!
//! The `kernel` module is the entry point of the orchestrator.
//!
//! ## Key Responsibilities & Components:
//!
//! - **Module Loader**: [`ModuleLoader`](loader::ModuleLoader) owns the registry
//!   and drives the start and stop passes. Hosts construct one explicitly and
//!   share it by cloning the handle.
//! - **Core Constants**: names and manifest keys in the `constants` submodule.
//! - **Error Handling**: the root [`Error`](error::Error) type and `Result`
//!   alias in the `error` submodule.
pub mod constants;
pub mod error;
pub mod loader;

pub use error::{Error, Result};
pub use loader::{ModuleLoader, Resolution};
