pub mod config;
pub mod diagnostics;
pub mod kernel;
pub mod module_system;
pub mod orchestrator;
pub mod task;

// Re-export key public types for easier use by the binary and by hosts
pub use config::{ConfigFormat, LoaderConfig, StopStrategy};
pub use diagnostics::{DiagnosticSink, LifecycleEvent, RecordingSink};
pub use kernel::error::{Error, Result};
pub use kernel::{ModuleLoader, Resolution};
pub use module_system::{
    BoxError, Component, Dependencies, ManifestLoader, ModuleDefinition, ModuleState, ModuleValue,
};
pub use orchestrator::{StartHandle, StopHandle};
pub use task::DeferredTask;
