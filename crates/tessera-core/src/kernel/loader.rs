use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use futures::future::{self, BoxFuture, FutureExt};

use crate::config::LoaderConfig;
use crate::diagnostics::{DiagnosticSink, Diagnostics};
use crate::kernel::error::{Error, Result};
use crate::module_system::definition::ModuleDefinition;
use crate::module_system::error::{DefinitionFault, ModuleSystemError};
use crate::module_system::record::ModuleState;
use crate::module_system::registry::{ModuleRegistry, is_valid_name};
use crate::module_system::resolver::OrderResolver;
use crate::module_system::value::ModuleValue;
use crate::orchestrator::{StartHandle, StartPass, StopHandle, StopPass};

/// Future of a module's resolved value.
pub type Resolution = BoxFuture<'static, Result<Option<ModuleValue>>>;

struct LoaderInner {
    config: LoaderConfig,
    registry: Mutex<ModuleRegistry>,
    start_pass: OnceLock<StartPass>,
    stop_pass: OnceLock<StopPass>,
    diagnostics: Diagnostics,
}

/// Owns a set of modules and drives their lifecycle.
///
/// Cloning gives another handle on the same loader. Modules are registered
/// first; the first call to [`start`](Self::start) (or to a resolve method)
/// closes registration, ranks the modules and starts them.
#[derive(Clone)]
pub struct ModuleLoader {
    inner: Arc<LoaderInner>,
}

impl ModuleLoader {
    pub fn new() -> Self {
        Self::with_config(LoaderConfig::default())
    }

    pub fn with_config(config: LoaderConfig) -> Self {
        let registry = ModuleRegistry::with_anonymous_prefix(config.anonymous_prefix.clone());
        Self {
            inner: Arc::new(LoaderInner {
                config,
                registry: Mutex::new(registry),
                start_pass: OnceLock::new(),
                stop_pass: OnceLock::new(),
                diagnostics: Diagnostics::new(),
            }),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    /// Register a module. Fails once the loader has been started.
    pub fn register(&self, definition: ModuleDefinition) -> Result<()> {
        self.registry().register(definition)?;
        Ok(())
    }

    /// Register a module without dependencies whose value is `value`.
    pub fn register_value<T: Any + Send + Sync>(&self, name: impl Into<String>, value: T) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(ModuleSystemError::invalid(name, DefinitionFault::MissingName).into());
        }
        let value = ModuleValue::new(value);
        self.register(ModuleDefinition::new(name).on_start(move |_| {
            let value = value.clone();
            async move { Ok(Some(value)) }
        }))
    }

    /// Registered module names, in registration order.
    pub fn list(&self) -> Vec<String> {
        self.registry().list()
    }

    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry().is_empty()
    }

    /// Start every registered module. Calling it again returns the same handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> StartHandle {
        self.start_pass().handle()
    }

    pub fn is_started(&self) -> bool {
        self.inner.start_pass.get().is_some()
    }

    /// Stop every started module and cancel the ones that have not begun
    /// starting. Calling it again returns the same handle.
    pub fn stop(&self) -> Result<StopHandle> {
        let start = self.inner.start_pass.get().ok_or(Error::NotStarted)?;
        let pass = self
            .inner
            .stop_pass
            .get_or_init(|| StopPass::launch(start, self.inner.config.stop_strategy, self.inner.diagnostics.clone()));
        Ok(pass.handle())
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stop_pass.get().is_some()
    }

    /// Value of the module called `name`, starting the loader if needed.
    ///
    /// An unknown name resolves to `None`.
    pub fn resolve(&self, name: &str) -> Result<Resolution> {
        if !is_valid_name(name) {
            return Err(ModuleSystemError::InvalidName { name: name.to_string() }.into());
        }
        if !self.registry().contains(name) {
            log::debug!("Module '{}' is not registered", name);
            return Ok(future::ready(Ok(None)).boxed());
        }

        let pass = self.start_pass();
        if let Some(fault) = pass.fault() {
            return Ok(future::ready(Err(fault.clone())).boxed());
        }
        match pass.task(name) {
            Some(task) => Ok(task.outcome().boxed()),
            None => Ok(future::ready(Ok(None)).boxed()),
        }
    }

    /// Values of several modules, in the order given. All names are checked
    /// before anything starts.
    pub fn resolve_many(&self, names: &[&str]) -> Result<BoxFuture<'static, Result<Vec<Option<ModuleValue>>>>> {
        if let Some(name) = names.iter().find(|name| !is_valid_name(name)) {
            return Err(ModuleSystemError::InvalidName { name: name.to_string() }.into());
        }
        let resolutions = names
            .iter()
            .map(|name| self.resolve(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(future::try_join_all(resolutions).boxed())
    }

    /// Value of the module called `name` as a `T`. `None` when the module is
    /// unknown, has no value, or holds another type.
    pub async fn resolve_as<T: Any + Send + Sync>(&self, name: &str) -> Result<Option<Arc<T>>> {
        let value = self.resolve(name)?.await?;
        Ok(value.and_then(|value| value.downcast::<T>()))
    }

    /// Start order as `(name, rank)` pairs, without starting anything.
    pub fn plan(&self) -> Result<Vec<(String, usize)>> {
        let modules = self.registry().modules().to_vec();
        let plan = OrderResolver::plan(&modules)?;
        Ok(plan.into_iter().map(|ranked| (ranked.name, ranked.rank)).collect())
    }

    /// Rank of `name`, once the loader has been started.
    pub fn rank_of(&self, name: &str) -> Option<usize> {
        self.registry().get(name).and_then(|record| record.rank())
    }

    pub fn status_of(&self, name: &str) -> Option<ModuleState> {
        self.registry().get(name).map(|record| record.state())
    }

    /// Observe lifecycle events of this loader's modules.
    pub fn add_sink(&self, sink: Arc<dyn DiagnosticSink>) {
        self.inner.diagnostics.subscribe(sink);
    }

    fn start_pass(&self) -> &StartPass {
        self.inner.start_pass.get_or_init(|| {
            let modules = {
                let mut registry = self.registry();
                registry.close();
                registry.modules().to_vec()
            };
            StartPass::launch(modules, self.inner.diagnostics.clone())
        })
    }

    fn registry(&self) -> MutexGuard<'_, ModuleRegistry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("modules", &self.list())
            .field("started", &self.is_started())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
