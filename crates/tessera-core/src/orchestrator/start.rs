use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{self, FutureExt};

use crate::diagnostics::{Diagnostics, LifecycleEvent};
use crate::kernel::error::{Error, Result, SharedError};
use crate::module_system::error::ModuleSystemError;
use crate::module_system::record::ModuleRecord;
use crate::module_system::resolver::OrderResolver;
use crate::module_system::value::{Dependencies, ModuleValue};
use crate::orchestrator::{StartHandle, panic_error};
use crate::task::{DeferredTask, TaskOutcome};

/// Result of starting one module. `Ok(None)` for anonymous modules without a
/// value and for modules cancelled before they started.
pub type ModuleOutcome = std::result::Result<Option<ModuleValue>, Error>;

/// The deferred start of one module.
pub type StartTask = DeferredTask<(), ModuleOutcome>;

/// One run of the start protocol over the whole registry.
pub struct StartPass {
    modules: Vec<Arc<ModuleRecord>>,
    ordered: Vec<Arc<ModuleRecord>>,
    tasks: HashMap<String, StartTask>,
    fault: Option<Error>,
    aggregate: StartHandle,
}

impl StartPass {
    /// Rank `modules` (given in registration order) and start them all.
    ///
    /// A graph fault leaves every module untouched and fails the pass.
    /// Must be called from within a tokio runtime.
    pub fn launch(modules: Vec<Arc<ModuleRecord>>, diagnostics: Diagnostics) -> Self {
        log::info!("Starting {} modules", modules.len());

        let ranking = match OrderResolver::assign(&modules) {
            Ok(ranking) => ranking,
            Err(e) => {
                log::error!("Cannot start modules: {}", e);
                let fault = Error::from(e);
                return Self {
                    modules,
                    ordered: Vec::new(),
                    tasks: HashMap::new(),
                    aggregate: future::ready(Err(fault.clone())).boxed().shared(),
                    fault: Some(fault),
                };
            }
        };

        let ordered: Vec<Arc<ModuleRecord>> = ranking
            .ascending()
            .into_iter()
            .map(|position| Arc::clone(&modules[position]))
            .collect();

        // Dependencies always rank lower, so their tasks exist by the time a
        // dependent is wired.
        let mut tasks: HashMap<String, StartTask> = HashMap::with_capacity(ordered.len());
        for record in &ordered {
            let dependencies: Vec<(String, TaskOutcome<ModuleOutcome>)> = record
                .dependency_names()
                .iter()
                .filter_map(|name| tasks.get(name).map(|task| (name.clone(), task.outcome())))
                .collect();
            let task_record = Arc::clone(record);
            let task_diagnostics = diagnostics.clone();
            let task = StartTask::new(move |()| start_module(task_record, dependencies, task_diagnostics));
            tasks.insert(record.name().to_string(), task);
        }

        for record in &ordered {
            if let Some(task) = tasks.get(record.name()) {
                if let Err(e) = task.execute(()) {
                    log::error!("Start task for module '{}' could not be released: {}", record.name(), e);
                }
            }
        }

        let outcomes: Vec<(String, TaskOutcome<ModuleOutcome>)> = modules
            .iter()
            .filter_map(|record| {
                tasks
                    .get(record.name())
                    .map(|task| (record.name().to_string(), task.outcome()))
            })
            .collect();
        let aggregate = collect_start(outcomes).boxed().shared();

        Self {
            modules,
            ordered,
            tasks,
            fault: None,
            aggregate,
        }
    }

    /// The shared outcome of the whole pass.
    pub fn handle(&self) -> StartHandle {
        self.aggregate.clone()
    }

    /// The graph fault that prevented any module from starting.
    pub fn fault(&self) -> Option<&Error> {
        self.fault.as_ref()
    }

    pub fn task(&self, name: &str) -> Option<&StartTask> {
        self.tasks.get(name)
    }

    /// Modules in registration order.
    pub fn modules(&self) -> &[Arc<ModuleRecord>] {
        &self.modules
    }

    /// Modules in start order. Empty after a graph fault.
    pub fn ordered(&self) -> &[Arc<ModuleRecord>] {
        &self.ordered
    }
}

impl std::fmt::Debug for StartPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartPass")
            .field("modules", &self.modules.len())
            .field("fault", &self.fault)
            .finish()
    }
}

async fn start_module(
    record: Arc<ModuleRecord>,
    dependencies: Vec<(String, TaskOutcome<ModuleOutcome>)>,
    diagnostics: Diagnostics,
) -> ModuleOutcome {
    let name = record.name().to_string();

    let mut values = Vec::with_capacity(dependencies.len());
    for (dependency, outcome) in dependencies {
        match outcome.await {
            Ok(value) => values.push((dependency, value)),
            Err(source) => {
                record.fail_start();
                let error = Error::DependencyFailed {
                    module: name.clone(),
                    dependency,
                    source: Box::new(source),
                };
                diagnostics.emit(LifecycleEvent::StartFailed {
                    module: name,
                    message: error.to_string(),
                });
                return Err(error);
            }
        }
    }

    if !record.begin_start() {
        log::debug!("Module '{}' was cancelled before it started", name);
        return Ok(None);
    }

    log::debug!("Starting module '{}'", name);
    diagnostics.emit(LifecycleEvent::Starting { module: name.clone() });
    let behavior = Arc::clone(record.start_behavior());
    let result = AssertUnwindSafe(async move { behavior(Dependencies::new(values)).await })
        .catch_unwind()
        .await;

    let error = match result {
        Ok(Ok(None)) if !record.is_anonymous() => Error::from(ModuleSystemError::MissingStartValue {
            module: name.clone(),
        }),
        Ok(Ok(value)) => {
            record.finish_start(value.clone());
            log::debug!("Module '{}' started", name);
            diagnostics.emit(LifecycleEvent::Started { module: name });
            return Ok(value);
        }
        Ok(Err(source)) => Error::StartFailed {
            module: name.clone(),
            source: SharedError::from(source),
        },
        Err(payload) => Error::StartFailed {
            module: name.clone(),
            source: panic_error(payload),
        },
    };

    record.fail_start();
    diagnostics.emit(LifecycleEvent::StartFailed {
        module: name,
        message: error.to_string(),
    });
    Err(error)
}

/// Wait for every module and report the first failure, in registration order.
/// A failure of the module itself wins over one that only reports a failed
/// dependency.
async fn collect_start(outcomes: Vec<(String, TaskOutcome<ModuleOutcome>)>) -> Result<()> {
    let (names, pending): (Vec<String>, Vec<_>) = outcomes.into_iter().unzip();
    let results = future::join_all(pending).await;

    let mut first_cause: Option<Error> = None;
    let mut first_any: Option<Error> = None;
    for (name, result) in names.iter().zip(results) {
        let Err(error) = result else { continue };
        if error.is_propagated() {
            log::warn!("Module '{}' was not started: {}", name, error);
        } else {
            log::error!("Module '{}' failed: {}", name, error);
            if first_cause.is_none() {
                first_cause = Some(error.clone());
            }
        }
        if first_any.is_none() {
            first_any = Some(error);
        }
    }

    match first_cause.or(first_any) {
        Some(error) => Err(error),
        None => {
            log::info!("All modules started");
            Ok(())
        }
    }
}
