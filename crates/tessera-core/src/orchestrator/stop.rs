use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{self, FutureExt};

use crate::config::StopStrategy;
use crate::diagnostics::{Diagnostics, LifecycleEvent};
use crate::kernel::error::{Error, Result, SharedError};
use crate::module_system::record::{ModuleRecord, StopDisposition};
use crate::module_system::value::Dependencies;
use crate::orchestrator::{StopHandle, panic_error};
use crate::orchestrator::start::{ModuleOutcome, StartPass};
use crate::task::TaskOutcome;

/// A module whose stop has been scheduled.
struct StopLink {
    record: Arc<ModuleRecord>,
    dependencies: Vec<Arc<ModuleRecord>>,
    started: Option<TaskOutcome<ModuleOutcome>>,
}

/// One run of the stop protocol.
pub struct StopPass {
    scheduled: Vec<String>,
    cancelled: Vec<String>,
    aggregate: StopHandle,
}

impl StopPass {
    /// Decide what happens to every module of `start`, then stop the
    /// scheduled ones in descending rank.
    ///
    /// Every decision is taken before this returns: a module that has not
    /// begun starting by then is cancelled and never runs.
    pub fn launch(start: &StartPass, strategy: StopStrategy, diagnostics: Diagnostics) -> Self {
        if start.fault().is_some() {
            let mut cancelled = Vec::new();
            for record in start.modules() {
                if record.decide_stop() == StopDisposition::Cancel {
                    cancelled.push(record.name().to_string());
                }
            }
            log::info!("Module graph is invalid, nothing to stop");
            return Self {
                scheduled: Vec::new(),
                cancelled,
                aggregate: future::ready(Ok(())).boxed().shared(),
            };
        }

        let by_name: HashMap<&str, &Arc<ModuleRecord>> = start
            .modules()
            .iter()
            .map(|record| (record.name(), record))
            .collect();

        let mut descending: Vec<&Arc<ModuleRecord>> = start.modules().iter().collect();
        descending.sort_by_key(|record| std::cmp::Reverse(record.rank().unwrap_or(0)));

        let mut tiers: Vec<(usize, Vec<StopLink>)> = Vec::new();
        let mut scheduled = Vec::new();
        let mut cancelled = Vec::new();
        for record in descending {
            match record.decide_stop() {
                StopDisposition::Schedule => {
                    let link = StopLink {
                        record: Arc::clone(record),
                        dependencies: record
                            .dependency_names()
                            .iter()
                            .filter_map(|name| by_name.get(name.as_str()).map(|dep| Arc::clone(dep)))
                            .collect(),
                        started: start.task(record.name()).map(|task| task.outcome()),
                    };
                    scheduled.push(record.name().to_string());
                    let rank = record.rank().unwrap_or(0);
                    let same_tier = strategy == StopStrategy::Tiered
                        && tiers.last().is_some_and(|(tier_rank, _)| *tier_rank == rank);
                    match tiers.last_mut() {
                        Some((_, links)) if same_tier => links.push(link),
                        _ => tiers.push((rank, vec![link])),
                    }
                }
                StopDisposition::Cancel => {
                    log::warn!("Module '{}' was cancelled before it started", record.name());
                    diagnostics.emit(LifecycleEvent::Cancelled {
                        module: record.name().to_string(),
                    });
                    cancelled.push(record.name().to_string());
                }
                StopDisposition::Skip => {
                    log::debug!("Module '{}' has nothing to stop ({})", record.name(), record.state());
                }
            }
        }

        log::info!(
            "Stopping {} modules, {} cancelled ({:?} strategy)",
            scheduled.len(),
            cancelled.len(),
            strategy
        );
        let aggregate = run_tiers(tiers, diagnostics).boxed().shared();
        tokio::spawn(aggregate.clone());

        Self {
            scheduled,
            cancelled,
            aggregate,
        }
    }

    pub fn handle(&self) -> StopHandle {
        self.aggregate.clone()
    }

    /// Modules whose stop was scheduled, in stop order.
    pub fn scheduled(&self) -> &[String] {
        &self.scheduled
    }

    /// Modules cancelled by this pass.
    pub fn cancelled(&self) -> &[String] {
        &self.cancelled
    }
}

impl std::fmt::Debug for StopPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopPass")
            .field("scheduled", &self.scheduled)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

/// Run each tier after the previous one has finished. A failing stop does
/// not interrupt the chain; the first failure is reported at the end.
async fn run_tiers(tiers: Vec<(usize, Vec<StopLink>)>, diagnostics: Diagnostics) -> Result<()> {
    let mut first_error: Option<Error> = None;
    for (rank, links) in tiers {
        log::trace!("Stopping rank {} ({} modules)", rank, links.len());
        let results = future::join_all(links.into_iter().map(|link| stop_module(link, diagnostics.clone()))).await;
        for error in results.into_iter().filter_map(|result| result.err()) {
            log::error!("{}", error);
            if first_error.is_none() {
                first_error = Some(error);
            }
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => {
            log::info!("All modules stopped");
            Ok(())
        }
    }
}

async fn stop_module(link: StopLink, diagnostics: Diagnostics) -> Result<()> {
    let StopLink {
        record,
        dependencies,
        started,
    } = link;
    let name = record.name().to_string();

    if let Some(started) = started {
        if let Err(e) = started.await {
            log::warn!("Not stopping module '{}', it failed to start: {}", name, e);
            return Ok(());
        }
    }

    record.begin_stop();
    log::debug!("Stopping module '{}'", name);
    diagnostics.emit(LifecycleEvent::Stopping { module: name.clone() });

    let this = record.resolved_value().cloned();
    let dependencies = Dependencies::new(
        dependencies
            .iter()
            .map(|dep| (dep.name().to_string(), dep.resolved_value().cloned()))
            .collect(),
    );
    let behavior = Arc::clone(record.stop_behavior());
    let result = AssertUnwindSafe(async move { behavior(this, dependencies).await })
        .catch_unwind()
        .await;
    record.finish_stop();

    let source = match result {
        Ok(Ok(())) => {
            log::debug!("Module '{}' stopped", name);
            diagnostics.emit(LifecycleEvent::Stopped { module: name });
            return Ok(());
        }
        Ok(Err(source)) => SharedError::from(source),
        Err(payload) => panic_error(payload),
    };
    let error = Error::StopFailed {
        module: name.clone(),
        source,
    };
    diagnostics.emit(LifecycleEvent::StopFailed {
        module: name,
        message: error.to_string(),
    });
    Err(error)
}
