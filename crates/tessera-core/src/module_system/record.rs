use std::fmt;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use crate::module_system::definition::{StartBehavior, StopBehavior};
use crate::module_system::error::ModuleSystemError;
use crate::module_system::value::ModuleValue;

/// Where a module is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleState {
    /// Registered, start not reached yet
    Registered,
    /// Start behavior running
    Starting,
    /// Start behavior completed with a value
    Started,
    /// Start behavior, or one of the dependencies, failed
    Failed,
    /// Stop was requested before start was reached; never runs
    Cancelled,
    /// Stop behavior running
    Stopping,
    /// Stop behavior completed
    Stopped,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ModuleState::Registered => "registered",
            ModuleState::Starting => "starting",
            ModuleState::Started => "started",
            ModuleState::Failed => "failed",
            ModuleState::Cancelled => "cancelled",
            ModuleState::Stopping => "stopping",
            ModuleState::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// What the stop orchestrator does with a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopDisposition {
    /// Started or starting: stop it once its start settles
    Schedule,
    /// Never reached start: it is now cancelled
    Cancel,
    /// Failed, or already handled: nothing to do
    Skip,
}

/// One registered module: identity, dependencies, behaviors and runtime status.
pub struct ModuleRecord {
    name: String,
    anonymous: bool,
    dependency_names: Vec<String>,
    start: StartBehavior,
    stop: StopBehavior,
    rank: OnceLock<usize>,
    resolved_value: OnceLock<ModuleValue>,
    state: Mutex<ModuleState>,
}

impl ModuleRecord {
    pub(crate) fn new(
        name: String,
        anonymous: bool,
        dependency_names: Vec<String>,
        start: StartBehavior,
        stop: StopBehavior,
    ) -> Self {
        Self {
            name,
            anonymous,
            dependency_names,
            start,
            stop,
            rank: OnceLock::new(),
            resolved_value: OnceLock::new(),
            state: Mutex::new(ModuleState::Registered),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    pub fn dependency_names(&self) -> &[String] {
        &self.dependency_names
    }

    pub fn is_root(&self) -> bool {
        self.dependency_names.is_empty()
    }

    pub(crate) fn start_behavior(&self) -> &StartBehavior {
        &self.start
    }

    pub(crate) fn stop_behavior(&self) -> &StopBehavior {
        &self.stop
    }

    pub fn rank(&self) -> Option<usize> {
        self.rank.get().copied()
    }

    /// Assign the rank. A rank is assigned once; a second assignment is rejected.
    pub fn set_rank(&self, rank: usize) -> Result<(), ModuleSystemError> {
        self.rank.set(rank).map_err(|_| ModuleSystemError::RankAlreadyAssigned {
            module: self.name.clone(),
            rank: self.rank().unwrap_or(rank),
        })
    }

    pub fn resolved_value(&self) -> Option<&ModuleValue> {
        self.resolved_value.get()
    }

    pub fn state(&self) -> ModuleState {
        *self.lock_state()
    }

    pub fn is_starting(&self) -> bool {
        self.state() == ModuleState::Starting
    }

    /// True once start completed, including after the module has been stopped.
    pub fn is_started(&self) -> bool {
        matches!(
            self.state(),
            ModuleState::Started | ModuleState::Stopping | ModuleState::Stopped
        )
    }

    pub fn is_stopping(&self) -> bool {
        self.state() == ModuleState::Stopping
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == ModuleState::Stopped
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == ModuleState::Cancelled
    }

    pub fn is_failed(&self) -> bool {
        self.state() == ModuleState::Failed
    }

    /// Move to `Starting` unless stop got here first. Returns whether start may run.
    pub(crate) fn begin_start(&self) -> bool {
        let mut state = self.lock_state();
        if *state == ModuleState::Registered {
            *state = ModuleState::Starting;
            true
        } else {
            false
        }
    }

    pub(crate) fn finish_start(&self, value: Option<ModuleValue>) {
        if let Some(value) = value {
            // Only the start task writes the value, and it runs once.
            let _ = self.resolved_value.set(value);
        }
        self.transition(ModuleState::Started);
    }

    /// Mark start as failed. A cancelled module stays cancelled.
    pub(crate) fn fail_start(&self) {
        let mut state = self.lock_state();
        if *state != ModuleState::Cancelled {
            log::trace!("Module '{}': {} -> {}", self.name, *state, ModuleState::Failed);
            *state = ModuleState::Failed;
        }
    }

    /// Decide, atomically with respect to `begin_start`, how stop treats this module.
    pub(crate) fn decide_stop(&self) -> StopDisposition {
        let mut state = self.lock_state();
        match *state {
            ModuleState::Started | ModuleState::Starting => StopDisposition::Schedule,
            ModuleState::Registered => {
                *state = ModuleState::Cancelled;
                StopDisposition::Cancel
            }
            ModuleState::Failed
            | ModuleState::Cancelled
            | ModuleState::Stopping
            | ModuleState::Stopped => StopDisposition::Skip,
        }
    }

    pub(crate) fn begin_stop(&self) {
        self.transition(ModuleState::Stopping);
    }

    pub(crate) fn finish_stop(&self) {
        self.transition(ModuleState::Stopped);
    }

    fn transition(&self, next: ModuleState) {
        let mut state = self.lock_state();
        log::trace!("Module '{}': {} -> {}", self.name, *state, next);
        *state = next;
    }

    fn lock_state(&self) -> MutexGuard<'_, ModuleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRecord")
            .field("name", &self.name)
            .field("anonymous", &self.anonymous)
            .field("dependency_names", &self.dependency_names)
            .field("rank", &self.rank())
            .field("state", &self.state())
            .finish()
    }
}
