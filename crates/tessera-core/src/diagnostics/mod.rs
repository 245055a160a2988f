//! # Lifecycle Diagnostics
//!
//! Optional observers of module lifecycle transitions. Sinks only receive
//! events; nothing they do feeds back into orchestration.
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Lifecycle transitions reported by the start and stop passes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Start behavior is about to run
    Starting { module: String },
    /// Start behavior produced the module's value
    Started { module: String },
    /// Start behavior, or a dependency, failed
    StartFailed { module: String, message: String },
    /// Stop arrived before start; the module never runs
    Cancelled { module: String },
    /// Stop behavior is about to run
    Stopping { module: String },
    /// Stop behavior completed
    Stopped { module: String },
    /// Stop behavior failed
    StopFailed { module: String, message: String },
}

impl LifecycleEvent {
    pub fn module(&self) -> &str {
        match self {
            LifecycleEvent::Starting { module }
            | LifecycleEvent::Started { module }
            | LifecycleEvent::StartFailed { module, .. }
            | LifecycleEvent::Cancelled { module }
            | LifecycleEvent::Stopping { module }
            | LifecycleEvent::Stopped { module }
            | LifecycleEvent::StopFailed { module, .. } => module,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Starting { .. } => "module.starting",
            LifecycleEvent::Started { .. } => "module.started",
            LifecycleEvent::StartFailed { .. } => "module.start_failed",
            LifecycleEvent::Cancelled { .. } => "module.cancelled",
            LifecycleEvent::Stopping { .. } => "module.stopping",
            LifecycleEvent::Stopped { .. } => "module.stopped",
            LifecycleEvent::StopFailed { .. } => "module.stop_failed",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::StartFailed { module, message } | LifecycleEvent::StopFailed { module, message } => {
                write!(f, "{} ({}): {}", self.name(), module, message)
            }
            _ => write!(f, "{} ({})", self.name(), self.module()),
        }
    }
}

/// Receives lifecycle events.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: &LifecycleEvent);
}

/// Fan-out of lifecycle events to every subscribed sink.
#[derive(Clone, Default)]
pub struct Diagnostics {
    sinks: Arc<RwLock<Vec<Arc<dyn DiagnosticSink>>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, sink: Arc<dyn DiagnosticSink>) {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Deliver `event` to every sink, in subscription order.
    pub fn emit(&self, event: LifecycleEvent) {
        let sinks = self.sinks.read().unwrap_or_else(PoisonError::into_inner).clone();
        for sink in &sinks {
            sink.record(&event);
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("sinks", &self.sink_count())
            .finish()
    }
}

/// Keeps every event it receives, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Events concerning `module`, in order.
    pub fn events_for(&self, module: &str) -> Vec<LifecycleEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.module() == module)
            .collect()
    }
}

impl DiagnosticSink for RecordingSink {
    fn record(&self, event: &LifecycleEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
