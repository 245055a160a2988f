//! # Deferred Tasks
//!
//! A [`DeferredTask`] captures a unit of asynchronous work at construction
//! and releases it only when [`execute`](DeferredTask::execute) is called.
//! The split lets the orchestrator wire every module's task to the tasks it
//! depends on before anything runs.
//!
//! The outcome of a task is a [`TaskOutcome`]: a clonable future that any
//! number of dependents can await, before or after execution. Awaiting an
//! outcome never triggers the work.
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use futures::future::{self, BoxFuture, FutureExt, Shared};
use tokio::sync::oneshot;

use crate::kernel::error::{Error, Result};

/// Shared handle on the eventual result of a [`DeferredTask`].
pub type TaskOutcome<T> = Shared<BoxFuture<'static, T>>;

/// One-shot, externally triggered unit of asynchronous work.
pub struct DeferredTask<A, T>
where
    T: Clone,
{
    trigger: Mutex<Option<oneshot::Sender<A>>>,
    outcome: TaskOutcome<T>,
}

impl<A, T> DeferredTask<A, T>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Create a suspended task around `work`.
    pub fn new<F, Fut>(work: F) -> Self
    where
        F: FnOnce(A) -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (trigger, released) = oneshot::channel::<A>();
        let outcome = async move {
            match released.await {
                Ok(args) => work(args).await,
                // Never triggered: stay suspended.
                Err(_) => future::pending().await,
            }
        }
        .boxed()
        .shared();

        Self {
            trigger: Mutex::new(Some(trigger)),
            outcome,
        }
    }

    /// Release the work with `args` and drive it on the current tokio runtime.
    ///
    /// Fails with [`Error::AlreadyExecuted`] on every call after the first.
    pub fn execute(&self, args: A) -> Result<TaskOutcome<T>> {
        let trigger = self
            .trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(Error::AlreadyExecuted)?;

        // The receiving end lives inside `self.outcome`, so it cannot be gone yet.
        if trigger.send(args).is_err() {
            log::warn!("Deferred task released after its outcome was dropped");
        }
        tokio::spawn(self.outcome.clone());
        Ok(self.outcome())
    }

    /// Whether [`execute`](Self::execute) has been called.
    pub fn is_executed(&self) -> bool {
        self.trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// A handle on the task's result. Does not trigger the work.
    pub fn outcome(&self) -> TaskOutcome<T> {
        self.outcome.clone()
    }

    /// The result, if the work has already completed.
    pub fn peek(&self) -> Option<&T> {
        self.outcome.peek()
    }
}

impl<A, T: Clone> std::fmt::Debug for DeferredTask<A, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let executed = self
            .trigger
            .lock()
            .map(|trigger| trigger.is_none())
            .unwrap_or(true);
        f.debug_struct("DeferredTask")
            .field("executed", &executed)
            .field("settled", &self.outcome.peek().is_some())
            .finish()
    }
}
