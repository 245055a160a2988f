//! # Start and Stop Orchestration
//!
//! The two passes that drive modules through their lifecycle.
//!
//! - **[`start`]**: [`StartPass`] ranks the registered modules, wires one
//!   [`DeferredTask`](crate::task::DeferredTask) per module to the tasks of
//!   its dependencies, then releases them all at once.
//! - **[`stop`]**: [`StopPass`] walks modules in descending rank, stops the
//!   ones that started and cancels the ones that never got the chance.
//!
//! Both passes hand back a [`PassHandle`]: a clonable future that settles
//! once the pass is over, with the first failure if any module failed.
//!
//! A behavior that panics is reported as a failure of its module, like one
//! that returns an error.
use std::any::Any;
use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use thiserror::Error;

use crate::kernel::error::{Result, SharedError};

pub mod start;
pub mod stop;

pub use start::{ModuleOutcome, StartPass, StartTask};
pub use stop::StopPass;

/// Shared result of a whole start or stop pass.
pub type PassHandle = Shared<BoxFuture<'static, Result<()>>>;

/// Handle returned by [`ModuleLoader::start`](crate::kernel::ModuleLoader::start).
pub type StartHandle = PassHandle;

/// Handle returned by [`ModuleLoader::stop`](crate::kernel::ModuleLoader::stop).
pub type StopHandle = PassHandle;

/// Cause recorded for a start or stop behavior that panicked.
#[derive(Debug, Error)]
#[error("panic: {0}")]
pub struct BehaviorPanic(pub String);

pub(crate) fn panic_error(payload: Box<dyn Any + Send>) -> SharedError {
    let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Unknown panic reason".to_string()
    };
    Arc::new(BehaviorPanic(message))
}
