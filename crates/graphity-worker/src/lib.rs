//! Graphity Worker Library
//!
//! The command queue that carries operations out of request handling, and
//! the worker pool that executes them and completes their responders.

pub mod queue;
#[cfg(test)]
pub(crate) mod testing;
pub mod worker;

pub use queue::{CommandQueue, CommandReceiver, QueueError};
pub use worker::{CommandWorker, LoggingExecutor, OperationExecutor, WorkerConfig};
