//! Errors reported by an operation executor.
//!
//! An executor marks each failure as recoverable (the worker retries the
//! operation) or unrecoverable (the operation fails immediately and its
//! responder receives the error).

use std::fmt;

#[derive(Debug)]
pub struct ExecutionError {
    inner: anyhow::Error,
    recoverable: bool,
}

impl ExecutionError {
    /// Failure that will not change on retry, such as an actor that does not
    /// exist in the graph.
    pub fn unrecoverable(err: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: err.into(),
            recoverable: false,
        }
    }

    /// Transient failure, such as a graph store that is temporarily unavailable.
    pub fn recoverable(err: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: err.into(),
            recoverable: true,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    pub fn into_inner(self) -> anyhow::Error {
        self.inner
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for ExecutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

impl From<anyhow::Error> for ExecutionError {
    /// Plain errors are treated as transient.
    fn from(err: anyhow::Error) -> Self {
        Self::recoverable(err)
    }
}

/// Mark the error side of a result as unrecoverable.
pub trait ExecutionResultExt<T> {
    fn unrecoverable(self) -> Result<T, ExecutionError>;
}

impl<T, E: Into<anyhow::Error>> ExecutionResultExt<T> for Result<T, E> {
    fn unrecoverable(self) -> Result<T, ExecutionError> {
        self.map_err(ExecutionError::unrecoverable)
    }
}
