//! Command worker: drains the queue, runs operations, completes responders.
//!
//! Shutdown: [`CommandWorker::shutdown`] closes the queue to new pushes,
//! then runs every operation that was already queued and waits for all of
//! them to complete their responders. A pushed operation is never dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use graphity_core::models::{Command, Operation};
use graphity_core::{Config, ExecutionError};
use tokio::sync::{mpsc, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::sleep;

use crate::queue::CommandReceiver;

/// Upper bound on the retry delay, in backoff units.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 30;

/// Backoff for a given retry count: exponential, capped.
#[inline]
pub(crate) fn compute_retry_backoff_seconds(retry_count: u32) -> u64 {
    2_u64
        .checked_pow(retry_count)
        .unwrap_or(u64::MAX)
        .min(MAX_RETRY_BACKOFF_SECS)
}

/// Executes operations against the graph store.
///
/// Implemented by the graph layer. The worker owns the responder and calls
/// it once `execute` has succeeded or finally failed.
#[async_trait]
pub trait OperationExecutor: Send + Sync {
    async fn execute(&self, operation: &Operation) -> Result<(), ExecutionError>;
}

/// Acknowledges every operation and logs it. Used when no graph store is
/// attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingExecutor;

#[async_trait]
impl OperationExecutor for LoggingExecutor {
    async fn execute(&self, operation: &Operation) -> Result<(), ExecutionError> {
        match operation.command() {
            Command::CreateFriendship {
                actor_id,
                target_id,
            } => {
                tracing::info!(
                    operation.id = %operation.id(),
                    actor_id = %actor_id,
                    target_id = %target_id,
                    "Friendship created"
                );
            }
            Command::CreateStatusUpdate {
                actor_id,
                status_update,
            } => {
                tracing::info!(
                    operation.id = %operation.id(),
                    actor_id = %actor_id,
                    content_type = %status_update.content_type,
                    files = status_update.files.len(),
                    "Status update created"
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub max_workers: usize,
    pub max_retries: u32,
    /// Length of one backoff step.
    pub backoff_unit: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            max_retries: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl WorkerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_workers: config.command_workers.max(1),
            max_retries: config.command_max_retries,
            ..Self::default()
        }
    }
}

pub struct CommandWorker {
    shutdown_tx: mpsc::Sender<()>,
    pool: Mutex<Option<JoinHandle<()>>>,
}

impl CommandWorker {
    /// Spawn the worker pool on the current runtime.
    ///
    /// Dropping the returned handle shuts the pool down the same way
    /// [`shutdown`](Self::shutdown) does, without waiting for it.
    pub fn spawn(
        receiver: CommandReceiver,
        executor: Arc<dyn OperationExecutor>,
        config: WorkerConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let pool = tokio::spawn(async move {
            Self::worker_pool(receiver, executor, config, shutdown_rx).await;
        });

        Self {
            shutdown_tx,
            pool: Mutex::new(Some(pool)),
        }
    }

    /// Close the queue, run what is left in it and wait for every operation
    /// to finish. Later calls return immediately.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating command worker shutdown");
        let _ = self.shutdown_tx.try_send(());

        let Some(pool) = self.pool.lock().await.take() else {
            return;
        };
        if let Err(e) = pool.await {
            tracing::error!(error = %e, "Command worker pool task failed");
        }
    }

    async fn worker_pool(
        mut receiver: CommandReceiver,
        executor: Arc<dyn OperationExecutor>,
        config: WorkerConfig,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(
            max_workers = config.max_workers,
            max_retries = config.max_retries,
            "Command worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers.max(1)));
        let mut tasks = JoinSet::new();

        loop {
            // Wait for capacity and for work separately, so a shutdown is
            // noticed even while every worker is busy.
            let permit = tokio::select! {
                _ = shutdown_rx.recv() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            let operation = tokio::select! {
                _ = shutdown_rx.recv() => break,
                next = receiver.recv() => match next {
                    Some(operation) => operation,
                    None => {
                        tracing::info!("Command queue closed, worker pool exiting");
                        break;
                    }
                },
            };

            Self::dispatch(&mut tasks, operation, permit, &executor, &config);
            while let Some(result) = tasks.try_join_next() {
                log_join_result(result);
            }
        }

        tracing::info!("Command worker pool shutting down, draining queue");
        receiver.close();

        let mut drained = 0usize;
        while let Some(operation) = receiver.recv().await {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            Self::dispatch(&mut tasks, operation, permit, &executor, &config);
            drained += 1;
        }

        while let Some(result) = tasks.join_next().await {
            log_join_result(result);
        }

        tracing::info!(drained = drained, "Command worker pool stopped");
    }

    fn dispatch(
        tasks: &mut JoinSet<()>,
        operation: Operation,
        permit: OwnedSemaphorePermit,
        executor: &Arc<dyn OperationExecutor>,
        config: &WorkerConfig,
    ) {
        let executor = executor.clone();
        let config = config.clone();
        tasks.spawn(async move {
            let _permit = permit;
            Self::process_operation(operation, executor, &config).await;
        });
    }

    #[tracing::instrument(skip_all, fields(operation.id = %operation.id(), operation.kind = operation.command().kind()))]
    async fn process_operation(
        operation: Operation,
        executor: Arc<dyn OperationExecutor>,
        config: &WorkerConfig,
    ) {
        let start = std::time::Instant::now();
        let mut retry_count = 0;

        loop {
            match executor.execute(&operation).await {
                Ok(()) => {
                    tracing::info!(
                        duration_ms = start.elapsed().as_millis(),
                        retries = retry_count,
                        "Operation executed"
                    );
                    operation.into_responder().finish();
                    return;
                }
                Err(e) if e.is_recoverable() && retry_count < config.max_retries => {
                    let backoff_units = compute_retry_backoff_seconds(retry_count);
                    retry_count += 1;
                    tracing::warn!(
                        error = %e,
                        retry_count = retry_count,
                        backoff_units = backoff_units,
                        "Operation failed, scheduling retry"
                    );
                    let factor = u32::try_from(backoff_units).unwrap_or(u32::MAX);
                    sleep(config.backoff_unit.saturating_mul(factor)).await;
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        recoverable = e.is_recoverable(),
                        retries = retry_count,
                        duration_ms = start.elapsed().as_millis(),
                        "Operation failed"
                    );
                    operation.into_responder().error(500, &e.to_string());
                    return;
                }
            }
        }
    }
}

fn log_join_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "Operation task panicked");
    }
}
