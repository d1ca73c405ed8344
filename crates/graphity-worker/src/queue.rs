//! Command queue: the hand-off between request handling and graph execution.
//!
//! Any number of request tasks push [`Operation`]s through cloned
//! [`CommandQueue`] handles; the single [`CommandReceiver`] is drained by the
//! worker pool. Operations pushed by one producer are received in push order.
//! A rejected push hands the operation back inside the [`QueueError`], so the
//! caller can still report through its responder.

use graphity_core::models::Operation;
use graphity_core::AppError;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("command queue is full")]
    Full(Operation),

    #[error("command queue is closed")]
    Closed(Operation),
}

impl QueueError {
    /// Split into the error to report and the rejected operation.
    pub fn into_parts(self) -> (AppError, Operation) {
        match self {
            QueueError::Full(operation) => (AppError::QueueFull, operation),
            QueueError::Closed(operation) => (AppError::QueueClosed, operation),
        }
    }
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        err.into_parts().0
    }
}

#[derive(Debug, Clone)]
enum QueueSender {
    Bounded(mpsc::Sender<Operation>),
    Unbounded(mpsc::UnboundedSender<Operation>),
}

#[derive(Debug)]
enum QueueReceiver {
    Bounded(mpsc::Receiver<Operation>),
    Unbounded(mpsc::UnboundedReceiver<Operation>),
}

/// Producer handle. Cheap to clone; one clone per request task.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    tx: QueueSender,
    capacity: Option<usize>,
}

/// Consumer side of a [`CommandQueue`].
#[derive(Debug)]
pub struct CommandReceiver {
    rx: QueueReceiver,
}

impl CommandQueue {
    /// Create a queue. `Some(n)` bounds it at `n` pending operations
    /// (at least 1); `None` makes it unbounded.
    pub fn new(capacity: Option<usize>) -> (Self, CommandReceiver) {
        match capacity {
            Some(capacity) => Self::bounded(capacity),
            None => Self::unbounded(),
        }
    }

    pub fn bounded(capacity: usize) -> (Self, CommandReceiver) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        tracing::info!(capacity = capacity, "Command queue initialized with bounded channel");
        (
            Self {
                tx: QueueSender::Bounded(tx),
                capacity: Some(capacity),
            },
            CommandReceiver {
                rx: QueueReceiver::Bounded(rx),
            },
        )
    }

    pub fn unbounded() -> (Self, CommandReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        tracing::info!("Command queue initialized with unbounded channel");
        (
            Self {
                tx: QueueSender::Unbounded(tx),
                capacity: None,
            },
            CommandReceiver {
                rx: QueueReceiver::Unbounded(rx),
            },
        )
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        match &self.tx {
            QueueSender::Bounded(tx) => tx.is_closed(),
            QueueSender::Unbounded(tx) => tx.is_closed(),
        }
    }

    /// Push without waiting. A full bounded queue rejects the operation.
    #[tracing::instrument(skip_all, fields(operation.id = %operation.id(), operation.kind = operation.command().kind()))]
    pub fn push(&self, operation: Operation) -> Result<(), QueueError> {
        let result = match &self.tx {
            QueueSender::Bounded(tx) => tx.try_send(operation).map_err(|e| match e {
                TrySendError::Full(operation) => {
                    tracing::warn!("Command queue is full, rejecting operation");
                    QueueError::Full(operation)
                }
                TrySendError::Closed(operation) => QueueError::Closed(operation),
            }),
            QueueSender::Unbounded(tx) => tx
                .send(operation)
                .map_err(|e| QueueError::Closed(e.0)),
        };
        if result.is_ok() {
            tracing::debug!("Operation enqueued");
        }
        result
    }

    /// Push, waiting for room if the queue is bounded and full.
    pub async fn push_async(&self, operation: Operation) -> Result<(), QueueError> {
        match &self.tx {
            QueueSender::Bounded(tx) => tx
                .send(operation)
                .await
                .map_err(|e| QueueError::Closed(e.0)),
            QueueSender::Unbounded(tx) => tx.send(operation).map_err(|e| QueueError::Closed(e.0)),
        }
    }
}

impl CommandReceiver {
    /// Next operation, or `None` once every producer handle is dropped and
    /// the queue is drained.
    pub async fn recv(&mut self) -> Option<Operation> {
        match &mut self.rx {
            QueueReceiver::Bounded(rx) => rx.recv().await,
            QueueReceiver::Unbounded(rx) => rx.recv().await,
        }
    }

    /// Next operation if one is ready.
    pub fn try_recv(&mut self) -> Option<Operation> {
        match &mut self.rx {
            QueueReceiver::Bounded(rx) => rx.try_recv().ok(),
            QueueReceiver::Unbounded(rx) => rx.try_recv().ok(),
        }
    }

    /// Stop accepting pushes; already queued operations can still be received.
    pub fn close(&mut self) {
        match &mut self.rx {
            QueueReceiver::Bounded(rx) => rx.close(),
            QueueReceiver::Unbounded(rx) => rx.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{friendship, Recorder};
    use std::collections::HashSet;

    #[tokio::test]
    async fn bounded_queue_rejects_when_full() {
        let (queue, mut rx) = CommandQueue::bounded(1);
        let (responder, _) = Recorder::new();
        queue.push(friendship(1, 2, responder)).unwrap();

        let (responder, _) = Recorder::new();
        let err = queue.push(friendship(3, 4, responder)).unwrap_err();
        let (app_error, operation) = err.into_parts();
        assert!(matches!(app_error, AppError::QueueFull));
        assert_eq!(operation.command().actor_id().get(), 3);

        assert_eq!(rx.recv().await.unwrap().command().actor_id().get(), 1);
    }

    #[tokio::test]
    async fn closed_queue_returns_operation() {
        let (queue, mut rx) = CommandQueue::unbounded();
        rx.close();
        let (responder, _) = Recorder::new();
        let err = queue.push(friendship(1, 2, responder)).unwrap_err();
        assert!(matches!(err, QueueError::Closed(_)));
        assert!(matches!(AppError::from(err), AppError::QueueClosed));
    }

    #[tokio::test]
    async fn preserves_order_per_producer() {
        let (queue, mut rx) = CommandQueue::new(None);
        for actor in 1..=5 {
            let (responder, _) = Recorder::new();
            queue.push(friendship(actor, 100, responder)).unwrap();
        }
        drop(queue);

        let mut actors = Vec::new();
        while let Some(operation) = rx.recv().await {
            actors.push(operation.command().actor_id().get());
        }
        assert_eq!(actors, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_producers_lose_nothing() {
        const PRODUCERS: i64 = 16;
        const PER_PRODUCER: i64 = 50;

        let (queue, mut rx) = CommandQueue::bounded(8);
        let mut handles = Vec::new();
        for producer in 0..PRODUCERS {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                for n in 0..PER_PRODUCER {
                    let (responder, _) = Recorder::new();
                    let actor = producer * 1000 + n + 1;
                    queue.push_async(friendship(actor, 1, responder)).await.unwrap();
                }
            }));
        }
        drop(queue);

        let mut last_seen = std::collections::HashMap::new();
        let mut ids = HashSet::new();
        while let Some(operation) = rx.recv().await {
            assert!(ids.insert(operation.id()));
            let actor = operation.command().actor_id().get();
            let (producer, n) = (actor / 1000, actor % 1000);
            if let Some(previous) = last_seen.insert(producer, n) {
                assert!(previous < n, "producer {} out of order", producer);
            }
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(ids.len() as i64, PRODUCERS * PER_PRODUCER);
    }
}
