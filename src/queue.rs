//! The bounded work queue between the producer and the consumers.
//!
//! A fixed-capacity FIFO channel is the only synchronization point between
//! the producer task and the consumer tasks: `push` suspends while the queue
//! is full (backpressure on the producer), `pop` suspends while it is empty
//! (consumers wait for work). No priority, no peek, no resizing.
//!
//! End-of-stream is signalled with [`Envelope::Shutdown`], a tagged variant
//! distinguishable from any payload by construction rather than by value
//! equality, so an arbitrary item can never be mistaken for the shutdown
//! signal.
//!
//! The two halves are deliberately separate types. The producer owns the
//! only [`QueueSender`]; when it goes away, consumers drain what is left and
//! see the channel close. Consumers share the [`QueueReceiver`]; when every
//! consumer is gone, the producer's next push fails instead of suspending
//! forever.

use crate::error::{PipelineError, PipelineResult};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// What flows through the queue: a work item, or the shutdown signal telling
/// one consumer that no more work is coming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope<T> {
    /// A work item for a consumer.
    Item(T),
    /// Stop signal; each consumer terminates on the first one it pops.
    Shutdown,
}

/// Create a bounded queue holding at most `capacity` envelopes.
pub fn bounded<T: Send>(capacity: usize) -> (QueueSender<T>, QueueReceiver<T>) {
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    (
        QueueSender { tx, capacity },
        QueueReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Push half of the queue, held by the producer.
pub struct QueueSender<T> {
    tx: mpsc::Sender<Envelope<T>>,
    capacity: usize,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T: Send> QueueSender<T> {
    /// Push an envelope, suspending while the queue is at capacity.
    ///
    /// Fails only once every popper is gone and the channel has closed.
    pub async fn push(&self, envelope: Envelope<T>) -> PipelineResult<()> {
        self.tx
            .send(envelope)
            .await
            .map_err(|_| PipelineError::queue_closed("all consumers are gone"))
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Pop half of the queue, shared by every consumer.
///
/// The underlying receiver sits behind a lock; each envelope is delivered to
/// exactly one popper.
pub struct QueueReceiver<T> {
    rx: Arc<Mutex<mpsc::Receiver<Envelope<T>>>>,
}

impl<T> Clone for QueueReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<T: Send> QueueReceiver<T> {
    /// Pop the next envelope, suspending while the queue is empty.
    ///
    /// Returns `None` once the channel closed with nothing left, which
    /// happens when the producer side died without pushing its shutdown
    /// markers.
    pub async fn pop(&self) -> Option<Envelope<T>> {
        // Lock scope is the single recv so poppers interleave fairly.
        self.rx.lock().await.recv().await
    }
}
