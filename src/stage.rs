//! Chaining pipelines into multi-stage flows.
//!
//! [`stage`] returns a linked pair: a [`StageWriter`] that acts as the
//! consumer action of the upstream pipeline and forwards every item into a
//! bounded channel, and a [`StageReader`] that acts as the item source of
//! the downstream pipeline and drains that channel. Running both pipelines
//! concurrently (for example with `tokio::join!`) gives a download/upload
//! style flow where each stage keeps its own worker pool and backpressure.
//!
//! The reader drains a live channel and therefore cannot be re-iterated:
//! its second `scope()` call fails. Pair the downstream pipeline with a
//! 1-attempt producer retry policy ([`crate::config::RetryPolicy::fixed`]
//! with 1 attempt) so a producer failure is not pointlessly retried against
//! an already-drained channel.
//!
//! End of input is the channel closing: once the upstream pipeline finishes
//! and drops its writer, the reader's stream ends and the downstream
//! pipeline shuts down normally.

use crate::error::PipelineResult;
use crate::work::{ItemAction, ItemSource, non_reiterable};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Create a linked writer/reader pair over a channel of the given capacity.
pub fn stage<T: Send + 'static>(capacity: usize) -> (StageWriter<T>, StageReader<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        StageWriter { tx },
        StageReader {
            rx: Arc::new(Mutex::new(Some(rx))),
        },
    )
}

/// Upstream end of a stage link: an action that forwards items downstream.
pub struct StageWriter<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Clone for StageWriter<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> ItemAction for StageWriter<T> {
    type Item = T;

    async fn consume(&self, item: T) -> PipelineResult<()> {
        self.tx
            .send(item)
            .await
            .map_err(|_| crate::error::PipelineError::action_msg("downstream stage is gone"))
    }
}

/// Downstream end of a stage link: a single-shot source draining the channel.
pub struct StageReader<T> {
    rx: Arc<Mutex<Option<mpsc::Receiver<T>>>>,
}

#[async_trait]
impl<T: Send + 'static> ItemSource for StageReader<T> {
    type Item = T;

    async fn scope(&self) -> PipelineResult<BoxStream<'_, PipelineResult<T>>> {
        let rx = self.rx.lock().await.take().ok_or_else(non_reiterable)?;
        Ok(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (Ok(item), rx))
        })
        .boxed())
    }
}
