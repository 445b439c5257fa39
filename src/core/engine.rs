//! Dispatch paths: the synchronous loop and the parallel producer/consumer
//! machinery.
//!
//! The parallel path spawns exactly one producer task and `workers` consumer
//! tasks around a bounded queue, then waits for the producer first and every
//! consumer after it. Producer and consumer failures are retried with their
//! role's policy and, once exhausted, logged and swallowed inside the owning
//! task: the caller only ever observes a consumed count that stopped short.
//!
//! Retry guarantees, stated explicitly:
//! - producer: at-least-once. A failed scope iteration restarts from the
//!   beginning and re-pushes items the failed attempt already produced.
//! - consumer: best-effort with loss. Retry resumes at the next pop; the
//!   item whose action failed is neither re-queued nor re-processed.

use crate::config::{PipelineConfig, RetryPolicy};
use crate::core::progress::Progress;
use crate::core::retry::{Role, with_retry};
use crate::error::PipelineResult;
use crate::queue::{Envelope, QueueReceiver, QueueSender, bounded};
use crate::work::{ItemAction, ItemSource};
use futures::StreamExt;
use std::sync::Arc;

/// Single-task path: no queue, no spawned tasks, used for debugging and
/// low-volume runs. Errors propagate to the caller since there is no owning
/// task to absorb them.
pub(crate) async fn run_sync<S, A>(
    source: Arc<S>,
    action: Arc<A>,
    progress: Arc<Progress>,
) -> PipelineResult<()>
where
    S: ItemSource,
    A: ItemAction<Item = S::Item>,
{
    if progress.verbose() {
        tracing::info!(dry = progress.dry_run(), "Using single-task mode");
    }

    let mut scope = source.scope().await?;
    while let Some(item) = scope.next().await {
        let item = item?;
        if !progress.dry_run() {
            action.consume(item).await?;
        }
        progress.record_consumed().await;
    }

    Ok(())
}

/// Parallel path: one producer, `workers` consumers, a queue of capacity
/// 2 x workers between them.
pub(crate) async fn run_parallel<S, A>(
    config: PipelineConfig,
    source: Arc<S>,
    action: Arc<A>,
    progress: Arc<Progress>,
) -> PipelineResult<()>
where
    S: ItemSource + 'static,
    A: ItemAction<Item = S::Item> + 'static,
{
    let workers = config.workers;
    if progress.verbose() {
        tracing::info!(dry = progress.dry_run(), "Using {workers} workers");
    }

    let (queue_tx, queue_rx) = bounded::<S::Item>(config.queue_capacity());

    let producer = tokio::spawn(producer_loop(
        source,
        queue_tx,
        Arc::clone(&progress),
        config.producer_retry.clone(),
        workers,
    ));

    let consumers: Vec<_> = (0..workers)
        .map(|index| {
            tokio::spawn(consumer_loop(
                index,
                Arc::clone(&action),
                queue_rx.clone(),
                Arc::clone(&progress),
                config.consumer_retry.clone(),
            ))
        })
        .collect();
    // Consumers hold the only receiver handles from here on, so the producer
    // notices when every consumer is gone instead of suspending forever.
    drop(queue_rx);

    // Producer first, then every consumer; run() blocks until all are done.
    let _ = producer.await;
    for consumer in consumers {
        let _ = consumer.await;
    }

    if progress.verbose() {
        let consumed = progress.consumed().await;
        tracing::info!(dry = progress.dry_run(), "All consumers finished C:{consumed}");
    }

    Ok(())
}

/// Producer task body. Owns the only [`QueueSender`].
///
/// Whatever the retried iteration ends with, exactly `workers` shutdown
/// markers are pushed afterwards, one per consumer, so consumers always
/// terminate even when the producer ultimately fails.
async fn producer_loop<S>(
    source: Arc<S>,
    queue: QueueSender<S::Item>,
    progress: Arc<Progress>,
    policy: RetryPolicy,
    workers: usize,
) where
    S: ItemSource,
{
    let result = with_retry(&policy, Role::Producer, &progress, || {
        let source = Arc::clone(&source);
        let queue = queue.clone();
        let progress = Arc::clone(&progress);
        async move {
            let mut scope = source.scope().await?;
            while let Some(item) = scope.next().await {
                queue.push(Envelope::Item(item?)).await?;
                progress.record_produced();
            }
            if progress.verbose() {
                tracing::info!(
                    role = %Role::Producer,
                    dry = progress.dry_run(),
                    "finished gracefully P:{}",
                    progress.produced(),
                );
            }
            Ok(())
        }
    })
    .await;
    // Exhausted retries were already logged inside the wrapper; the error
    // stays in this task.
    let _ = result;

    for _ in 0..workers {
        if queue.push(Envelope::Shutdown).await.is_err() {
            // Every consumer is already gone; nobody is left to stop.
            break;
        }
    }
}

/// Consumer task body, one per worker slot.
///
/// Pops until a shutdown marker (or a closed channel, if the producer died
/// without pushing markers), runs the action unless dry-run, and counts the
/// item under the consumed lock.
async fn consumer_loop<A>(
    index: usize,
    action: Arc<A>,
    queue: QueueReceiver<A::Item>,
    progress: Arc<Progress>,
    policy: RetryPolicy,
) where
    A: ItemAction,
{
    let role = Role::Consumer(index);
    let result = with_retry(&policy, role, &progress, || {
        let action = Arc::clone(&action);
        let queue = queue.clone();
        let progress = Arc::clone(&progress);
        async move {
            loop {
                match queue.pop().await {
                    Some(Envelope::Item(item)) => {
                        if !progress.dry_run() {
                            action.consume(item).await?;
                        }
                        progress.record_consumed().await;
                    }
                    Some(Envelope::Shutdown) | None => break,
                }
            }
            if progress.verbose() {
                let consumed = progress.consumed().await;
                tracing::info!(
                    role = %role,
                    dry = progress.dry_run(),
                    "finished gracefully C:{consumed}",
                );
            }
            Ok(())
        }
    })
    .await;
    let _ = result;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::work::VecSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Mutex;

    struct FailingSource;

    #[async_trait]
    impl ItemSource for FailingSource {
        type Item = u32;

        async fn scope(
            &self,
        ) -> PipelineResult<futures::stream::BoxStream<'_, PipelineResult<u32>>> {
            Err(PipelineError::supplier_msg("scope unavailable"))
        }
    }

    /// Records successfully processed items; optionally fails some of them.
    struct RecordingAction {
        processed: Mutex<Vec<u32>>,
        fail_item: Option<u32>,
        fail_times: AtomicU32,
    }

    impl RecordingAction {
        fn new() -> Self {
            Self {
                processed: Mutex::new(Vec::new()),
                fail_item: None,
                fail_times: AtomicU32::new(0),
            }
        }

        fn failing_on(item: u32, times: u32) -> Self {
            Self {
                processed: Mutex::new(Vec::new()),
                fail_item: Some(item),
                fail_times: AtomicU32::new(times),
            }
        }
    }

    #[async_trait]
    impl ItemAction for RecordingAction {
        type Item = u32;

        async fn consume(&self, item: u32) -> PipelineResult<()> {
            if Some(item) == self.fail_item
                && self
                    .fail_times
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
            {
                return Err(PipelineError::action_msg(format!("cannot handle {item}")));
            }
            self.processed.lock().await.push(item);
            Ok(())
        }
    }

    #[tokio::test]
    async fn producer_pushes_one_marker_per_worker() {
        let source = Arc::new(VecSource::new(vec![1u32, 2, 3]));
        let progress = Arc::new(Progress::new(false, false));
        let (tx, rx) = bounded(64);

        producer_loop(source, tx, Arc::clone(&progress), RetryPolicy::fixed(3, 1), 4).await;

        let mut items = 0;
        let mut markers = 0;
        while let Some(envelope) = rx.pop().await {
            match envelope {
                Envelope::Item(_) => items += 1,
                Envelope::Shutdown => markers += 1,
            }
        }
        assert_eq!(items, 3);
        assert_eq!(markers, 4);
        assert_eq!(progress.produced(), 3);
    }

    #[tokio::test]
    async fn markers_are_pushed_even_after_retry_exhaustion() {
        let source = Arc::new(FailingSource);
        let progress = Arc::new(Progress::new(false, false));
        let (tx, rx) = bounded(16);

        producer_loop(source, tx, Arc::clone(&progress), RetryPolicy::fixed(2, 1), 3).await;

        let mut markers = 0;
        while let Some(envelope) = rx.pop().await {
            assert_eq!(envelope, Envelope::Shutdown);
            markers += 1;
        }
        assert_eq!(markers, 3);
        assert_eq!(progress.produced(), 0);
    }

    #[tokio::test]
    async fn consumer_stops_at_first_marker() {
        let action = Arc::new(RecordingAction::new());
        let progress = Arc::new(Progress::new(false, false));
        let (tx, rx) = bounded(16);

        tx.push(Envelope::Item(10)).await.unwrap();
        tx.push(Envelope::Item(11)).await.unwrap();
        tx.push(Envelope::Shutdown).await.unwrap();
        tx.push(Envelope::Item(12)).await.unwrap();

        consumer_loop(
            0,
            Arc::clone(&action),
            rx.clone(),
            Arc::clone(&progress),
            RetryPolicy::fixed(3, 1),
        )
        .await;

        assert_eq!(*action.processed.lock().await, vec![10, 11]);
        assert_eq!(progress.consumed().await, 2);
        // The item after the marker is untouched.
        assert_eq!(rx.pop().await, Some(Envelope::Item(12)));
    }

    #[tokio::test]
    async fn consumer_retry_loses_the_failed_item_and_resumes() {
        let action = Arc::new(RecordingAction::failing_on(2, 1));
        let progress = Arc::new(Progress::new(false, false));
        let (tx, rx) = bounded(16);

        for item in [1u32, 2, 3] {
            tx.push(Envelope::Item(item)).await.unwrap();
        }
        tx.push(Envelope::Shutdown).await.unwrap();

        consumer_loop(
            0,
            Arc::clone(&action),
            rx,
            Arc::clone(&progress),
            RetryPolicy::fixed(5, 1),
        )
        .await;

        // Item 2 was popped, failed, and is gone; the loop resumed at 3.
        assert_eq!(*action.processed.lock().await, vec![1, 3]);
        assert_eq!(progress.consumed().await, 2);
    }

    #[tokio::test]
    async fn consumer_exits_gracefully_on_closed_channel() {
        let action = Arc::new(RecordingAction::new());
        let progress = Arc::new(Progress::new(false, false));
        let (tx, rx) = bounded(16);

        tx.push(Envelope::Item(1)).await.unwrap();
        drop(tx); // producer died without markers

        consumer_loop(
            0,
            Arc::clone(&action),
            rx,
            Arc::clone(&progress),
            RetryPolicy::fixed(3, 1),
        )
        .await;

        assert_eq!(progress.consumed().await, 1);
    }

    #[tokio::test]
    async fn dry_run_skips_the_action_but_counts() {
        let action = Arc::new(RecordingAction::new());
        let progress = Arc::new(Progress::new(false, true));
        let (tx, rx) = bounded(16);

        tx.push(Envelope::Item(5)).await.unwrap();
        tx.push(Envelope::Shutdown).await.unwrap();

        consumer_loop(
            0,
            Arc::clone(&action),
            rx,
            Arc::clone(&progress),
            RetryPolicy::fixed(3, 1),
        )
        .await;

        assert!(action.processed.lock().await.is_empty());
        assert_eq!(progress.consumed().await, 1);
    }

    #[tokio::test]
    async fn sync_path_consumes_everything_in_order() {
        let source = Arc::new(VecSource::new(vec![1u32, 2, 3, 4]));
        let action = Arc::new(RecordingAction::new());
        let progress = Arc::new(Progress::new(false, false));

        run_sync(source, Arc::clone(&action), Arc::clone(&progress))
            .await
            .unwrap();

        assert_eq!(*action.processed.lock().await, vec![1, 2, 3, 4]);
        assert_eq!(progress.consumed().await, 4);
    }

    #[tokio::test]
    async fn sync_path_propagates_action_errors() {
        let source = Arc::new(VecSource::new(vec![1u32, 2, 3]));
        let action = Arc::new(RecordingAction::failing_on(2, 1));
        let progress = Arc::new(Progress::new(false, false));

        let result = run_sync(source, action, Arc::clone(&progress)).await;
        assert!(matches!(result, Err(PipelineError::Action { .. })));
        assert_eq!(progress.consumed().await, 1);
    }
}
