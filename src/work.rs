//! Collaborator traits: where work items come from and what happens to them.
//!
//! The engine itself is generic; embedding jobs plug in an [`ItemSource`]
//! (the supplier of work items) and an [`ItemAction`] (the per-item side
//! effect). Both are async traits so implementations can hit files, sockets
//! or databases without blocking a worker.

use crate::error::{PipelineResult, PipelineError};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::future::Future;
use std::marker::PhantomData;

/// Supplier of work items.
///
/// `scope()` must return a *fresh* iteration from the start every time it is
/// called: the producer's retry wrapper restarts the whole iteration on
/// failure, so a source that can only be walked once will misbehave under
/// retry (pair such a source with a 1-attempt producer policy).
///
/// Items stream lazily; the engine never collects the whole scope into
/// memory.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// The work item type produced by this source.
    type Item: Send + 'static;

    /// Begin a fresh iteration over the scope.
    ///
    /// Errors returned here, or yielded mid-stream, are supplier errors and
    /// go through the producer retry policy.
    async fn scope(&self) -> PipelineResult<BoxStream<'_, PipelineResult<Self::Item>>>;
}

/// Per-item side effect.
///
/// Invocations are at-least-once: under retry the same item may be handed to
/// `consume` more than once, so implementations should be idempotent where
/// that matters downstream.
#[async_trait]
pub trait ItemAction: Send + Sync {
    /// The work item type this action accepts.
    type Item: Send + 'static;

    /// Process one item. Signal failure via `Err` to trigger the consumer
    /// retry policy.
    async fn consume(&self, item: Self::Item) -> PipelineResult<()>;
}

/// Re-iterable source backed by an in-memory `Vec`.
///
/// Every `scope()` call streams a clone of the items from the start, which
/// makes it safe under producer retry. Mostly useful for tests and small
/// fixed workloads.
#[derive(Debug, Clone)]
pub struct VecSource<T> {
    items: Vec<T>,
}

impl<T> VecSource<T> {
    /// Create a source over the given items.
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    /// Number of items a full iteration yields.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the scope is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl<T> ItemSource for VecSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Item = T;

    async fn scope(&self) -> PipelineResult<BoxStream<'_, PipelineResult<T>>> {
        Ok(futures::stream::iter(self.items.clone().into_iter().map(Ok)).boxed())
    }
}

/// Closure-backed action, for callers that do not want a named type.
///
/// ```rust
/// use pipework::error::PipelineResult;
/// use pipework::work::FnAction;
///
/// let action: FnAction<u64, _> = FnAction::new(|n: u64| async move {
///     println!("got {n}");
///     PipelineResult::Ok(())
/// });
/// ```
pub struct FnAction<T, F> {
    f: F,
    _marker: PhantomData<fn(T)>,
}

impl<T, F> FnAction<T, F> {
    /// Wrap a closure as an [`ItemAction`].
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F, Fut> ItemAction for FnAction<T, F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = PipelineResult<()>> + Send,
{
    type Item = T;

    async fn consume(&self, item: T) -> PipelineResult<()> {
        (self.f)(item).await
    }
}

/// Convenience for sources that fail fast when misconfigured.
pub(crate) fn non_reiterable() -> PipelineError {
    PipelineError::supplier_msg("scope already consumed; this source is not re-iterable")
}
