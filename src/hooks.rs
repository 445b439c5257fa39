//! Lifecycle hooks around a pipeline run.
//!
//! Hooks are an explicit strategy object handed to the engine, not an
//! inheritance point: implement [`RunHooks`] and pass it to the builder.
//! Every method has a no-op default, so implementations override only what
//! they need.
//!
//! Unlike producer/consumer failures, an error returned from any hook
//! propagates straight out of `run()` and aborts the whole run.

use crate::error::PipelineResult;
use async_trait::async_trait;
use futures::future::BoxFuture;

/// The engine's dispatch step, handed to [`RunHooks::around_run`].
///
/// Awaiting it runs the producer/consumer machinery (or the synchronous
/// loop) to completion.
pub type Dispatch = BoxFuture<'static, PipelineResult<()>>;

/// Hooks invoked around a single run.
#[async_trait]
pub trait RunHooks: Send + Sync {
    /// Runs before dispatch starts. Typical use: open connections, warm
    /// caches.
    async fn before_run(&self) -> PipelineResult<()> {
        Ok(())
    }

    /// Wraps dispatch. Implementations must await `dispatch` exactly once;
    /// a wrapper that never awaits it produces a run that consumes nothing.
    async fn around_run(&self, dispatch: Dispatch) -> PipelineResult<()> {
        dispatch.await
    }

    /// Runs after dispatch completes. Typical use: flush, report, tear down.
    async fn after_run(&self) -> PipelineResult<()> {
        Ok(())
    }
}

/// Default hooks: do nothing, run dispatch as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

#[async_trait]
impl RunHooks for NoopHooks {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn noop_hooks_run_dispatch() {
        let ran = std::sync::Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let dispatch: Dispatch = Box::pin(async move {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        NoopHooks.around_run(dispatch).await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn default_before_after_are_ok() {
        assert!(NoopHooks.before_run().await.is_ok());
        assert!(NoopHooks.after_run().await.is_ok());
    }
}
