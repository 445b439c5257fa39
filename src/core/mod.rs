//! The pipeline facade: configuration, collaborators and hooks assembled
//! into a single runnable unit.
//!
//! A [`Pipeline`] is built for exactly one run. `run(self)` consumes the
//! instance, so run-scoped state (queue, counters) can never leak into a
//! second run by accident.

use crate::config::PipelineConfig;
use crate::core::progress::Progress;
use crate::error::{PipelineError, PipelineResult};
use crate::hooks::{Dispatch, NoopHooks, RunHooks};
use crate::work::{ItemAction, ItemSource};
use std::sync::Arc;

pub mod engine;
pub mod progress;
pub mod retry;

pub use retry::Role;

/// A single-use producer/consumer run.
///
/// # Examples
///
/// ```rust
/// use pipework::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> PipelineResult<()> {
///     let source = VecSource::new((0u64..1_000).collect());
///     let action = FnAction::new(|n: u64| async move {
///         let _ = n; // your side effect here
///         Ok(())
///     });
///
///     let consumed = Pipeline::new(PipelineConfig::default(), source, action)?
///         .run()
///         .await?;
///     assert_eq!(consumed, 1_000);
///     Ok(())
/// }
/// ```
pub struct Pipeline<S, A> {
    config: PipelineConfig,
    source: Arc<S>,
    action: Arc<A>,
    hooks: Arc<dyn RunHooks>,
}

impl<S, A> Pipeline<S, A>
where
    S: ItemSource + 'static,
    A: ItemAction<Item = S::Item> + 'static,
{
    /// Create a pipeline with default hooks, validating the configuration.
    pub fn new(config: PipelineConfig, source: S, action: A) -> PipelineResult<Self> {
        validate(&config)?;
        Ok(Self {
            config,
            source: Arc::new(source),
            action: Arc::new(action),
            hooks: Arc::new(NoopHooks),
        })
    }

    /// Start building a pipeline piece by piece.
    pub fn builder() -> PipelineBuilder<S, A> {
        PipelineBuilder::new()
    }

    /// Replace the lifecycle hooks.
    pub fn with_hooks(mut self, hooks: impl RunHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Execute the run and return the number of items consumed.
    ///
    /// Sequence: `before_run` → `around_run(dispatch)` → `after_run` →
    /// consumed count. With `workers == 0` dispatch is the synchronous
    /// in-task loop and supplier/action errors propagate from here; with
    /// workers the parallel machinery runs, its failures are retried and
    /// then absorbed inside their tasks, and the only caller-visible trace
    /// of trouble is a count that stopped short. Hook errors always
    /// propagate and abort the run.
    pub async fn run(self) -> PipelineResult<u64> {
        let Pipeline {
            config,
            source,
            action,
            hooks,
        } = self;

        hooks.before_run().await?;

        let progress = Arc::new(Progress::new(config.verbose, config.dry_run));
        let dispatch: Dispatch = {
            let progress = Arc::clone(&progress);
            Box::pin(async move {
                if config.workers == 0 {
                    engine::run_sync(source, action, progress).await
                } else {
                    engine::run_parallel(config, source, action, progress).await
                }
            })
        };

        hooks.around_run(dispatch).await?;
        hooks.after_run().await?;

        Ok(progress.consumed().await)
    }
}

/// Builder for [`Pipeline`].
///
/// `build()` reports a missing collaborator instead of failing to compile
/// only at the call site, which keeps config-driven assembly honest.
pub struct PipelineBuilder<S, A> {
    config: PipelineConfig,
    source: Option<S>,
    action: Option<A>,
    hooks: Arc<dyn RunHooks>,
}

impl<S, A> Default for PipelineBuilder<S, A>
where
    S: ItemSource + 'static,
    A: ItemAction<Item = S::Item> + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> PipelineBuilder<S, A>
where
    S: ItemSource + 'static,
    A: ItemAction<Item = S::Item> + 'static,
{
    /// Start with the default configuration and no collaborators.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            source: None,
            action: None,
            hooks: Arc::new(NoopHooks),
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the item source.
    pub fn source(mut self, source: S) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the per-item action.
    pub fn action(mut self, action: A) -> Self {
        self.action = Some(action);
        self
    }

    /// Set the lifecycle hooks.
    pub fn hooks(mut self, hooks: impl RunHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Assemble the pipeline, verifying both collaborators were supplied
    /// and the configuration is valid.
    pub fn build(self) -> PipelineResult<Pipeline<S, A>> {
        let source = self.source.ok_or(PipelineError::MissingCollaborator {
            capability: "source",
        })?;
        let action = self.action.ok_or(PipelineError::MissingCollaborator {
            capability: "action",
        })?;
        validate(&self.config)?;

        Ok(Pipeline {
            config: self.config,
            source: Arc::new(source),
            action: Arc::new(action),
            hooks: self.hooks,
        })
    }
}

fn validate(config: &PipelineConfig) -> PipelineResult<()> {
    config
        .validate()
        .map_err(|errors| PipelineError::config(errors.join("; ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::work::{FnAction, VecSource};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_action() -> (
        Arc<AtomicU32>,
        FnAction<u32, impl Fn(u32) -> std::future::Ready<PipelineResult<()>> + Send + Sync>,
    ) {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&calls);
        let action = FnAction::new(move |_n: u32| {
            seen.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(()))
        });
        (calls, action)
    }

    #[tokio::test]
    async fn builder_requires_source_and_action() {
        let builder: PipelineBuilder<VecSource<u32>, FnAction<u32, _>> =
            Pipeline::builder().action(FnAction::new(|_n: u32| std::future::ready(Ok(()))));

        match builder.build() {
            Err(PipelineError::MissingCollaborator { capability }) => {
                assert_eq!(capability, "source");
            }
            Err(other) => panic!("expected missing source, got {other}"),
            Ok(_) => panic!("expected missing source, got a pipeline"),
        }
    }

    #[tokio::test]
    async fn builder_rejects_invalid_config() {
        let (_, action) = counting_action();
        let result = Pipeline::builder()
            .config(PipelineConfig::default().with_workers(5000))
            .source(VecSource::new(vec![1u32]))
            .action(action)
            .build();
        assert!(matches!(result, Err(PipelineError::Config { .. })));
    }

    #[tokio::test]
    async fn run_consumes_the_pipeline() {
        let (calls, action) = counting_action();
        let pipeline = Pipeline::new(
            PipelineConfig::default()
                .with_workers(2)
                .with_consumer_retry(RetryPolicy::fixed(2, 1)),
            VecSource::new(vec![1u32, 2, 3]),
            action,
        )
        .unwrap();

        let consumed = pipeline.run().await.unwrap();
        assert_eq!(consumed, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // `pipeline` is moved; a second run needs a fresh construction.
    }

    struct CountingHooks {
        before: AtomicU32,
        around: AtomicU32,
        after: AtomicU32,
    }

    #[async_trait]
    impl RunHooks for Arc<CountingHooks> {
        async fn before_run(&self) -> PipelineResult<()> {
            self.before.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn around_run(&self, dispatch: Dispatch) -> PipelineResult<()> {
            self.around.fetch_add(1, Ordering::SeqCst);
            dispatch.await
        }

        async fn after_run(&self) -> PipelineResult<()> {
            self.after.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn hooks_run_in_order_exactly_once() {
        let hooks = Arc::new(CountingHooks {
            before: AtomicU32::new(0),
            around: AtomicU32::new(0),
            after: AtomicU32::new(0),
        });
        let (_, action) = counting_action();

        let consumed = Pipeline::new(
            PipelineConfig::synchronous(),
            VecSource::new(vec![1u32, 2]),
            action,
        )
        .unwrap()
        .with_hooks(Arc::clone(&hooks))
        .run()
        .await
        .unwrap();

        assert_eq!(consumed, 2);
        assert_eq!(hooks.before.load(Ordering::SeqCst), 1);
        assert_eq!(hooks.around.load(Ordering::SeqCst), 1);
        assert_eq!(hooks.after.load(Ordering::SeqCst), 1);
    }

    struct FailingBeforeHook;

    #[async_trait]
    impl RunHooks for FailingBeforeHook {
        async fn before_run(&self) -> PipelineResult<()> {
            Err(PipelineError::hook("before_run", "refused"))
        }
    }

    #[tokio::test]
    async fn hook_errors_abort_the_run() {
        let (calls, action) = counting_action();
        let result = Pipeline::new(
            PipelineConfig::synchronous(),
            VecSource::new(vec![1u32, 2]),
            action,
        )
        .unwrap()
        .with_hooks(FailingBeforeHook)
        .run()
        .await;

        assert!(matches!(result, Err(PipelineError::Hook { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    struct SkippingAroundHook;

    #[async_trait]
    impl RunHooks for SkippingAroundHook {
        async fn around_run(&self, dispatch: Dispatch) -> PipelineResult<()> {
            // Never awaits the continuation.
            drop(dispatch);
            Ok(())
        }
    }

    #[tokio::test]
    async fn skipping_the_continuation_consumes_nothing() {
        let (calls, action) = counting_action();
        let consumed = Pipeline::new(
            PipelineConfig::synchronous(),
            VecSource::new(vec![1u32, 2, 3]),
            action,
        )
        .unwrap()
        .with_hooks(SkippingAroundHook)
        .run()
        .await
        .unwrap();

        assert_eq!(consumed, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
