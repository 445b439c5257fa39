//! Configuration types for pipework.
//!
//! This module contains the settings needed to run a pipeline: how many
//! consumer workers to spawn, whether to log progress, whether to skip the
//! per-item action (dry-run), and the retry policies applied to the producer
//! and consumer loops.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of consumer workers when the caller does not choose one.
///
/// This is a fixed constant rather than something derived from the machine or
/// the environment; callers that want the synchronous path pass 0 explicitly.
pub const DEFAULT_WORKERS: usize = 5;

/// Main configuration for a pipeline run.
///
/// # Examples
///
/// ```rust
/// use pipework::config::{PipelineConfig, RetryPolicy};
///
/// // Default: 5 workers, quiet, real run
/// let config = PipelineConfig::default();
///
/// // Custom
/// let config = PipelineConfig::default()
///     .with_workers(8)
///     .with_verbose(true)
///     .with_consumer_retry(RetryPolicy::fixed(10, 1_000));
///
/// // Synchronous debugging mode: no queue, no spawned tasks
/// let config = PipelineConfig::synchronous();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of consumer workers. 0 selects the synchronous path.
    pub workers: usize,

    /// Emit progress and failure logs. When false the run is completely
    /// silent, including on failure paths.
    pub verbose: bool,

    /// Skip the per-item action but still count items as consumed.
    pub dry_run: bool,

    /// Retry policy for the producer loop (whole-scope iteration).
    pub producer_retry: RetryPolicy,

    /// Retry policy for the consumer loops. Deliberately more generous than
    /// the producer's: individual-item failures are expected to be more
    /// frequent and more transient than whole-scope failures.
    pub consumer_retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            verbose: false,
            dry_run: false,
            producer_retry: RetryPolicy::producer(),
            consumer_retry: RetryPolicy::consumer(),
        }
    }
}

impl PipelineConfig {
    /// Configuration for the synchronous path: everything runs in the
    /// calling task, with no queue and no spawned workers.
    pub fn synchronous() -> Self {
        Self {
            workers: 0,
            ..Default::default()
        }
    }

    /// Set the number of consumer workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Enable or disable progress logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Enable or disable dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the producer retry policy.
    pub fn with_producer_retry(mut self, policy: RetryPolicy) -> Self {
        self.producer_retry = policy;
        self
    }

    /// Set the consumer retry policy.
    pub fn with_consumer_retry(mut self, policy: RetryPolicy) -> Self {
        self.consumer_retry = policy;
        self
    }

    /// Capacity of the bounded work queue: twice the worker count.
    ///
    /// This bounds memory and creates backpressure on the producer; the
    /// minimum of 1 only matters for internal call sites, since the queue is
    /// not allocated at all when `workers` is 0.
    pub fn queue_capacity(&self) -> usize {
        (self.workers * 2).max(1)
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.workers > 1000 {
            errors.push("Number of workers should not exceed 1000".to_string());
        }

        if self.producer_retry.max_attempts == 0 {
            errors.push("Producer retry attempts must be at least 1".to_string());
        }

        if self.consumer_retry.max_attempts == 0 {
            errors.push("Consumer retry attempts must be at least 1".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Fixed-delay retry policy.
///
/// The wrapper it drives re-runs the whole unit of work from the start; see
/// [`crate::core`] for the duplication/loss consequences of that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,

    /// Fixed delay between attempts (in milliseconds). No backoff.
    pub delay_ms: u64,
}

impl RetryPolicy {
    /// Default producer policy: 3 attempts, 5 seconds apart.
    pub fn producer() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 5_000,
        }
    }

    /// Default consumer policy: 20 attempts, 5 seconds apart.
    pub fn consumer() -> Self {
        Self {
            max_attempts: 20,
            delay_ms: 5_000,
        }
    }

    /// Create a policy with explicit attempts and delay.
    pub fn fixed(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            delay_ms,
        }
    }

    /// The delay as a [`Duration`].
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}
