//! Run-scoped progress counters.
//!
//! `produced` has a single writer (the producer task) but is read from other
//! tasks for logging, so it is atomic rather than a plain integer.
//! `consumed` is written by every consumer and lives behind one shared lock;
//! the increment and the every-100th log check happen under the same lock
//! acquisition so the threshold is never skipped or double-logged under
//! contention.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// How often progress lines are emitted when verbose.
const LOG_EVERY: u64 = 100;

/// Counters shared by the producer and consumer loops of one run.
pub struct Progress {
    verbose: bool,
    dry_run: bool,
    produced: AtomicU64,
    consumed: Mutex<u64>,
}

impl Progress {
    pub(crate) fn new(verbose: bool, dry_run: bool) -> Self {
        Self {
            verbose,
            dry_run,
            produced: AtomicU64::new(0),
            consumed: Mutex::new(0),
        }
    }

    /// Whether this run logs at all.
    pub(crate) fn verbose(&self) -> bool {
        self.verbose
    }

    /// Whether this run skips the per-item action.
    pub(crate) fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Items pushed into the queue so far.
    pub fn produced(&self) -> u64 {
        self.produced.load(Ordering::Relaxed)
    }

    /// Items counted as consumed so far.
    pub async fn consumed(&self) -> u64 {
        *self.consumed.lock().await
    }

    /// Record one produced item. Producer task only.
    pub(crate) fn record_produced(&self) -> u64 {
        let count = self.produced.fetch_add(1, Ordering::Relaxed) + 1;
        if self.verbose && count % LOG_EVERY == 0 {
            tracing::info!(dry = self.dry_run, "P:{count}");
        }
        count
    }

    /// Record one consumed item, from any consumer.
    pub(crate) async fn record_consumed(&self) -> u64 {
        let mut consumed = self.consumed.lock().await;
        *consumed += 1;
        let count = *consumed;
        if self.verbose && count % LOG_EVERY == 0 {
            tracing::info!(dry = self.dry_run, "C:{count}");
        }
        count
    }
}
