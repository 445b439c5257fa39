//! Fixed-delay retry around a whole unit of work.
//!
//! The wrapper knows nothing about partial progress inside the block it
//! runs: on failure the *entire* block is re-executed from its start. The
//! producer and consumer loops lean on that deliberately (re-iterate the
//! scope, resume from a fresh pop); see the engine for the duplication and
//! loss consequences.

use crate::config::RetryPolicy;
use crate::core::progress::Progress;
use crate::error::PipelineResult;
use std::fmt;
use std::future::Future;
use tokio::time::sleep;

/// Error text is clipped to this many characters in log lines.
const ERROR_CLIP: usize = 200;

/// Which loop a retry wrapper is protecting; tags every log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The single producer task.
    Producer,
    /// Consumer task with its worker index.
    Consumer(usize),
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Producer => write!(f, "producer.0"),
            Role::Consumer(index) => write!(f, "consumer.{index}"),
        }
    }
}

/// Run `op`; on failure wait the policy's fixed delay and re-run the whole
/// thing, up to `max_attempts` total attempts. The last error is returned
/// once attempts are exhausted.
///
/// Failures are logged (clipped) only when the run is verbose; a quiet run
/// stays quiet on every failure path.
pub(crate) async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    role: Role,
    progress: &Progress,
    mut op: F,
) -> PipelineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PipelineResult<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut remaining = attempts;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if progress.verbose() {
                    let consumed = progress.consumed().await;
                    tracing::warn!(
                        role = %role,
                        dry = progress.dry_run(),
                        produced = progress.produced(),
                        consumed,
                        "error - {}",
                        clip(&error.to_string()),
                    );
                }

                remaining -= 1;
                if remaining == 0 {
                    if progress.verbose() {
                        tracing::warn!(
                            role = %role,
                            dry = progress.dry_run(),
                            "failed after {attempts} attempts!",
                        );
                    }
                    return Err(error);
                }

                sleep(policy.delay()).await;
            }
        }
    }
}

fn clip(message: &str) -> &str {
    match message.char_indices().nth(ERROR_CLIP) {
        Some((index, _)) => &message[..index],
        None => message,
    }
}
