//! # pipework
//!
//! An embeddable producer/consumer execution engine for batch jobs that
//! stream a large, possibly unbounded number of work items (rows, files,
//! messages) through a processing step without loading everything into
//! memory or overwhelming a downstream resource.
//!
//! ## Features
//!
//! - **Bounded memory**: a fixed-capacity queue (2 x workers) between the
//!   producer and the consumers creates automatic backpressure
//! - **Graceful shutdown**: a tagged end-of-stream signal per consumer,
//!   delivered even when the producer fails
//! - **Retryable loops**: per-role fixed-delay retry around the whole
//!   producer and consumer loops
//! - **Dry-run and verbose modes**: skip the action but keep counting, or
//!   log progress every 100 items
//! - **Lifecycle hooks**: before/around/after callbacks as an explicit
//!   strategy object
//!
//! ## Quick Start
//!
//! ```rust
//! use pipework::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> PipelineResult<()> {
//!     let source = VecSource::new((0u64..200).collect());
//!     let action = FnAction::new(|customer_id: u64| async move {
//!         // send the mail, write the row, upload the file...
//!         let _ = customer_id;
//!         Ok(())
//!     });
//!
//!     let consumed = Pipeline::builder()
//!         .config(PipelineConfig::default().with_workers(4))
//!         .source(source)
//!         .action(action)
//!         .build()?
//!         .run()
//!         .await?;
//!
//!     assert_eq!(consumed, 200);
//!     Ok(())
//! }
//! ```
//!
//! Setting `workers` to 0 runs everything synchronously in the calling
//! task — no queue, no spawned tasks — which is the mode to reach for when
//! debugging an `ItemSource` or `ItemAction` implementation.

pub mod config;
pub mod core;
pub mod error;
pub mod hooks;
pub mod queue;
pub mod stage;
pub mod work;

pub mod prelude {
    pub use crate::config::{PipelineConfig, RetryPolicy};
    pub use crate::core::{Pipeline, PipelineBuilder, Role};
    pub use crate::error::{PipelineError, PipelineResult};
    pub use crate::hooks::{Dispatch, NoopHooks, RunHooks};
    pub use crate::queue::Envelope;
    pub use crate::stage::{StageReader, StageWriter, stage};
    pub use crate::work::{FnAction, ItemAction, ItemSource, VecSource};
    pub use async_trait::async_trait;
}

pub use crate::config::{PipelineConfig, RetryPolicy};
pub use crate::core::{Pipeline, PipelineBuilder, Role};
pub use crate::error::{PipelineError, PipelineResult};
pub use crate::hooks::{Dispatch, NoopHooks, RunHooks};
pub use crate::work::{FnAction, ItemAction, ItemSource, VecSource};
pub use async_trait::async_trait;
