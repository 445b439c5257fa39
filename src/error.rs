//! Error types for pipework operations.

use thiserror::Error;

/// Result type used throughout pipework.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Main error type for pipework operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The item source failed while being iterated
    #[error("Supplier failed: {message}")]
    Supplier {
        /// Error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The per-item action failed
    #[error("Action failed: {message}")]
    Action {
        /// Error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A lifecycle hook failed; this aborts the whole run
    #[error("Hook '{hook}' failed: {message}")]
    Hook {
        /// Which hook failed (`before_run`, `around_run` or `after_run`)
        hook: &'static str,
        /// Error message
        message: String,
    },

    /// The work queue was closed before the run finished
    #[error("Work queue closed: {message}")]
    QueueClosed {
        /// Error message
        message: String,
    },

    /// A required collaborator was never supplied to the builder
    #[error("Required collaborator '{capability}' was not supplied")]
    MissingCollaborator {
        /// The missing capability (`source` or `action`)
        capability: &'static str,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },
}

impl PipelineError {
    /// Create a supplier error from an underlying error.
    pub fn supplier<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Supplier {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a supplier error with a message only.
    pub fn supplier_msg(message: impl Into<String>) -> Self {
        Self::Supplier {
            message: message.into(),
            source: None,
        }
    }

    /// Create an action error from an underlying error.
    pub fn action<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Action {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an action error with a message only.
    pub fn action_msg(message: impl Into<String>) -> Self {
        Self::Action {
            message: message.into(),
            source: None,
        }
    }

    /// Create a hook error.
    pub fn hook(hook: &'static str, message: impl Into<String>) -> Self {
        Self::Hook {
            hook,
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a closed-queue error.
    pub fn queue_closed(message: impl Into<String>) -> Self {
        Self::QueueClosed {
            message: message.into(),
        }
    }
}
