//! Error types for the workflow domain.

use std::fmt::{Display, Formatter};

/// Errors that can occur during workflow command handling.
///
/// Executor failures are not errors here: they are state transitions
/// (step failed, workflow failed). Stale executor callbacks are discarded
/// without error.
#[derive(Debug, Clone)]
pub enum WorkflowError {
    /// Precondition failed; rejected synchronously, nothing was applied.
    Validation { message: String },
    /// Storage/persistence failure.
    StorageFailure { message: String },
    /// Command executed on uninitialized aggregate.
    NotInitialized,
    /// Optimistic lock failure (concurrent modification detected).
    ConcurrencyConflict { message: String },
}

impl WorkflowError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl Display for WorkflowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation { message } => write!(f, "validation failed: {}", message),
            Self::StorageFailure { message } => write!(f, "storage failure: {}", message),
            Self::NotInitialized => write!(f, "workflow not initialized"),
            Self::ConcurrencyConflict { message } => write!(f, "concurrency conflict: {}", message),
        }
    }
}

impl std::error::Error for WorkflowError {}
