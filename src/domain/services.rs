//! Ambient dependencies handed to the aggregate at command time.

use crate::domain::types::TimestampUtc;

/// Dependencies for command handling. The clock is the only one: every
/// event timestamp (dispatch, completion, review decisions) flows through
/// it, so handlers never read wall time directly.
#[derive(Debug, Clone, Default)]
pub struct WorkflowServices {
    pub clock: WorkflowClock,
}

impl WorkflowServices {
    /// Services with a clock pinned to `at`, for deterministic tests.
    pub fn pinned(at: TimestampUtc) -> Self {
        Self {
            clock: WorkflowClock::Fixed(at),
        }
    }
}

/// Timestamp source for emitted events.
#[derive(Debug, Clone, Default)]
pub enum WorkflowClock {
    /// Wall-clock UTC.
    #[default]
    System,
    /// A frozen instant.
    Fixed(TimestampUtc),
}

impl WorkflowClock {
    pub fn now(&self) -> TimestampUtc {
        match self {
            WorkflowClock::System => TimestampUtc::now(),
            WorkflowClock::Fixed(at) => *at,
        }
    }
}
