//! Error types surfaced by `StepTable` and `SizeSchedule`.

use thiserror::Error;

/// Failures of table operations.
///
/// `KeyNotFound` is an ordinary control-flow signal: callers typically
/// branch on it to initialise a fresh entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepTableError {
    #[error("key not found")]
    KeyNotFound,
    #[error("table is full at capacity {capacity} and the size schedule is exhausted")]
    CapacityExhausted { capacity: usize },
    #[error("keys must contain at least one character")]
    EmptyKey,
    #[error("invalid size schedule: {0}")]
    InvalidSchedule(#[from] ScheduleError),
}

/// Reasons a custom size schedule is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("schedule has no sizes")]
    Empty,
    #[error("size at index {index} is not larger than the one before it")]
    NotAscending { index: usize },
    // Non-prime sizes share factors with some probe steps, which would
    // leave slots unreachable.
    #[error("size {size} is not prime")]
    NotPrime { size: usize },
}
