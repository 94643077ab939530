//! Error types for job domain transitions and parsing.

use super::{JobId, JobStatus};
use thiserror::Error;

/// Errors returned while mutating or reconstructing job values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobDomainError {
    /// The requested lifecycle transition is not permitted.
    #[error("job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Job whose transition was rejected.
        id: JobId,
        /// Status the job currently holds.
        from: JobStatus,
        /// Status that was requested.
        to: JobStatus,
    },

    /// A persisted attempt counter is negative.
    #[error("job {id} has invalid attempt count {attempt}")]
    InvalidAttempt {
        /// Job carrying the invalid counter.
        id: JobId,
        /// Persisted counter value.
        attempt: i64,
    },
}

/// Error returned while parsing job statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown job status: {0}")]
pub struct ParseJobStatusError(pub String);
