//! Job record and lifecycle state machine.

use super::{JobDomainError, JobId, ParseJobStatusError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Job lifecycle status.
///
/// ```text
/// waiting --(claim)--> running --(handler Ok)--> done
///                            \--(handler Err)--> error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting to be claimed.
    Waiting,
    /// Job has been claimed and its handler is executing.
    Running,
    /// Handler finished successfully.
    Done,
    /// Handler returned an error.
    Error,
}

impl JobStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// Returns `true` for statuses no built-in transition leaves.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl TryFrom<&str> for JobStatus {
    type Error = ParseJobStatusError;

    fn try_from(value: &str) -> Result<Self, ParseJobStatusError> {
        match value {
            "waiting" => Ok(Self::Waiting),
            "running" => Ok(Self::Running),
            "done" => Ok(Self::Done),
            "error" => Ok(Self::Error),
            _ => Err(ParseJobStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running a handler against a claimed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The handler succeeded.
    Done,
    /// The handler failed with the given message.
    Failed(String),
}

impl JobOutcome {
    /// Maps a handler result onto an outcome, keeping the error's message.
    #[must_use]
    pub fn from_result<E: fmt::Display>(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::Done,
            Err(err) => Self::Failed(err.to_string()),
        }
    }

    /// Returns the terminal status this outcome resolves to.
    #[must_use]
    pub const fn status(&self) -> JobStatus {
        match self {
            Self::Done => JobStatus::Done,
            Self::Failed(_) => JobStatus::Error,
        }
    }

    /// Returns the error message to persist, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Done => None,
            Self::Failed(message) => Some(message),
        }
    }
}

/// A unit of work persisted in the job table.
///
/// Serialisable for inspection; jobs are only rebuilt from storage through
/// [`Job::from_persisted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    id: JobId,
    job_type: String,
    data: String,
    status: JobStatus,
    error: Option<String>,
    attempt: u32,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedJobData {
    /// Persisted identifier.
    pub id: JobId,
    /// Persisted job type label.
    pub job_type: String,
    /// Persisted opaque payload.
    pub data: String,
    /// Persisted lifecycle status.
    pub status: JobStatus,
    /// Persisted handler error message.
    pub error: Option<String>,
    /// Persisted claim counter.
    pub attempt: u32,
    /// Persisted insertion timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted timestamp of the latest claim.
    pub started_at: Option<DateTime<Utc>>,
    /// Persisted timestamp of the latest terminal transition.
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates a freshly enqueued job in the waiting state.
    #[must_use]
    pub fn new_waiting(
        id: JobId,
        job_type: impl Into<String>,
        data: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            job_type: job_type.into(),
            data: data.into(),
            status: JobStatus::Waiting,
            error: None,
            attempt: 0,
            created_at,
            started_at: None,
            finished_at: None,
        }
    }

    /// Reconstructs a job from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedJobData) -> Self {
        Self {
            id: data.id,
            job_type: data.job_type,
            data: data.data,
            status: data.status,
            error: data.error,
            attempt: data.attempt,
            created_at: data.created_at,
            started_at: data.started_at,
            finished_at: data.finished_at,
        }
    }

    /// Returns the job identifier.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Returns the job type label.
    #[must_use]
    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    /// Returns the opaque payload.
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> JobStatus {
        self.status
    }

    /// Returns the stored handler error, set only when the status is error.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns how many times the job has been claimed.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns the insertion timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the timestamp of the latest claim.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns the timestamp of the latest terminal transition.
    #[must_use]
    pub const fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Claims a waiting job for execution.
    ///
    /// Increments the attempt counter, stamps `started_at`, and clears any
    /// error and `finished_at` left by an earlier attempt.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTransition`] unless the job is
    /// waiting.
    pub fn claim(&mut self, now: DateTime<Utc>) -> Result<(), JobDomainError> {
        self.ensure_status(JobStatus::Waiting, JobStatus::Running)?;
        self.status = JobStatus::Running;
        self.error = None;
        self.attempt = self.attempt.saturating_add(1);
        self.started_at = Some(now);
        self.finished_at = None;
        Ok(())
    }

    /// Records the handler outcome on a running job.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidTransition`] unless the job is
    /// running.
    pub fn resolve(
        &mut self,
        outcome: &JobOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), JobDomainError> {
        let target = outcome.status();
        self.ensure_status(JobStatus::Running, target)?;
        self.status = target;
        self.error = outcome.error().map(str::to_owned);
        self.finished_at = Some(now);
        Ok(())
    }

    fn ensure_status(&self, expected: JobStatus, to: JobStatus) -> Result<(), JobDomainError> {
        if self.status == expected {
            return Ok(());
        }
        Err(JobDomainError::InvalidTransition {
            id: self.id,
            from: self.status,
            to,
        })
    }
}
