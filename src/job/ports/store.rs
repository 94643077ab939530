//! Store port for job persistence and atomic claim-and-dispatch.

use crate::job::domain::{Job, JobId, JobOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for job store operations.
pub type JobStoreResult<T> = Result<T, JobStoreError>;

/// Callback executed against a claimed job while the claim is still open.
///
/// The store passes the claimed row by value and persists the returned
/// outcome as the job's terminal status.
pub type Dispatch = Box<dyn FnOnce(Job) -> JobOutcome + Send>;

/// Job persistence contract.
///
/// Implementations must guarantee that concurrent callers of
/// [`JobStore::claim_and_resolve`] never claim the same row and never block
/// on each other's in-flight claims.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Ensures the job table and its status index exist.
    ///
    /// Idempotent: repeated and concurrent calls succeed.
    ///
    /// # Errors
    ///
    /// Returns [`JobStoreError::Setup`] when the schema cannot be created.
    async fn setup(&self) -> JobStoreResult<()>;

    /// Inserts a waiting job and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`JobStoreError::Insert`] when the row cannot be written.
    async fn insert(&self, job_type: &str, data: &str) -> JobStoreResult<JobId>;

    /// Claims the oldest waiting job whose type is in `job_types`, runs
    /// `dispatch` on it, and records the outcome.
    ///
    /// Claim, dispatch, and resolve form one unit: on any failure the row is
    /// left exactly as it was. Returns `Ok(None)` when nothing is claimable.
    ///
    /// # Errors
    ///
    /// Returns [`JobStoreError`] when claiming, resolving, or committing
    /// fails, or when `dispatch` panics.
    async fn claim_and_resolve(
        &self,
        job_types: &[String],
        dispatch: Dispatch,
    ) -> JobStoreResult<Option<Job>>;

    /// Finds a job by identifier.
    ///
    /// Returns `None` when the job does not exist.
    async fn find_by_id(&self, id: JobId) -> JobStoreResult<Option<Job>>;
}

type SourceError = Arc<dyn std::error::Error + Send + Sync>;

/// Errors returned by job store implementations.
#[derive(Debug, Clone, Error)]
pub enum JobStoreError {
    /// A database connection could not be obtained.
    #[error("queue: failed to acquire connection: {0}")]
    Connection(SourceError),

    /// Schema bootstrap failed.
    #[error("queue: failed to setup database: {0}")]
    Setup(SourceError),

    /// Enqueueing a job failed.
    #[error("queue: failed to add job: {0}")]
    Insert(SourceError),

    /// The atomic claim statement failed.
    #[error("queue: failed to pop job: {0}")]
    Claim(SourceError),

    /// Writing the terminal status failed.
    #[error("queue: failed to update job status: {0}")]
    Resolve(SourceError),

    /// Reading a job failed.
    #[error("queue: failed to find job: {0}")]
    Lookup(SourceError),

    /// Opening or closing the transaction failed.
    #[error("queue: transaction failed: {0}")]
    Transaction(SourceError),

    /// A stored row could not be mapped onto a [`Job`].
    #[error("queue: failed to decode job row: {0}")]
    Decode(SourceError),

    /// The blocking database task or the handler panicked.
    #[error("queue: job dispatch aborted: {0}")]
    Aborted(SourceError),
}

impl JobStoreError {
    /// Wraps a connection failure.
    pub fn connection(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Connection(Arc::new(err))
    }

    /// Wraps a schema bootstrap failure.
    pub fn setup(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Setup(Arc::new(err))
    }

    /// Wraps an insert failure.
    pub fn insert(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Insert(Arc::new(err))
    }

    /// Wraps a claim failure.
    pub fn claim(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Claim(Arc::new(err))
    }

    /// Wraps a resolve failure.
    pub fn resolve(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Resolve(Arc::new(err))
    }

    /// Wraps a lookup failure.
    pub fn lookup(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Lookup(Arc::new(err))
    }

    /// Wraps a transaction failure.
    pub fn transaction(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transaction(Arc::new(err))
    }

    /// Wraps a row decoding failure.
    pub fn decode(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Decode(Arc::new(err))
    }

    /// Wraps an aborted blocking task.
    pub fn aborted(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Aborted(Arc::new(err))
    }
}
