//! Queue service: handler registration, enqueue, and claim-and-dispatch.

use super::registry::{HandlerRegistry, HandlerResult};
use crate::job::{
    domain::{Job, JobId, JobStatus},
    ports::{JobStore, JobStoreError},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Service-level errors for queue operations.
///
/// Configuration errors are raised before the store is touched.
#[derive(Debug, Error)]
pub enum QueueError {
    /// A handler is already bound to the job type on this queue.
    #[error("queue: handler already registered for job type {0}")]
    DuplicateHandler(String),

    /// No handler is bound to the job type on this queue.
    #[error("queue: no handler registered for job type {0}")]
    MissingHandler(String),

    /// `pop` was called without any job type.
    #[error("queue: no job type specified")]
    NoJobType,

    /// The job store failed.
    #[error(transparent)]
    Store(#[from] JobStoreError),
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Durable multi-type job queue.
///
/// A queue pairs a [`JobStore`] with a process-local [`HandlerRegistry`].
/// It owns no persistent state, so any number of queues, in one process or
/// many, may compete for the same backlog; the store's row locking keeps
/// each job with exactly one claimant.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use diesel::r2d2::{ConnectionManager, Pool};
/// use pgq::job::{adapters::postgres::PostgresJobStore, services::Queue};
///
/// let pool = Pool::builder().build(ConnectionManager::new("postgres://..."))?;
/// let mut queue = Queue::new(Arc::new(PostgresJobStore::new(pool)));
/// queue.setup().await?;
/// queue.register_handler("email", |job| send_email(job.data()))?;
/// queue.put("email", "hi").await?;
/// queue.pop(&["email"]).await?;
/// ```
#[derive(Debug)]
pub struct Queue<S>
where
    S: JobStore,
{
    store: Arc<S>,
    handlers: HandlerRegistry,
}

impl<S> Queue<S>
where
    S: JobStore,
{
    /// Creates a queue over `store` with no handlers bound.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            handlers: HandlerRegistry::new(),
        }
    }

    /// Returns the underlying job store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Ensures the job table and its index exist.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Store`] when schema bootstrap fails.
    pub async fn setup(&self) -> QueueResult<()> {
        self.store.setup().await?;
        Ok(())
    }

    /// Binds `handler` to `job_type` on this queue.
    ///
    /// The handler receives the claimed job by value and runs while the
    /// claim is held; an `Err` marks the job as failed with the error's
    /// message.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::DuplicateHandler`] when the type is already
    /// bound. The existing binding is kept.
    pub fn register_handler<F>(&mut self, job_type: impl Into<String>, handler: F) -> QueueResult<()>
    where
        F: Fn(Job) -> HandlerResult + Send + Sync + 'static,
    {
        self.handlers.register(job_type, handler)
    }

    /// Returns `true` when this queue can execute `job_type`.
    #[must_use]
    pub fn handles(&self, job_type: &str) -> bool {
        self.handlers.contains(job_type)
    }

    /// Returns the job types this queue can execute, in lexical order.
    #[must_use]
    pub fn registered_types(&self) -> Vec<&str> {
        self.handlers.job_types()
    }

    /// Enqueues a job of `job_type` carrying `data`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::MissingHandler`] when no handler is bound to
    /// the type, or [`QueueError::Store`] when the insert fails.
    #[instrument(skip_all, err, fields(job_type = job_type))]
    pub async fn put(&self, job_type: &str, data: &str) -> QueueResult<JobId> {
        if !self.handlers.contains(job_type) {
            return Err(QueueError::MissingHandler(job_type.to_owned()));
        }
        let id = self.store.insert(job_type, data).await?;
        tracing::debug!(job_id = id.value(), "enqueued job");
        Ok(id)
    }

    /// Claims the oldest waiting job among `job_types`, runs its handler,
    /// and records the outcome.
    ///
    /// Returns the resolved job, or `None` when the backlog holds nothing
    /// claimable. A handler error is recorded on the job and is not an
    /// error of this call.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NoJobType`] for an empty type list,
    /// [`QueueError::MissingHandler`] when any requested type is unbound
    /// (checked before the store is touched), or [`QueueError::Store`] when
    /// the claim transaction fails; in that case the job is left as it was.
    #[instrument(skip_all, err, fields(job_types, job_id))]
    pub async fn pop<T>(&self, job_types: &[T]) -> QueueResult<Option<Job>>
    where
        T: AsRef<str> + Sync,
    {
        if job_types.is_empty() {
            return Err(QueueError::NoJobType);
        }
        let requested: Vec<String> = job_types
            .iter()
            .map(|job_type| job_type.as_ref().to_owned())
            .collect();
        let span = tracing::Span::current();
        span.record("job_types", tracing::field::debug(&requested));

        let dispatch = self.handlers.select(&requested)?.into_dispatch();
        let resolved = self.store.claim_and_resolve(&requested, dispatch).await?;

        if let Some(job) = &resolved {
            span.record("job_id", job.id().value());
            log_resolution(job);
        }
        Ok(resolved)
    }

    /// Finds a job by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Store`] when the lookup fails.
    pub async fn find_job(&self, id: JobId) -> QueueResult<Option<Job>> {
        Ok(self.store.find_by_id(id).await?)
    }
}

fn log_resolution(job: &Job) {
    if job.status() == JobStatus::Error {
        tracing::warn!(
            job_type = job.job_type(),
            attempt = job.attempt(),
            error = job.error().unwrap_or_default(),
            "job handler failed"
        );
    } else {
        tracing::debug!(
            job_type = job.job_type(),
            attempt = job.attempt(),
            status = %job.status(),
            "job resolved"
        );
    }
}
