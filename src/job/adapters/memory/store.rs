//! In-memory job store for tests and single-process hosts.

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::instrument;

use crate::job::{
    domain::{Job, JobId, JobStatus},
    ports::{Dispatch, JobStore, JobStoreError, JobStoreResult},
};

/// Thread-safe in-memory job store.
///
/// Mirrors the `PostgreSQL` claim semantics: a claimed job is hidden from
/// other claimants while its handler runs, readers keep seeing the
/// pre-claim row until the outcome is recorded, and a panicking handler
/// leaves the row untouched.
pub struct InMemoryJobStore<C = DefaultClock>
where
    C: Clock + Send + Sync,
{
    state: Arc<Mutex<InMemoryJobState>>,
    clock: Arc<C>,
}

#[derive(Debug, Default)]
struct InMemoryJobState {
    jobs: BTreeMap<JobId, Job>,
    in_flight: HashSet<JobId>,
    last_id: i64,
}

impl InMemoryJobStore<DefaultClock> {
    /// Creates an empty store backed by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }
}

impl Default for InMemoryJobStore<DefaultClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for InMemoryJobStore<C>
where
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C> InMemoryJobStore<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty store stamping timestamps from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<C>) -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryJobState::default())),
            clock,
        }
    }

    /// Returns a snapshot of every stored job in identifier order.
    ///
    /// # Errors
    ///
    /// Returns [`JobStoreError::Connection`] if the state lock is poisoned.
    pub fn snapshot(&self) -> JobStoreResult<Vec<Job>> {
        let state = self.lock()?;
        Ok(state.jobs.values().cloned().collect())
    }

    fn lock(&self) -> JobStoreResult<MutexGuard<'_, InMemoryJobState>> {
        self.state
            .lock()
            .map_err(|err| JobStoreError::connection(std::io::Error::other(err.to_string())))
    }

    fn claim_next(&self, job_types: &[String]) -> JobStoreResult<Option<Job>> {
        let mut state = self.lock()?;
        let candidate = state
            .jobs
            .values()
            .find(|job| {
                job.status() == JobStatus::Waiting
                    && !state.in_flight.contains(&job.id())
                    && job_types.iter().any(|job_type| job_type == job.job_type())
            })
            .cloned();

        let Some(mut claimed) = candidate else {
            return Ok(None);
        };
        claimed
            .claim(self.clock.utc())
            .map_err(JobStoreError::claim)?;
        state.in_flight.insert(claimed.id());
        Ok(Some(claimed))
    }

    fn dispatch_next(
        &self,
        job_types: &[String],
        dispatch: Dispatch,
    ) -> JobStoreResult<Option<Job>> {
        let Some(claimed) = self.claim_next(job_types)? else {
            tracing::trace!("no claimable job");
            return Ok(None);
        };
        let job_id = claimed.id();
        tracing::Span::current().record("job_id", job_id.value());
        let claim = InFlightClaim {
            state: Arc::clone(&self.state),
            id: job_id,
        };

        let outcome = dispatch(claimed.clone());

        let mut resolved = claimed;
        resolved
            .resolve(&outcome, self.clock.utc())
            .map_err(JobStoreError::resolve)?;
        self.lock()?.jobs.insert(job_id, resolved.clone());
        // Terminal before the mark is released.
        drop(claim);
        Ok(Some(resolved))
    }
}

/// In-flight mark for a claimed job, released on drop.
///
/// Covers every exit from dispatch, including a panicking handler.
struct InFlightClaim {
    state: Arc<Mutex<InMemoryJobState>>,
    id: JobId,
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.in_flight.remove(&self.id);
    }
}

#[async_trait]
impl<C> JobStore for InMemoryJobStore<C>
where
    C: Clock + Send + Sync + 'static,
{
    async fn setup(&self) -> JobStoreResult<()> {
        Ok(())
    }

    #[instrument(skip_all, err, fields(job_type = job_type))]
    async fn insert(&self, job_type: &str, data: &str) -> JobStoreResult<JobId> {
        let mut state = self.lock()?;
        state.last_id = state.last_id.saturating_add(1);
        let id = JobId::new(state.last_id);
        let job = Job::new_waiting(id, job_type, data, self.clock.utc());
        state.jobs.insert(id, job);
        Ok(id)
    }

    #[instrument(skip_all, err, fields(job_types = ?job_types, job_id))]
    async fn claim_and_resolve(
        &self,
        job_types: &[String],
        dispatch: Dispatch,
    ) -> JobStoreResult<Option<Job>> {
        let store = self.clone();
        let job_types = job_types.to_vec();
        let span = tracing::Span::current();
        // Completes even when the caller's future is dropped.
        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            store.dispatch_next(&job_types, dispatch)
        })
        .await
        .map_err(JobStoreError::aborted)?
    }

    async fn find_by_id(&self, id: JobId) -> JobStoreResult<Option<Job>> {
        let state = self.lock()?;
        Ok(state.jobs.get(&id).cloned())
    }
}
