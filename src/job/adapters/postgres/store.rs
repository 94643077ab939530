//! `PostgreSQL` job store using skip-locked claims.

use super::{
    models::{InsertedJobId, JobRow},
    sql::JobSql,
    table::TableName,
};
use crate::job::{
    domain::{Job, JobDomainError, JobId, JobStatus, PersistedJobData},
    ports::{Dispatch, JobStore, JobStoreError, JobStoreResult},
};
use async_trait::async_trait;
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::Error as DieselError;
use diesel::sql_types::{Array, BigInt, Nullable, Text};
use std::sync::Arc;
use tracing::instrument;

/// `PostgreSQL` connection pool type used by the job store.
pub type JobPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed job store.
///
/// The pool is owned by the host; the store only borrows connections for the
/// duration of each operation. Every store targets one job table, which
/// defaults to [`TableName::default`].
#[derive(Debug, Clone)]
pub struct PostgresJobStore {
    pool: JobPgPool,
    table: TableName,
    sql: Arc<JobSql>,
}

impl PostgresJobStore {
    /// Creates a store over the default job table.
    #[must_use]
    pub fn new(pool: JobPgPool) -> Self {
        Self::with_table_name(pool, TableName::default())
    }

    /// Creates a store over the given job table.
    #[must_use]
    pub fn with_table_name(pool: JobPgPool, table: TableName) -> Self {
        let sql = Arc::new(JobSql::for_table(&table));
        Self { pool, table, sql }
    }

    /// Returns the job table this store reads and writes.
    #[must_use]
    pub const fn table_name(&self) -> &TableName {
        &self.table
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &JobPgPool {
        &self.pool
    }

    async fn run_blocking<F, T>(&self, f: F) -> JobStoreResult<T>
    where
        F: FnOnce(&mut PgConnection, &JobSql) -> JobStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        let sql = Arc::clone(&self.sql);
        let span = tracing::Span::current();
        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            let mut connection = pool.get().map_err(JobStoreError::connection)?;
            f(&mut connection, &sql)
        })
        .await
        .map_err(JobStoreError::aborted)?
    }
}

/// Lets Diesel report begin, commit, and rollback failures.
impl From<DieselError> for JobStoreError {
    fn from(err: DieselError) -> Self {
        Self::transaction(err)
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    #[instrument(skip_all, err, fields(table = %self.table))]
    async fn setup(&self) -> JobStoreResult<()> {
        self.run_blocking(|connection, sql| {
            connection
                .transaction::<_, JobStoreError, _>(|tx| {
                    tx.batch_execute(&sql.setup).map_err(JobStoreError::setup)
                })
                .map_err(|err| match err {
                    JobStoreError::Transaction(source) => JobStoreError::Setup(source),
                    other => other,
                })
        })
        .await
    }

    #[instrument(skip_all, err, fields(table = %self.table, job_type = job_type))]
    async fn insert(&self, job_type: &str, data: &str) -> JobStoreResult<JobId> {
        let job_type = job_type.to_owned();
        let data = data.to_owned();
        self.run_blocking(move |connection, sql| {
            let inserted = diesel::sql_query(sql.insert.as_str())
                .bind::<Text, _>(job_type)
                .bind::<Text, _>(data)
                .get_result::<InsertedJobId>(connection)
                .map_err(JobStoreError::insert)?;
            Ok(JobId::new(inserted.id))
        })
        .await
    }

    #[instrument(skip_all, err, fields(table = %self.table, job_types = ?job_types))]
    async fn claim_and_resolve(
        &self,
        job_types: &[String],
        dispatch: Dispatch,
    ) -> JobStoreResult<Option<Job>> {
        let job_types = job_types.to_vec();
        self.run_blocking(move |connection, sql| {
            connection.transaction::<_, JobStoreError, _>(|tx| {
                let claimed = diesel::sql_query(sql.claim.as_str())
                    .bind::<Text, _>(JobStatus::Running.as_str())
                    .bind::<Text, _>(JobStatus::Waiting.as_str())
                    .bind::<Array<Text>, _>(job_types)
                    .get_result::<JobRow>(tx)
                    .optional()
                    .map_err(JobStoreError::claim)?;

                let Some(row) = claimed else {
                    tracing::trace!("no claimable job");
                    return Ok(None);
                };
                let job = row_to_job(row)?;
                let job_id = job.id();
                tracing::debug!(
                    job_id = job_id.value(),
                    job_type = job.job_type(),
                    attempt = job.attempt(),
                    "claimed job"
                );

                let outcome = dispatch(job);

                let resolved = diesel::sql_query(sql.resolve.as_str())
                    .bind::<Text, _>(outcome.status().as_str())
                    .bind::<Nullable<Text>, _>(outcome.error().map(str::to_owned))
                    .bind::<BigInt, _>(job_id.value())
                    .get_result::<JobRow>(tx)
                    .map_err(JobStoreError::resolve)?;
                row_to_job(resolved).map(Some)
            })
        })
        .await
    }

    async fn find_by_id(&self, id: JobId) -> JobStoreResult<Option<Job>> {
        self.run_blocking(move |connection, sql| {
            let row = diesel::sql_query(sql.find_by_id.as_str())
                .bind::<BigInt, _>(id.value())
                .get_result::<JobRow>(connection)
                .optional()
                .map_err(JobStoreError::lookup)?;
            row.map(row_to_job).transpose()
        })
        .await
    }
}

fn row_to_job(row: JobRow) -> JobStoreResult<Job> {
    let JobRow {
        id,
        job_type,
        data,
        status: persisted_status,
        error,
        attempt: persisted_attempt,
        created_at,
        started_at,
        finished_at,
    } = row;

    let id = JobId::new(id);
    let status =
        JobStatus::try_from(persisted_status.as_str()).map_err(JobStoreError::decode)?;
    let attempt = u32::try_from(persisted_attempt).map_err(|_| {
        JobStoreError::decode(JobDomainError::InvalidAttempt {
            id,
            attempt: i64::from(persisted_attempt),
        })
    })?;

    Ok(Job::from_persisted(PersistedJobData {
        id,
        job_type,
        data,
        status,
        error,
        attempt,
        created_at,
        started_at,
        finished_at,
    }))
}
