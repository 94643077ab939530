//! Shared test helpers for `PostgreSQL` integration tests.

pub use super::cluster::{BoxError, PostgresCluster, init_tracing, postgres_cluster};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use pgq::job::adapters::postgres::{JobPgPool, PostgresJobStore, TableName};
use rstest::fixture;
use std::sync::Arc;
use tokio::runtime::Runtime;
use uuid::Uuid;

/// Builds the runtime tests drive the store with.
///
/// Multi-threaded so that concurrent pops really overlap.
///
/// # Errors
///
/// Returns an error if the runtime cannot be created.
pub fn test_runtime() -> Result<Runtime, BoxError> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()?)
}

/// Drops a temporary database when the guard goes out of scope.
pub struct CleanupGuard {
    cluster: PostgresCluster,
    db_name: String,
}

impl CleanupGuard {
    /// Creates a guard for `db_name` on `cluster`.
    #[must_use]
    pub const fn new(cluster: PostgresCluster, db_name: String) -> Self {
        Self { cluster, db_name }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Err(err) = self.cluster.drop_database(&self.db_name) {
            tracing::warn!(db = %self.db_name, error = %err, "failed to drop test database");
        }
    }
}

/// A throwaway database with a pooled store over it.
///
/// Field order matters: the store and pool close their connections before
/// the guard drops the database.
pub struct QueueDb {
    /// Runtime used to drive async store calls.
    pub rt: Runtime,
    /// Store over the default job table.
    pub store: Arc<PostgresJobStore>,
    /// Pool shared with the store, for building extra stores and raw checks.
    pub pool: JobPgPool,
    /// Connection URL of the temporary database.
    pub url: String,
    _guard: CleanupGuard,
}

impl QueueDb {
    /// Creates a second store over `table` sharing this database's pool.
    ///
    /// # Errors
    ///
    /// Returns an error if `table` is not a valid table name.
    pub fn store_for_table(&self, table: &str) -> Result<Arc<PostgresJobStore>, BoxError> {
        let table = TableName::new(table)?;
        Ok(Arc::new(PostgresJobStore::with_table_name(
            self.pool.clone(),
            table,
        )))
    }

    /// Opens a connection outside the pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn connect(&self) -> Result<PgConnection, BoxError> {
        Ok(PgConnection::establish(&self.url)?)
    }
}

/// Creates a fresh database and a store over it, with the schema in place.
///
/// # Errors
///
/// Returns an error if database creation, pool construction, or setup
/// fails.
pub fn prepare_queue_db(cluster: PostgresCluster) -> Result<QueueDb, BoxError> {
    init_tracing();
    let db_name = format!("pgq_test_{}", Uuid::new_v4().simple());
    cluster.create_database(&db_name)?;
    let guard = CleanupGuard::new(cluster, db_name.clone());

    let url = cluster.database_url(&db_name);
    let pool = Pool::builder()
        .max_size(4)
        .build(ConnectionManager::<PgConnection>::new(url.as_str()))?;
    let store = Arc::new(PostgresJobStore::new(pool.clone()));
    let rt = test_runtime()?;
    rt.block_on(pgq::job::ports::JobStore::setup(store.as_ref()))?;

    Ok(QueueDb {
        rt,
        store,
        pool,
        url,
        _guard: guard,
    })
}

/// Provides a prepared database on the shared cluster.
///
/// # Panics
///
/// Panics if the cluster cannot host the temporary database.
#[fixture]
pub fn queue_db(postgres_cluster: PostgresCluster) -> QueueDb {
    prepare_queue_db(postgres_cluster).expect("temporary queue database")
}

/// Row from `pg_indexes` used to verify schema bootstrap.
#[derive(diesel::QueryableByName, Debug)]
pub struct IndexRow {
    /// Index name.
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub indexname: String,
}

/// Lists the indexes defined on `table`.
///
/// # Errors
///
/// Returns an error if the catalog query fails.
pub fn table_indexes(conn: &mut PgConnection, table: &str) -> Result<Vec<String>, BoxError> {
    let rows = diesel::sql_query(
        "SELECT indexname::text AS indexname FROM pg_indexes WHERE tablename = $1 ORDER BY 1",
    )
    .bind::<diesel::sql_types::Text, _>(table)
    .load::<IndexRow>(conn)?;
    Ok(rows.into_iter().map(|row| row.indexname).collect())
}

/// Resets a job row to `waiting` the way an operator would.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn reset_to_waiting(conn: &mut PgConnection, id: i64) -> Result<(), BoxError> {
    diesel::sql_query("UPDATE __pgq_jobs SET status = 'waiting' WHERE id = $1")
        .bind::<diesel::sql_types::BigInt, _>(id)
        .execute(conn)?;
    Ok(())
}
