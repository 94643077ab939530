//! SQL statements for a configured job table.
//!
//! Diesel's `table!` schema is fixed at compile time, so statements are
//! rendered once per store from a validated [`TableName`] and executed with
//! `sql_query`.

use super::table::TableName;
use crate::job::domain::JobStatus;

/// Columns returned by every statement that yields a job row.
const JOB_COLUMNS: &str =
    "id, job_type, data, status, error, attempt, created_at, started_at, finished_at";

/// Rendered statements bound to one job table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct JobSql {
    /// Serialised schema bootstrap, run inside a transaction.
    pub setup: String,
    /// Insert returning the new identifier.
    pub insert: String,
    /// Atomic skip-locked claim returning the claimed row.
    pub claim: String,
    /// Terminal status update returning the resolved row.
    pub resolve: String,
    /// Lookup by identifier.
    pub find_by_id: String,
}

impl JobSql {
    /// Renders statements for `table`.
    pub(super) fn for_table(table: &TableName) -> Self {
        let waiting = JobStatus::Waiting.as_str();
        Self {
            // The advisory lock serialises concurrent bootstraps, which would
            // otherwise race on the catalog despite IF NOT EXISTS.
            setup: format!(
                concat!(
                    "SELECT pg_advisory_xact_lock(hashtext('{table}'));\n",
                    "CREATE TABLE IF NOT EXISTS {table} (\n",
                    "    id          BIGSERIAL PRIMARY KEY,\n",
                    "    job_type    TEXT NOT NULL,\n",
                    "    data        TEXT NOT NULL,\n",
                    "    status      TEXT NOT NULL DEFAULT '{waiting}',\n",
                    "    error       TEXT,\n",
                    "    attempt     INTEGER NOT NULL DEFAULT 0,\n",
                    "    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),\n",
                    "    started_at  TIMESTAMPTZ,\n",
                    "    finished_at TIMESTAMPTZ\n",
                    ");\n",
                    "CREATE INDEX IF NOT EXISTS idx_{table}_status ON {table} (status);",
                ),
                table = table,
                waiting = waiting,
            ),
            insert: format!("INSERT INTO {table} (job_type, data) VALUES ($1, $2) RETURNING id"),
            claim: format!(
                concat!(
                    "UPDATE {table} SET ",
                    "status = $1, error = NULL, attempt = attempt + 1, ",
                    "started_at = NOW(), finished_at = NULL ",
                    "WHERE id IN (",
                    "SELECT id FROM {table} AS jobs ",
                    "WHERE jobs.status = $2 AND jobs.job_type = ANY($3) ",
                    "ORDER BY jobs.id ASC ",
                    "FOR UPDATE SKIP LOCKED ",
                    "LIMIT 1",
                    ") RETURNING {columns}",
                ),
                table = table,
                columns = JOB_COLUMNS,
            ),
            resolve: format!(
                concat!(
                    "UPDATE {table} SET ",
                    "status = $1, error = $2, finished_at = clock_timestamp() ",
                    "WHERE id = $3 RETURNING {columns}",
                ),
                table = table,
                columns = JOB_COLUMNS,
            ),
            find_by_id: format!(
                "SELECT {columns} FROM {table} WHERE id = $1",
                columns = JOB_COLUMNS,
            ),
        }
    }
}
