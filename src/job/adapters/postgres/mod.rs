//! `PostgreSQL` adapters for job persistence.

mod models;
mod sql;
mod store;
mod table;

pub use store::{JobPgPool, PostgresJobStore};
pub use table::{DEFAULT_TABLE_NAME, TableName, TableNameError};
