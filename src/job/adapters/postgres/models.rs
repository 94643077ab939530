//! Diesel row models for job persistence.

use chrono::{DateTime, Utc};
use diesel::QueryableByName;
use diesel::sql_types::{BigInt, Integer, Nullable, Text, Timestamptz};

/// Query result row for job records.
#[derive(Debug, Clone, QueryableByName)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JobRow {
    /// Job identifier.
    #[diesel(sql_type = BigInt)]
    pub id: i64,
    /// Job type label.
    #[diesel(sql_type = Text)]
    pub job_type: String,
    /// Opaque payload.
    #[diesel(sql_type = Text)]
    pub data: String,
    /// Lifecycle status.
    #[diesel(sql_type = Text)]
    pub status: String,
    /// Handler error message.
    #[diesel(sql_type = Nullable<Text>)]
    pub error: Option<String>,
    /// Claim counter.
    #[diesel(sql_type = Integer)]
    pub attempt: i32,
    /// Insertion timestamp.
    #[diesel(sql_type = Timestamptz)]
    pub created_at: DateTime<Utc>,
    /// Latest claim timestamp.
    #[diesel(sql_type = Nullable<Timestamptz>)]
    pub started_at: Option<DateTime<Utc>>,
    /// Latest terminal transition timestamp.
    #[diesel(sql_type = Nullable<Timestamptz>)]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Identifier returned by the insert statement.
#[derive(Debug, Clone, Copy, QueryableByName)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InsertedJobId {
    /// Identifier assigned by the sequence.
    #[diesel(sql_type = BigInt)]
    pub id: i64,
}
