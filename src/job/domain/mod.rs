//! Domain model for the job queue.
//!
//! Jobs move through a small state machine (`waiting` → `running` →
//! `done` | `error`). Adapters persist the state; the domain only decides
//! which transitions are legal.

mod error;
mod ids;
mod job;

pub use error::{JobDomainError, ParseJobStatusError};
pub use ids::JobId;
pub use job::{Job, JobOutcome, JobStatus, PersistedJobData};
