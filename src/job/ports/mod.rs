//! Port contracts for the job queue.
//!
//! Ports define infrastructure-agnostic interfaces used by the queue service.

pub mod store;

pub use store::{Dispatch, JobStore, JobStoreError, JobStoreResult};
