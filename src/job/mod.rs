//! Durable job queue over a relational table.
//!
//! Jobs are enqueued with [`services::Queue::put`] and executed with
//! [`services::Queue::pop`], which claims the oldest eligible row using a
//! skip-locked read, runs the registered handler, and records the outcome in
//! one transaction. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
