//! pgq: durable multi-type job queue backed by `PostgreSQL`.
//!
//! Producers enqueue typed jobs carrying an opaque text payload; workers
//! claim the oldest waiting job among the types they ask for, run the
//! handler registered for that type, and record the outcome. Claims use
//! `FOR UPDATE SKIP LOCKED`, so any number of workers can share one table
//! without handing the same job to two of them or waiting on each other.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Job lifecycle and state transitions
//! - **Ports**: The job store contract
//! - **Adapters**: `PostgreSQL` and in-memory job stores
//! - **Services**: The queue, which binds handlers and drives claims
//!
//! # Modules
//!
//! - [`job`]: Job queue domain, store port, adapters, and queue service

pub mod job;
