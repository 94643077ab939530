//! Shared test helpers for in-memory job store integration tests.

use mockable::DefaultClock;
use pgq::job::{adapters::memory::InMemoryJobStore, services::Queue};
use rstest::fixture;
use std::sync::Arc;

/// Queue type exercised by the in-memory tests.
pub type TestQueue = Queue<InMemoryJobStore<DefaultClock>>;

/// Provides a fresh in-memory store for each test.
#[fixture]
pub fn store() -> Arc<InMemoryJobStore> {
    Arc::new(InMemoryJobStore::new())
}

/// Provides a queue with `email` and `sms` handlers bound.
///
/// The `email` handler fails for the payload `fail`.
///
/// # Panics
///
/// Panics if handler registration fails.
#[fixture]
pub fn queue(store: Arc<InMemoryJobStore>) -> TestQueue {
    let mut queue = Queue::new(store);
    queue
        .register_handler("email", |job| {
            if job.data() == "fail" {
                return Err("smtp down".into());
            }
            Ok(())
        })
        .expect("register email handler");
    queue
        .register_handler("sms", |_job| Ok(()))
        .expect("register sms handler");
    queue
}
