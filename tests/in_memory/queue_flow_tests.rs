//! Enqueue, claim, and resolve flows for [`InMemoryJobStore`].

use crate::in_memory::helpers::{TestQueue, queue, store};
use pgq::job::adapters::memory::InMemoryJobStore;
use pgq::job::domain::{JobId, JobStatus};
use pgq::job::services::QueueError;
use rstest::rstest;
use std::sync::Arc;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn put_assigns_increasing_identifiers(queue: TestQueue) -> eyre::Result<()> {
    let first = queue.put("email", "one").await?;
    let second = queue.put("sms", "two").await?;

    eyre::ensure!(first < second, "identifiers must increase");
    let stored = queue
        .find_job(first)
        .await?
        .ok_or_else(|| eyre::eyre!("job {first} missing"))?;
    eyre::ensure!(stored.status() == JobStatus::Waiting, "new job must wait");
    eyre::ensure!(stored.attempt() == 0, "new job has no attempts");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn successful_handler_marks_job_done(queue: TestQueue) -> eyre::Result<()> {
    let id = queue.put("email", "hi").await?;

    let popped = queue
        .pop(&["email"])
        .await?
        .ok_or_else(|| eyre::eyre!("expected a claimed job"))?;

    assert_eq!(popped.id(), id);
    assert_eq!(popped.status(), JobStatus::Done);
    assert_eq!(popped.attempt(), 1);
    assert_eq!(popped.error(), None);
    assert!(popped.started_at().is_some());
    assert!(popped.finished_at() >= popped.started_at());
    assert_eq!(queue.find_job(id).await?, Some(popped));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failing_handler_records_error(queue: TestQueue) -> eyre::Result<()> {
    queue.put("email", "fail").await?;

    let popped = queue
        .pop(&["email"])
        .await?
        .ok_or_else(|| eyre::eyre!("expected a claimed job"))?;

    assert_eq!(popped.status(), JobStatus::Error);
    assert_eq!(popped.error(), Some("smtp down"));
    assert!(queue.pop(&["email"]).await?.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn pop_ignores_types_not_requested(queue: TestQueue) -> eyre::Result<()> {
    let sms = queue.put("sms", "later").await?;

    assert!(queue.pop(&["email"]).await?.is_none());

    let untouched = queue
        .find_job(sms)
        .await?
        .ok_or_else(|| eyre::eyre!("sms job missing"))?;
    assert_eq!(untouched.status(), JobStatus::Waiting);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn oldest_job_is_claimed_first_across_types(queue: TestQueue) -> eyre::Result<()> {
    let first = queue.put("email", "one").await?;
    let second = queue.put("sms", "two").await?;
    let third = queue.put("email", "three").await?;

    let mut claimed = Vec::new();
    while let Some(job) = queue.pop(&["sms", "email"]).await? {
        claimed.push(job.id());
    }

    assert_eq!(claimed, vec![first, second, third]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn queues_sharing_a_store_share_the_backlog(
    store: Arc<InMemoryJobStore>,
) -> eyre::Result<()> {
    let mut producer = pgq::job::services::Queue::new(Arc::clone(&store));
    producer.register_handler("email", |_job| Ok(()))?;
    let mut consumer = pgq::job::services::Queue::new(Arc::clone(&store));
    consumer.register_handler("email", |_job| Err("consumer ran".into()))?;

    let id = producer.put("email", "hi").await?;
    let popped = consumer
        .pop(&["email"])
        .await?
        .ok_or_else(|| eyre::eyre!("consumer must see the producer's job"))?;

    assert_eq!(popped.id(), id);
    assert_eq!(popped.error(), Some("consumer ran"));
    assert_eq!(store.snapshot()?.len(), 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unbound_types_are_rejected_without_side_effects(
    store: Arc<InMemoryJobStore>,
) -> eyre::Result<()> {
    let queue = pgq::job::services::Queue::new(Arc::clone(&store));

    let put = queue.put("email", "hi").await;
    let pop = queue.pop(&["email"]).await;

    assert!(matches!(put, Err(QueueError::MissingHandler(_))));
    assert!(matches!(pop, Err(QueueError::MissingHandler(_))));
    assert!(store.snapshot()?.is_empty());
    assert!(queue.find_job(JobId::new(1)).await?.is_none());
    Ok(())
}
