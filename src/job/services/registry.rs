//! Process-local handler registry.

use super::queue::{QueueError, QueueResult};
use crate::job::{
    domain::{Job, JobOutcome},
    ports::Dispatch,
};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

/// Error type returned by job handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by job handlers.
pub type HandlerResult = Result<(), HandlerError>;

type Handler = Arc<dyn Fn(Job) -> HandlerResult + Send + Sync>;

/// Mapping from job type to the handler that executes it.
///
/// Bindings are never persisted and live as long as the registry.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to `job_type`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::DuplicateHandler`] when the type is already
    /// bound; the existing binding stays in place.
    pub fn register<F>(&mut self, job_type: impl Into<String>, handler: F) -> QueueResult<()>
    where
        F: Fn(Job) -> HandlerResult + Send + Sync + 'static,
    {
        match self.handlers.entry(job_type.into()) {
            Entry::Occupied(entry) => Err(QueueError::DuplicateHandler(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(handler));
                Ok(())
            }
        }
    }

    /// Returns `true` when a handler is bound to `job_type`.
    #[must_use]
    pub fn contains(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Returns the bound job types in lexical order.
    #[must_use]
    pub fn job_types(&self) -> Vec<&str> {
        let mut job_types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        job_types.sort_unstable();
        job_types
    }

    /// Snapshots the handlers for `job_types`, failing if any is unbound.
    pub(super) fn select(&self, job_types: &[String]) -> QueueResult<HandlerSet> {
        let mut handlers = HashMap::with_capacity(job_types.len());
        for job_type in job_types {
            let handler = self
                .handlers
                .get(job_type)
                .ok_or_else(|| QueueError::MissingHandler(job_type.clone()))?;
            handlers.insert(job_type.clone(), Arc::clone(handler));
        }
        Ok(HandlerSet { handlers })
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("job_types", &self.job_types())
            .finish()
    }
}

/// Handlers selected for a single claim.
pub(super) struct HandlerSet {
    handlers: HashMap<String, Handler>,
}

impl HandlerSet {
    /// Converts the selection into a store dispatch callback.
    pub(super) fn into_dispatch(self) -> Dispatch {
        Box::new(move |job: Job| {
            let Some(handler) = self.handlers.get(job.job_type()).cloned() else {
                let missing = QueueError::MissingHandler(job.job_type().to_owned());
                return JobOutcome::Failed(missing.to_string());
            };
            JobOutcome::from_result(handler(job))
        })
    }
}
