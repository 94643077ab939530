//! Queue orchestration services.

mod queue;
mod registry;

pub use queue::{Queue, QueueError, QueueResult};
pub use registry::{HandlerError, HandlerRegistry, HandlerResult};
