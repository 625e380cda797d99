//! Callback delivery contexts
//!
//! Callbacks of a migration run are never invoked from the worker directly;
//! they are handed to a `DeliveryContext` which runs them in submission
//! order. `SerialDelivery` owns a single consumer task fed by a channel, so
//! callbacks of consecutive runs can never interleave.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Unit of work scheduled on a delivery context
pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait DeliveryContext: Send + Sync + 'static {
    /// Schedule `job`; jobs run one at a time in submission order
    fn dispatch(&self, job: Job);
}

/// Runs every job on one dedicated consumer task
pub struct SerialDelivery {
    sender: mpsc::UnboundedSender<Job>,
}

impl SerialDelivery {
    /// Spawn the consumer on the given runtime
    pub fn spawn(handle: &Handle) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        handle.spawn(async move {
            while let Some(job) = receiver.recv().await {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    warn!("Migration callback panicked");
                }
            }
            debug!("Delivery channel closed");
        });
        Self { sender }
    }
}

impl DeliveryContext for SerialDelivery {
    fn dispatch(&self, job: Job) {
        if self.sender.send(job).is_err() {
            warn!("Delivery context is gone, dropping callback");
        }
    }
}

/// Runs jobs immediately on the dispatching thread
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDelivery;

impl DeliveryContext for InlineDelivery {
    fn dispatch(&self, job: Job) {
        job();
    }
}
