use crate::{EventQueue, SyncProcessor};
use graphstore_types::ChangeEvent;
use std::sync::Arc;
use tracing::warn;

/// Fans a committed mutation's event out to the sync pipeline, then the queue.
///
/// Failures are logged and ignored: by the time an event exists the storage
/// tiers are already written.
#[derive(Clone)]
pub struct EventEmitter {
    sync: Arc<dyn SyncProcessor>,
    queue: EventQueue,
}

impl EventEmitter {
    pub fn new(sync: Arc<dyn SyncProcessor>, queue: EventQueue) -> Self {
        Self { sync, queue }
    }

    pub async fn emit(&self, event: ChangeEvent) {
        if let Err(e) = self.sync.process_event(&event).await {
            warn!(
                event_id = %event.id,
                route = %event.route(),
                error = %e,
                "sync processing failed"
            );
        }
        let (event_id, route) = (event.id, event.route());
        if let Err(e) = self.queue.send(event).await {
            warn!(%event_id, %route, error = %e, "failed to enqueue change event");
        }
    }

    /// Closes the queue; pending events are still delivered.
    pub fn close(&self) {
        self.queue.close();
    }
}
