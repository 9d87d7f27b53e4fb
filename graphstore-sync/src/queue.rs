//! Bounded, ordered outbound queue.

use crate::{SyncError, SyncResult};
use async_trait::async_trait;
use graphstore_types::ChangeEvent;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// An asynchronous consumer of queued events.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn on_event(&self, event: &ChangeEvent) -> SyncResult<()>;
}

/// Sending half of the queue. Cheap to clone; all clones share one channel.
#[derive(Clone)]
pub struct EventQueue {
    tx: Arc<Mutex<Option<mpsc::Sender<ChangeEvent>>>>,
}

impl EventQueue {
    /// Creates a queue holding at most `capacity` undelivered events, and the
    /// worker that drains it.
    pub fn bounded(capacity: usize) -> (Self, QueueWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let queue = Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        };
        let worker = QueueWorker {
            rx,
            subscribers: Vec::new(),
        };
        (queue, worker)
    }

    /// Enqueues an event, waiting for capacity when the queue is full.
    pub async fn send(&self, event: ChangeEvent) -> SyncResult<()> {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(SyncError::ChannelClosed)?;
        tx.send(event).await.map_err(|_| SyncError::ChannelClosed)
    }

    /// Stops accepting events. The worker finishes what is already queued.
    pub fn close(&self) {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_closed(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_none_or(mpsc::Sender::is_closed)
    }
}

/// Receiving half of the queue. Delivers events in order to every subscriber.
pub struct QueueWorker {
    rx: mpsc::Receiver<ChangeEvent>,
    subscribers: Vec<Arc<dyn Subscriber>>,
}

impl QueueWorker {
    #[must_use]
    pub fn subscribe(mut self, subscriber: Arc<dyn Subscriber>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Drains the queue until it is closed. Returns the number of events
    /// delivered.
    pub async fn run(mut self) -> u64 {
        let mut delivered = 0;
        while let Some(event) = self.rx.recv().await {
            for subscriber in &self.subscribers {
                if let Err(e) = subscriber.on_event(&event).await {
                    warn!(
                        subscriber = subscriber.name(),
                        event_id = %event.id,
                        route = %event.route(),
                        error = %e,
                        "subscriber failed"
                    );
                }
            }
            delivered += 1;
        }
        debug!(delivered, "event queue drained");
        delivered
    }

    /// Runs the worker on the current runtime.
    pub fn spawn(self) -> JoinHandle<u64> {
        tokio::spawn(self.run())
    }
}
