//! Outbound change-event plumbing for graphstore.
//!
//! Every committed mutation produces one [`ChangeEvent`] that is handed to
//! two collaborators before the mutation call returns:
//!
//! - **Sync pipeline**: [`SyncProcessor`] runs synchronously with respect to
//!   the mutation. [`SyncPipeline`] looks up a [`Trigger`] by the event's
//!   `"<METHOD> <path>"` route (for example `"POST exam"`) and runs it.
//! - **Queue**: [`EventQueue`] is a bounded, ordered channel. A
//!   [`QueueWorker`] drains it and delivers each event to every registered
//!   [`Subscriber`].
//!
//! [`EventEmitter`] ties the two together. Emission never fails a mutation:
//! errors from either side are logged and dropped.
//!
//! [`ChangeEvent`]: graphstore_types::ChangeEvent

mod emitter;
mod error;
mod pipeline;
mod queue;

pub use emitter::EventEmitter;
pub use error::{SyncError, SyncResult};
pub use pipeline::{SyncPipeline, SyncProcessor, Trigger};
pub use queue::{EventQueue, QueueWorker, Subscriber};
