//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while fanning out change events.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The queue has been closed; no worker will receive the event.
    #[error("channel closed")]
    ChannelClosed,

    /// A sync trigger failed.
    #[error("trigger failed: {0}")]
    Trigger(String),

    /// A queue subscriber failed.
    #[error("subscriber failed: {0}")]
    Subscriber(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
