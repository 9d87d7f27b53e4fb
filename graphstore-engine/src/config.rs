use crate::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// TTL of a lock key in the cache (ms).
    pub lock_ttl_ms: u64,
    /// Total time a caller waits for a lock before giving up (ms).
    pub lock_obtainer_timeout_ms: u64,
    /// Pause between lock attempts (ms).
    pub lock_attempt_interval_ms: u64,
    /// Maximum number of change events waiting for the queue worker.
    pub event_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_ttl_ms: 10_000,
            lock_obtainer_timeout_ms: 5_000,
            lock_attempt_interval_ms: 100,
            event_queue_capacity: 1_024,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON document; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_millis(self.lock_ttl_ms)
    }

    pub fn lock_obtainer_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_obtainer_timeout_ms)
    }

    pub fn lock_attempt_interval(&self) -> Duration {
        Duration::from_millis(self.lock_attempt_interval_ms)
    }
}
