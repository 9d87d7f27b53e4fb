//! Distributed locks over the shared cache.
//!
//! A lock is the cache key `lock_<key>` holding a random holder token, set
//! only if absent and with a TTL so a crashed holder cannot wedge the key.
//! Exclusivity is therefore best-effort: a holder that stalls past the TTL
//! may find its lock re-acquired by someone else, in which case its release
//! is a no-op.

use crate::{EngineConfig, EngineError, EngineResult};
use graphstore_storage::CacheStore;
use rand::RngCore;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const TOKEN_BYTES: usize = 20;

/// Proof of ownership returned by [`LockManager::acquire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderToken(String);

impl HolderToken {
    fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HolderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Acquires and releases TTL-bounded locks with bounded retry.
#[derive(Clone)]
pub struct LockManager {
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
    obtainer_timeout: Duration,
    interval: Duration,
}

impl LockManager {
    pub fn new(cache: Arc<dyn CacheStore>, config: &EngineConfig) -> Self {
        Self {
            cache,
            ttl: config.lock_ttl(),
            obtainer_timeout: config.lock_obtainer_timeout(),
            interval: config.lock_attempt_interval().max(Duration::from_millis(1)),
        }
    }

    fn cache_key(key: &str) -> String {
        format!("lock_{key}")
    }

    /// Acquires the lock for `key`, retrying every interval until the total
    /// obtainer timeout is spent.
    pub async fn acquire(&self, key: &str) -> EngineResult<HolderToken> {
        let lock_key = Self::cache_key(key);
        let token = HolderToken::generate();
        let mut retries: u32 = 0;
        loop {
            let obtained = self
                .cache
                .set_if_absent(&lock_key, Value::String(token.0.clone()), Some(self.ttl))
                .await?;
            if obtained {
                debug!(key, retries, "lock obtained");
                return Ok(token);
            }

            retries += 1;
            if self.interval * retries >= self.obtainer_timeout {
                warn!(key, retries, "lock not obtained, giving up");
                return Err(EngineError::LockTimeout {
                    key: key.to_string(),
                });
            }
            debug!(key, retries, "lock busy, retrying");
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Frees the lock if `token` still owns it. A missing lock or a lock
    /// owned by another holder is left alone.
    pub async fn release(&self, key: &str, token: &HolderToken) -> EngineResult<()> {
        let lock_key = Self::cache_key(key);
        match self.cache.get(&lock_key).await? {
            None => debug!(key, "lock already free"),
            Some(Value::String(holder)) if holder == token.0 => {
                self.cache.delete(&lock_key).await?;
                debug!(key, "lock freed");
            }
            Some(_) => debug!(key, "lock held by another process, not freeing"),
        }
        Ok(())
    }

    /// Releases the lock, logging instead of propagating a failure. The TTL
    /// reclaims the key if the release did not go through.
    pub(crate) async fn release_quietly(&self, key: &str, token: &HolderToken) {
        if let Err(e) = self.release(key, token).await {
            warn!(key, error = %e, "failed to release lock");
        }
    }
}
