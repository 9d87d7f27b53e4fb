//! Storage tiers for graphstore.
//!
//! Provides the two tiers the engine keeps consistent:
//!
//! - [`PrimaryStore`]: the durable source of truth for object bodies,
//!   counters, the unique index and the edge set (with its reverse index).
//! - [`CacheStore`]: a fast shared key/value + list cache used for cached
//!   bodies, counter mirrors, ordered adjacency lists and distributed locks.
//!
//! # Implementations
//!
//! - [`SqliteStore`]: SQLite-backed primary store (file or in-memory)
//! - [`MemoryStore`]: in-process primary store with write accounting and
//!   failure injection, used by tests
//! - [`MemoryCache`]: in-process cache with TTLs, set-if-absent and lists

mod cache;
mod error;
mod memory;
mod primary;
mod sqlite;

pub use cache::{CacheStore, MemoryCache};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use primary::{ObjectPage, PrimaryStore};
pub use sqlite::SqliteStore;
