//! Graph persistence and consistency engine.
//!
//! [`GraphEngine`] turns a logical object, edge or counter mutation into a
//! coordinated sequence of operations across the cache, the primary store
//! and distributed locks, enforces unique fields, and announces every
//! committed mutation exactly once through the event emitter.
//!
//! # Components
//!
//! - [`LockManager`]: TTL-bounded locks in the cache with bounded retry
//! - [`TierPolicy`]: where an object type's body lives, from its cache level
//! - [`CounterReconciler`]: counters written through the primary store and
//!   mirrored in the cache
//! - [`EdgeStore`]: ordered adjacency lists kept consistent across tiers
//! - [`UniqueConstraints`]: check-then-reserve against the unique index
//! - [`FieldValidator`]: schema-driven validation of payloads
//! - [`HookRegistry`]: pre/post/read extension points keyed by
//!   `"<METHOD> <objectType>"`
//!
//! # Example
//!
//! ```
//! use graphstore_engine::{Context, CreateOptions, EngineConfig, GraphEngine};
//! use graphstore_model::{FieldDef, GraphObject, ObjectConfig, SchemaRegistry};
//! use graphstore_storage::{MemoryCache, MemoryStore};
//! use graphstore_sync::{EventEmitter, EventQueue, SyncPipeline};
//! use std::sync::Arc;
//!
//! # tokio_test_block_on(async {
//! let registry = SchemaRegistry::builder()
//!     .object(ObjectConfig::new("note", "N1").with_field("text", FieldDef::string()))
//!     .build()
//!     .unwrap();
//! let config = EngineConfig::default();
//! let (queue, worker) = EventQueue::bounded(config.event_queue_capacity);
//! let _worker = worker.spawn();
//! let engine = GraphEngine::new(
//!     config,
//!     Arc::new(registry),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MemoryCache::new()),
//!     EventEmitter::new(Arc::new(SyncPipeline::new()), queue),
//! );
//!
//! let ctx = Context::new();
//! let mut payload = GraphObject::new();
//! payload.insert("text", "hello".into());
//! let note = engine.create(&ctx, "note", payload, CreateOptions::default()).await.unwrap();
//! assert_eq!(note.get_str("text"), Some("hello"));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

mod config;
mod context;
mod counters;
mod edges;
mod engine;
mod error;
mod hooks;
mod lock;
mod policy;
mod unique;
mod validate;

pub use config::EngineConfig;
pub use context::Context;
pub use counters::CounterReconciler;
pub use edges::EdgeStore;
pub use engine::{CreateOptions, DeleteOptions, EdgeList, GraphEngine, UpdateOptions};
pub use error::{EngineError, EngineResult};
pub use hooks::{HookInput, HookRegistry, PostLogic, PreLogic, ReadLogic};
pub use lock::{HolderToken, LockManager};
pub use policy::TierPolicy;
pub use unique::{UniqueConstraints, UniqueMode};
pub use validate::FieldValidator;
