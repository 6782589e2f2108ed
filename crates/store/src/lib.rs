//! Shared key-value/stream store access for the dataops coordination layer.
//!
//! [`KvStore`] is the adapter every primitive talks to. [`RedisStore`] is the
//! production backend; [`MemoryStore`] mirrors its observable semantics in
//! process for tests and local runs. The repositories encode each primitive's
//! consistency discipline on top of the adapter.

pub mod error;
pub mod kv;
pub mod memory;
pub mod redis_store;
pub mod repositories;

use std::sync::Arc;

pub use error::{StoreError, StoreResult};
pub use kv::{KeyKind, KvStore, LogEntry};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Store handle shared across handlers and background tasks.
pub type SharedStore = Arc<dyn KvStore>;

/// Check that the store answers a round trip.
pub async fn health_check(store: &dyn KvStore) -> StoreResult<()> {
    store.ping().await
}
