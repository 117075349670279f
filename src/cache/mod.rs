//! Fetch-or-serve-from-cache layer over a durable key-value store.
//!
//! This module provides a resource-agnostic caching mechanism that:
//! - Stores one whole entry (payload + write time) per key
//! - Decides freshness with an explicit `ExpiryPolicy` per resource
//! - Treats unreadable storage and corrupt entries as misses
//! - Never writes on a failed fetch, and never serves stale data in its place

mod error;
mod layer;
mod policy;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use policy::ExpiryPolicy;
pub use storage::{KeyValueStore, NoopStorage, SqliteStorage};
pub use traits::{CacheResult, CacheSource, Clock, SystemClock};

#[cfg(test)]
pub(crate) use storage::MemoryStorage;
