//! Offline cache: named, versioned buckets of response snapshots.
//!
//! This module provides:
//! - Bucket storage keyed by request URL (SQLite or in-memory)
//! - The cache-first fetch path with network fallback and offline pages
//! - Generation-based eviction: only the current bucket survives activation

mod layer;
pub mod policy;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, SqliteStorage};

#[cfg(test)]
pub use storage::MemoryStorage;
pub use traits::{FetchResult, ResponseSource};

#[cfg(test)]
pub(crate) use layer::tests::{basic, FakeNetwork};
