//! Cache store for idoc
//!
//! Memoizes the results of expensive asynchronous lookups under
//! caller-chosen string keys:
//! - synchronous reads of whatever is already cached
//! - fetch-if-absent loading that swallows loader failures
//! - per-key serialization of concurrent loads
//! - hit/miss statistics

pub mod stats;
pub mod store;

pub use stats::CacheStatistics;
pub use store::CacheStore;
