//! Storage layer for invoscope
//!
//! This crate implements the in-memory trace buffer:
//! - TraceBuffer: DashMap of per-platform shards, each behind a RwLock
//! - PlatformShard: id-ordered record arena plus id-only secondary indices
//!   (method, trace, business transaction, application, timestamp)
//! - Oldest-first eviction at a per-platform capacity
//! - Copy-on-write updates of non-indexed fields

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod shard;

pub use buffer::{TraceBuffer, DEFAULT_CAPACITY_PER_PLATFORM};
pub use shard::{PlatformShard, SharedInvocation};
