//! # Repository Module
//!
//! Authoritative store contract, an in-memory reference store, and the
//! cached service wrapper.

pub mod cached;
pub mod memory;
pub mod traits;

pub use cached::{CacheAdmin, CacheHealth, CacheLayer, CachedRepository};
pub use memory::{MemoryRecord, MemoryRepository};
pub use traits::{EntityId, Repository};
