//! # Strategy Module
//!
//! How reads and writes interact with the cache.
//!
//! ## Read Strategies
//! - `CacheFirst` - Check cache, fall back to the repository on miss (default)
//! - `DbOnly` - Skip cache entirely
//!
//! ## Write Side
//! Writes always commit to the repository first. The
//! [`InvalidationCoordinator`] then reconciles `single`, `page` and
//! `filtered` entries according to an [`InvalidationPolicy`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use kennel_persistence::strategy::{InvalidationPolicy, Mutation, ReadStrategy};
//!
//! let dog = reader
//!     .get_or_load(&keys.single::<Dog>(&id), || repo.fetch_by_id(&id))
//!     .await?;
//!
//! coordinator
//!     .apply(Mutation::Updated(&dog), &InvalidationPolicy::default())
//!     .await;
//! ```

pub mod read_strategy;
pub mod write_strategy;

pub use read_strategy::{Fetched, ReadSource, ReadStrategy, ReadThroughCache};
pub use write_strategy::{
    InvalidationCoordinator, InvalidationPolicy, InvalidationReport, Mutation, PageDeletePolicy,
    SingleUpdatePolicy,
};
