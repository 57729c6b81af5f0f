//! # AffinityMap
//!
//! A fast in-memory map from 64-bit integer keys to partition ids.
//!
//! The core is a chained hash table: each bucket owns a singly-linked chain
//! of entries, new keys go to the head of their chain, and the bucket array
//! doubles before any insert that would push the load factor above 0.75.
//! Around it sits a [`PartitionMap`] that bulk-loads a tab-separated data
//! file once and answers partition queries afterwards.
//!
//! ## Features
//!
//! - **Upsert semantics**: putting an existing key overwrites it in place
//! - **Automatic growth**: capacity doubles, entries are relinked, never copied
//! - **Graceful degradation**: a resize that cannot allocate is skipped with a warning
//! - **Explicit misses**: lookups return `Option`, with a sentinel shim for legacy callers
//! - **Read sharing**: freeze a loaded table or wrap it in a read-write lock
//! - **Diagnostics**: chain-length distribution, resize history, operation counts
//!
//! ## Example
//!
//! ```rust
//! use affinitymap::HashTable;
//!
//! let mut table = HashTable::with_capacity(8)?;
//!
//! table.put(1001, 1);
//! table.put(2002, 50);
//! table.put(99_999_999_999, 127);
//! assert_eq!(table.size(), 3);
//! assert_eq!(table.get(2002), Some(50));
//!
//! // Crossing the 0.75 load factor doubles the bucket array.
//! for i in 0..10 {
//!     table.put(i * 1000, (i % 4) as u32);
//! }
//! assert!(table.capacity() >= 16);
//! assert_eq!(table.get(99_999_999_999), Some(127));
//!
//! assert!(table.remove(2002));
//! assert!(!table.contains(2002));
//!
//! table.clear();
//! assert!(table.is_empty());
//! # Ok::<(), affinitymap::Error>(())
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use affinitymap::{HashTableBuilder, HashFunction};
//!
//! let table = HashTableBuilder::new()
//!     .initial_capacity(1024)?
//!     .max_load_factor(0.5)?
//!     .hash_function(HashFunction::AHash)
//!     .build()?;
//! # Ok::<(), affinitymap::Error>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

/// Configuration and builder types.
pub mod config;
/// Error types.
pub mod error;
/// Hash function implementations.
pub mod hash;
/// Iterator implementations.
pub mod iter;
pub mod loader;
/// Loaded key -> partition assignment.
pub mod partition_map;
/// Lock-protected and frozen read-sharing wrappers.
pub mod shared;
/// Statistics and diagnostics collection.
pub mod stats;
/// Chained hash table core.
pub mod table;

/// Key type: signed 64-bit integer.
pub type AffinityKey = i64;

/// Value type: unsigned 32-bit partition id.
pub type PartitionId = u32;

/// Returned by the sentinel-style lookups when a key is absent.
///
/// It is also a valid [`PartitionId`], so a stored `NOT_FOUND` reads as a miss.
pub const NOT_FOUND: PartitionId = PartitionId::MAX;

// Re-export main types
pub use config::{Config, HashFunction, HashTableBuilder};
pub use error::{Error, Result};
pub use partition_map::{LoadSummary, PartitionMap};
pub use shared::{FrozenTable, SharedTable};
pub use stats::{Diagnostics, Operations};
pub use table::HashTable;
