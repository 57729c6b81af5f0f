use crate::config::Config;
use crate::error::Error;
use crate::iter::{Iter, SnapshotIter};
use crate::stats::Diagnostics;
use crate::table::HashTable;
use crate::{AffinityKey, PartitionId, NOT_FOUND};
use parking_lot::RwLock;
use std::sync::Arc;

/// A [`HashTable`] protected by a read-write lock.
///
/// Mutating calls take the write lock for their whole duration, lookups take
/// the read lock, so many readers can query while no put/remove/clear runs.
pub struct SharedTable {
    table: RwLock<HashTable>,
}

impl SharedTable {
    /// Wrap an existing table.
    pub fn new(table: HashTable) -> Self {
        Self {
            table: RwLock::new(table),
        }
    }

    /// Create a new shared table with custom config.
    pub fn with_config(config: Config) -> Result<Self, Error> {
        Ok(Self::new(HashTable::with_config(config)?))
    }

    /// Insert or update a key.
    pub fn put(&self, key: AffinityKey, value: PartitionId) {
        self.table.write().put(key, value);
    }

    /// Look up the partition for `key`.
    pub fn get(&self, key: AffinityKey) -> Option<PartitionId> {
        self.table.read().get(key)
    }

    /// Look up `key`, returning [`NOT_FOUND`] when it is absent.
    pub fn get_or_sentinel(&self, key: AffinityKey) -> PartitionId {
        self.get(key).unwrap_or(NOT_FOUND)
    }

    /// Check if a key exists.
    pub fn contains(&self, key: AffinityKey) -> bool {
        self.table.read().contains(key)
    }

    /// Remove a key, returning whether it was present.
    pub fn remove(&self, key: AffinityKey) -> bool {
        self.table.write().remove(key)
    }

    /// Number of live entries.
    pub fn size(&self) -> usize {
        self.table.read().size()
    }

    /// Check if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }

    /// Number of buckets.
    pub fn capacity(&self) -> usize {
        self.table.read().capacity()
    }

    /// `size / capacity`.
    pub fn load_factor(&self) -> f64 {
        self.table.read().load_factor()
    }

    /// Remove every entry, keeping the capacity.
    pub fn clear(&self) {
        self.table.write().clear();
    }

    /// Get detailed diagnostics about the table.
    pub fn diagnostics(&self) -> Diagnostics {
        self.table.read().diagnostics()
    }

    /// Insert many pairs under a single write lock.
    pub fn put_all<I>(&self, iter: I)
    where
        I: IntoIterator<Item = (AffinityKey, PartitionId)>,
    {
        self.table.write().extend(iter);
    }

    /// Copy all entries out under the read lock and iterate the copy.
    pub fn iter_snapshot(&self) -> SnapshotIter {
        let table = self.table.read();
        SnapshotIter::new(table.iter().collect())
    }

    /// Get a read lock for iteration purposes.
    pub fn read_lock(&self) -> parking_lot::RwLockReadGuard<'_, HashTable> {
        self.table.read()
    }

    /// Unwrap the inner table.
    pub fn into_inner(self) -> HashTable {
        self.table.into_inner()
    }

    /// Stop accepting writes and hand out a lock-free snapshot.
    pub fn freeze(self) -> FrozenTable {
        self.into_inner().freeze()
    }
}

impl Default for SharedTable {
    fn default() -> Self {
        Self::new(HashTable::default())
    }
}

impl From<HashTable> for SharedTable {
    fn from(table: HashTable) -> Self {
        Self::new(table)
    }
}

/// Immutable snapshot of a fully loaded [`HashTable`].
///
/// Cloning is an `Arc` bump. No method can mutate the table, so lookups need
/// no lock and the snapshot can be handed to any number of threads.
#[derive(Clone)]
pub struct FrozenTable {
    table: Arc<HashTable>,
}

impl FrozenTable {
    pub(crate) fn new(table: HashTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// Look up the partition for `key`.
    #[inline]
    pub fn get(&self, key: AffinityKey) -> Option<PartitionId> {
        self.table.get(key)
    }

    /// Look up `key`, returning [`NOT_FOUND`] when it is absent.
    #[inline]
    pub fn get_or_sentinel(&self, key: AffinityKey) -> PartitionId {
        self.table.get_or_sentinel(key)
    }

    /// Check if a key exists.
    #[inline]
    pub fn contains(&self, key: AffinityKey) -> bool {
        self.table.contains(key)
    }

    /// Number of live entries.
    pub fn size(&self) -> usize {
        self.table.size()
    }

    /// Check if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of buckets.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// `size / capacity`.
    pub fn load_factor(&self) -> f64 {
        self.table.load_factor()
    }

    /// Iterate over `(key, value)` pairs in bucket order.
    pub fn iter(&self) -> Iter<'_> {
        self.table.iter()
    }

    /// Get detailed diagnostics about the table.
    pub fn diagnostics(&self) -> Diagnostics {
        self.table.diagnostics()
    }

    /// Recover a mutable table if this is the last handle to it.
    pub fn try_unfreeze(self) -> Result<HashTable, Self> {
        Arc::try_unwrap(self.table).map_err(|table| Self { table })
    }
}

impl std::fmt::Debug for FrozenTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrozenTable")
            .field("size", &self.size())
            .field("capacity", &self.capacity())
            .finish()
    }
}
