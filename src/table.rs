use crate::config::{create_hasher, Config, DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_LOAD_FACTOR};
use crate::error::Error;
use crate::hash::KeyHasher;
use crate::iter::Iter;
use crate::shared::FrozenTable;
use crate::stats::{Diagnostics, TableStats};
use crate::{AffinityKey, PartitionId, NOT_FOUND};

/// A node in a bucket chain. Each node exclusively owns the next one.
pub(crate) struct Entry {
    pub(crate) key: AffinityKey,
    pub(crate) value: PartitionId,
    pub(crate) next: Link,
}

pub(crate) type Link = Option<Box<Entry>>;

/// Chained hash table from [`AffinityKey`] to [`PartitionId`].
///
/// Every bucket owns a singly-linked chain. New keys are prepended to their
/// chain; when an insert would push the load factor above the configured
/// threshold, the bucket array is doubled and every node is relinked into it
/// before the insert proceeds.
///
/// The table is single-writer: mutation takes `&mut self`. For concurrent
/// reads after a bulk load, see [`HashTable::freeze`] and
/// [`SharedTable`](crate::SharedTable).
///
/// # Example
///
/// ```rust
/// use affinitymap::HashTable;
///
/// let mut table = HashTable::with_capacity(8)?;
/// table.put(1001, 1);
/// table.put(2002, 50);
///
/// assert_eq!(table.get(2002), Some(50));
/// assert!(table.remove(1001));
/// assert_eq!(table.size(), 1);
/// # Ok::<(), affinitymap::Error>(())
/// ```
pub struct HashTable {
    buckets: Vec<Link>,
    count: usize,
    max_load_factor: f64,
    hasher: KeyHasher,
    resizes: u64,
    failed_resizes: u64,
    /// After a failed resize, growth is not attempted again until `count` reaches this.
    grow_retry_at: usize,
    stats: TableStats,
}

#[cfg(test)]
thread_local! {
    static BUCKET_LIMIT: std::cell::Cell<usize> = const { std::cell::Cell::new(usize::MAX) };
}

/// Cap bucket allocations on the current thread so tests can make a resize fail.
#[cfg(test)]
pub(crate) fn set_bucket_limit(limit: usize) {
    BUCKET_LIMIT.with(|cell| cell.set(limit));
}

#[cfg(test)]
fn exceeds_bucket_limit(capacity: usize) -> bool {
    BUCKET_LIMIT.with(|cell| capacity > cell.get())
}

#[cfg(not(test))]
#[inline(always)]
fn exceeds_bucket_limit(_capacity: usize) -> bool {
    false
}

/// Reserve a bucket array of exactly `capacity` empty chains.
fn alloc_buckets(capacity: usize) -> Result<Vec<Link>, Error> {
    if exceeds_bucket_limit(capacity) {
        return Err(Error::AllocationFailure { buckets: capacity });
    }
    let mut buckets = Vec::new();
    buckets
        .try_reserve_exact(capacity)
        .map_err(|_| Error::AllocationFailure { buckets: capacity })?;
    buckets.resize_with(capacity, || None);
    Ok(buckets)
}

/// Drop a chain node by node instead of recursively through `Box<Entry>`.
fn release_chain(mut link: Link) {
    while let Some(mut node) = link {
        link = node.next.take();
    }
}

impl HashTable {
    /// Create an empty table with `capacity` buckets and default settings.
    ///
    /// Fails with [`Error::InvalidCapacity`] for 0 and with
    /// [`Error::AllocationFailure`] if the bucket array cannot be allocated;
    /// no table is constructed in either case.
    pub fn with_capacity(capacity: usize) -> Result<Self, Error> {
        Self::with_config(Config::new().initial_capacity(capacity)?)
    }

    /// Create an empty table with custom config.
    pub fn with_config(config: Config) -> Result<Self, Error> {
        config.validate()?;
        let buckets = alloc_buckets(config.initial_capacity)?;

        Ok(Self {
            buckets,
            count: 0,
            max_load_factor: config.max_load_factor,
            hasher: create_hasher(config.hash_function),
            resizes: 0,
            failed_resizes: 0,
            grow_retry_at: 0,
            stats: TableStats::new(),
        })
    }

    /// Figure out which bucket this key belongs to at the current capacity.
    #[inline]
    fn bucket_index(&self, key: AffinityKey) -> usize {
        self.hasher.bucket_index(key, self.buckets.len())
    }

    /// Insert `key` or overwrite its value if it is already present.
    ///
    /// Updating an existing key leaves [`size`](Self::size) unchanged. A new
    /// key that would take the load factor above the threshold first doubles
    /// the bucket array. If that allocation fails the table keeps its current
    /// buckets, logs a warning and still inserts; growth is then retried only
    /// once the entry count has doubled.
    pub fn put(&mut self, key: AffinityKey, value: PartitionId) {
        let index = self.bucket_index(key);
        if Self::update_in_chain(&mut self.buckets[index], key, value) {
            self.stats.record_write();
            return;
        }

        if self.needs_growth() {
            let new_capacity = self.capacity().checked_mul(2);
            self.grow_to(new_capacity);
        }

        let index = self.bucket_index(key);
        let head = self.buckets[index].take();
        self.buckets[index] = Some(Box::new(Entry {
            key,
            value,
            next: head,
        }));
        self.count += 1;
        self.stats.record_write();

        debug_assert_eq!(self.find(key), Some(value), "key {key} did not read back");
    }

    fn update_in_chain(mut link: &mut Link, key: AffinityKey, value: PartitionId) -> bool {
        while let Some(node) = link {
            if node.key == key {
                node.value = value;
                return true;
            }
            link = &mut node.next;
        }
        false
    }

    #[inline]
    fn needs_growth(&self) -> bool {
        self.count >= self.grow_retry_at
            && (self.count + 1) as f64 / self.capacity() as f64 > self.max_load_factor
    }

    fn record_failed_resize(&mut self, reason: &str) {
        self.failed_resizes += 1;
        self.grow_retry_at = self.count.saturating_mul(2).max(self.count + 1);
        if self.failed_resizes == 1 {
            log::warn!(
                "{reason}, keeping {} buckets (load factor {:.2})",
                self.capacity(),
                self.load_factor()
            );
        } else {
            log::debug!(
                "{reason}, {} failed resizes so far, next attempt at {} entries",
                self.failed_resizes,
                self.grow_retry_at
            );
        }
    }

    /// Relink every entry into a fresh bucket array of `new_capacity` buckets.
    ///
    /// `None` means the doubled capacity overflowed. Returns whether the table grew.
    fn grow_to(&mut self, new_capacity: Option<usize>) -> bool {
        let old_capacity = self.capacity();
        let new_buckets = match new_capacity.map(alloc_buckets) {
            Some(Ok(buckets)) => buckets,
            Some(Err(e)) => {
                self.record_failed_resize(&format!("resize failed: {e}"));
                return false;
            }
            None => {
                self.record_failed_resize("resize failed: capacity cannot be doubled");
                return false;
            }
        };

        let capacity = new_buckets.len();
        let old_buckets = std::mem::replace(&mut self.buckets, new_buckets);
        for mut link in old_buckets {
            while let Some(mut node) = link {
                link = node.next.take();
                let index = self.hasher.bucket_index(node.key, capacity);
                node.next = self.buckets[index].take();
                self.buckets[index] = Some(node);
            }
        }

        self.resizes += 1;
        self.grow_retry_at = 0;
        log::debug!(
            "resized from {old_capacity} to {capacity} buckets ({} entries)",
            self.count
        );
        true
    }

    /// Look up the partition for `key`.
    pub fn get(&self, key: AffinityKey) -> Option<PartitionId> {
        let value = self.find(key);
        if value.is_some() {
            self.stats.record_read();
        }
        value
    }

    /// Lookup that leaves the read counter alone.
    pub(crate) fn find(&self, key: AffinityKey) -> Option<PartitionId> {
        let mut link = self.buckets[self.bucket_index(key)].as_deref();
        while let Some(entry) = link {
            if entry.key == key {
                return Some(entry.value);
            }
            link = entry.next.as_deref();
        }
        None
    }

    /// Look up `key`, returning [`NOT_FOUND`] when it is absent.
    ///
    /// A stored value equal to [`NOT_FOUND`] is indistinguishable from a miss;
    /// prefer [`get`](Self::get).
    pub fn get_or_sentinel(&self, key: AffinityKey) -> PartitionId {
        self.get(key).unwrap_or(NOT_FOUND)
    }

    /// Check if a key exists.
    pub fn contains(&self, key: AffinityKey) -> bool {
        self.get(key).is_some()
    }

    /// Unlink and free the entry for `key`. Returns whether it was present.
    pub fn remove(&mut self, key: AffinityKey) -> bool {
        let index = self.bucket_index(key);
        let mut link = &mut self.buckets[index];

        loop {
            match link {
                None => return false,
                Some(node) if node.key == key => {
                    *link = node.next.take();
                    self.count -= 1;
                    self.stats.record_remove();
                    return true;
                }
                Some(node) => {
                    link = &mut node.next;
                }
            }
        }
    }

    /// Number of live entries.
    #[inline]
    pub fn size(&self) -> usize {
        self.count
    }

    /// Alias for [`size`](Self::size).
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if the table has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of buckets.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// `size / capacity`.
    #[inline]
    pub fn load_factor(&self) -> f64 {
        self.count as f64 / self.capacity() as f64
    }

    /// The configured growth threshold.
    #[inline]
    pub fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    /// Free every entry but keep the bucket array and its capacity.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            release_chain(bucket.take());
        }
        self.count = 0;
        self.grow_retry_at = 0;
    }

    /// Free every entry and the bucket array. The table cannot be used afterwards.
    pub fn destroy(self) {
        drop(self);
    }

    /// Iterate over `(key, value)` pairs in bucket order.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(&self.buckets, self.count)
    }

    /// Turn the table into an immutable snapshot that can be shared across threads.
    pub fn freeze(self) -> FrozenTable {
        FrozenTable::new(self)
    }

    /// Chain-length distribution, resize history and operation counts.
    pub fn diagnostics(&self) -> Diagnostics {
        let mut empty_buckets = 0;
        let mut longest_chain = 0;

        for bucket in &self.buckets {
            let mut len = 0;
            let mut link = bucket.as_deref();
            while let Some(entry) = link {
                len += 1;
                link = entry.next.as_deref();
            }
            if len == 0 {
                empty_buckets += 1;
            }
            longest_chain = longest_chain.max(len);
        }

        let used = self.capacity() - empty_buckets;
        let avg_chain_len = if used == 0 {
            0.0
        } else {
            self.count as f64 / used as f64
        };

        Diagnostics {
            entries: self.count,
            capacity: self.capacity(),
            load_factor: self.load_factor(),
            empty_buckets,
            longest_chain,
            avg_chain_len,
            resizes: self.resizes,
            failed_resizes: self.failed_resizes,
            operations: self.stats.snapshot(),
        }
    }
}

impl Default for HashTable {
    fn default() -> Self {
        let mut buckets = Vec::with_capacity(DEFAULT_INITIAL_CAPACITY);
        buckets.resize_with(DEFAULT_INITIAL_CAPACITY, || None);

        Self {
            buckets,
            count: 0,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            hasher: KeyHasher::default(),
            resizes: 0,
            failed_resizes: 0,
            grow_retry_at: 0,
            stats: TableStats::new(),
        }
    }
}

impl Drop for HashTable {
    fn drop(&mut self) {
        for bucket in &mut self.buckets {
            release_chain(bucket.take());
        }
    }
}

impl std::fmt::Debug for HashTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl Extend<(AffinityKey, PartitionId)> for HashTable {
    fn extend<I: IntoIterator<Item = (AffinityKey, PartitionId)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl FromIterator<(AffinityKey, PartitionId)> for HashTable {
    fn from_iter<I: IntoIterator<Item = (AffinityKey, PartitionId)>>(iter: I) -> Self {
        let mut table = HashTable::default();
        table.extend(iter);
        table
    }
}

impl<'a> IntoIterator for &'a HashTable {
    type Item = (AffinityKey, PartitionId);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn chain_keys(table: &HashTable, index: usize) -> Vec<AffinityKey> {
        let mut keys = Vec::new();
        let mut link = table.buckets[index].as_deref();
        while let Some(entry) = link {
            keys.push(entry.key);
            link = entry.next.as_deref();
        }
        keys
    }

    #[test]
    fn test_create_rejects_zero() {
        assert!(matches!(
            HashTable::with_capacity(0),
            Err(Error::InvalidCapacity)
        ));
    }

    #[test]
    fn test_create_reports_allocation_failure() {
        assert!(matches!(
            HashTable::with_capacity(usize::MAX),
            Err(Error::AllocationFailure { buckets: usize::MAX })
        ));
    }

    #[test]
    fn test_new_keys_are_prepended() {
        // Capacity 1 forces a single chain; a huge threshold prevents growth.
        let mut table = HashTable::with_config(
            Config::new()
                .initial_capacity(1)
                .unwrap()
                .max_load_factor(100.0)
                .unwrap(),
        )
        .unwrap();

        table.put(1, 10);
        table.put(2, 20);
        table.put(3, 30);
        assert_eq!(chain_keys(&table, 0), vec![3, 2, 1]);

        // Update in place keeps the position.
        table.put(2, 21);
        assert_eq!(chain_keys(&table, 0), vec![3, 2, 1]);
        assert_eq!(table.get(2), Some(21));
    }

    #[test]
    fn test_remove_head_middle_tail() {
        let mut table = HashTable::with_config(
            Config::new()
                .initial_capacity(1)
                .unwrap()
                .max_load_factor(100.0)
                .unwrap(),
        )
        .unwrap();
        for key in 1..=5 {
            table.put(key, key as PartitionId);
        }

        assert!(table.remove(5)); // head
        assert_eq!(chain_keys(&table, 0), vec![4, 3, 2, 1]);
        assert!(table.remove(3)); // middle
        assert_eq!(chain_keys(&table, 0), vec![4, 2, 1]);
        assert!(table.remove(1)); // tail
        assert_eq!(chain_keys(&table, 0), vec![4, 2]);
        assert!(!table.remove(1));
        assert_eq!(table.size(), 2);
    }

    #[test]
    fn test_growth_happens_before_threshold_is_crossed() {
        let mut table = HashTable::with_capacity(8).unwrap();
        for key in 0..6 {
            table.put(key, 0);
        }
        assert_eq!(table.capacity(), 8);
        assert_eq!(table.load_factor(), 0.75);

        table.put(6, 0);
        assert_eq!(table.capacity(), 16);
        assert!(table.load_factor() <= 0.75);
        assert_eq!(table.diagnostics().resizes, 1);
    }

    #[test]
    fn test_update_never_grows() {
        let mut table = HashTable::with_capacity(4).unwrap();
        for key in 0..3 {
            table.put(key, 1);
        }
        assert_eq!(table.capacity(), 4);
        for _ in 0..10 {
            table.put(0, 2);
        }
        assert_eq!(table.capacity(), 4);
        assert_eq!(table.size(), 3);
    }

    #[test]
    fn test_failed_grow_keeps_table_usable() {
        let mut table = HashTable::with_capacity(4).unwrap();
        for key in 0..3 {
            table.put(key, key as PartitionId);
        }

        assert!(!table.grow_to(Some(usize::MAX)));
        assert!(!table.grow_to(None));
        assert_eq!(table.capacity(), 4);

        let diagnostics = table.diagnostics();
        assert_eq!(diagnostics.failed_resizes, 2);
        assert_eq!(diagnostics.resizes, 0);
        for key in 0..3 {
            assert_eq!(table.get(key), Some(key as PartitionId));
        }
    }

    #[test]
    fn test_put_through_failed_resize_still_inserts() {
        set_bucket_limit(4);
        let mut table = HashTable::with_capacity(4).unwrap();
        for key in 0..3 {
            table.put(key, key as PartitionId);
        }
        assert_eq!(table.diagnostics().failed_resizes, 0);

        // The fourth key would take the load factor to 1.0
        table.put(3, 3);
        assert_eq!(table.size(), 4);
        assert_eq!(table.capacity(), 4);
        assert!(table.load_factor() > DEFAULT_MAX_LOAD_FACTOR);
        assert_eq!(table.get(3), Some(3));

        let diagnostics = table.diagnostics();
        assert_eq!(diagnostics.failed_resizes, 1);
        assert_eq!(diagnostics.resizes, 0);
        for key in 0..4 {
            assert_eq!(table.get(key), Some(key as PartitionId));
        }
    }

    #[test]
    fn test_failed_resize_backs_off() {
        set_bucket_limit(4);
        let mut table = HashTable::with_capacity(4).unwrap();

        // Fails at 3 entries, then not again until 6
        for key in 0..6 {
            table.put(key, 0);
        }
        assert_eq!(table.diagnostics().failed_resizes, 1);
        table.put(6, 0);
        assert_eq!(table.diagnostics().failed_resizes, 2);

        // Updates never attempt a resize
        for key in 0..7 {
            table.put(key, 1);
        }
        assert_eq!(table.diagnostics().failed_resizes, 2);

        set_bucket_limit(usize::MAX);
        for key in 7..41 {
            table.put(key, 1);
        }
        let diagnostics = table.diagnostics();
        assert_eq!(diagnostics.failed_resizes, 2);
        assert!(diagnostics.resizes >= 4);
        assert_eq!(table.size(), 41);
        assert!(table.load_factor() <= DEFAULT_MAX_LOAD_FACTOR);
        for key in 0..41 {
            assert_eq!(table.get(key), Some(1));
        }
    }

    #[test]
    fn test_grow_relinks_every_entry() {
        let mut table = HashTable::with_capacity(4).unwrap();
        for key in 0..3 {
            table.put(key * 1000, 7);
        }
        assert!(table.grow_to(Some(64)));
        assert_eq!(table.capacity(), 64);
        assert_eq!(table.size(), 3);

        let mut keys: Vec<_> = table.iter().map(|(k, _)| k).collect();
        keys.sort();
        assert_eq!(keys, vec![0, 1000, 2000]);
        for index in 0..64 {
            for key in chain_keys(&table, index) {
                assert_eq!(table.hasher.bucket_index(key, 64), index);
            }
        }
    }

    #[test]
    fn test_sentinel_shim() {
        let mut table = HashTable::default();
        table.put(1, 3);
        assert_eq!(table.get_or_sentinel(1), 3);
        assert_eq!(table.get_or_sentinel(2), NOT_FOUND);
    }

    #[test]
    fn test_clear_preserves_capacity() {
        let mut table = HashTable::with_capacity(8).unwrap();
        table.extend((0..20).map(|k| (k, 1)));
        let capacity = table.capacity();

        table.clear();
        assert_eq!(table.size(), 0);
        assert!(table.is_empty());
        assert_eq!(table.capacity(), capacity);
        assert_eq!(table.iter().count(), 0);

        table.put(5, 5);
        assert_eq!(table.get(5), Some(5));
    }

    #[test]
    fn test_long_chain_drops_without_recursion() {
        let mut table = HashTable::with_config(
            Config::new()
                .initial_capacity(1)
                .unwrap()
                .max_load_factor(f64::MAX)
                .unwrap(),
        )
        .unwrap();
        table.extend((0..20_000).map(|k| (k, 0)));
        assert_eq!(table.diagnostics().longest_chain, 20_000);
        table.destroy();
    }

    #[test]
    fn test_diagnostics() {
        let table: HashTable = (0..12).map(|k| (k, 1)).collect();
        let diagnostics = table.diagnostics();

        assert_eq!(diagnostics.entries, 12);
        assert_eq!(diagnostics.capacity, 16);
        assert_eq!(diagnostics.load_factor, 0.75);
        assert!(diagnostics.longest_chain >= 1);
        assert!(diagnostics.empty_buckets >= 4);
        assert!(diagnostics.avg_chain_len >= 1.0);
        assert!(diagnostics.chain_skew() >= 1.0);
    }

    #[test]
    fn test_debug_lists_entries() {
        let mut table = HashTable::default();
        table.put(7, 2);
        assert_eq!(format!("{table:?}"), "{7: 2}");
    }
}
