use crate::table::{Entry, Link};
use crate::{AffinityKey, PartitionId};

/// Borrowing iterator over a table's entries.
///
/// Walks the buckets in index order and each chain from its head. The order
/// is unrelated to insertion order and changes whenever the table resizes.
pub struct Iter<'a> {
    buckets: std::slice::Iter<'a, Link>,
    chain: Option<&'a Entry>,
    remaining: usize,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(buckets: &'a [Link], len: usize) -> Self {
        Self {
            buckets: buckets.iter(),
            chain: None,
            remaining: len,
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = (AffinityKey, PartitionId);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.chain {
                self.chain = entry.next.as_deref();
                self.remaining -= 1;
                return Some((entry.key, entry.value));
            }
            self.chain = self.buckets.next()?.as_deref();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl std::iter::FusedIterator for Iter<'_> {}

/// Snapshot-based iterator that owns a copy of every entry.
///
/// Collected while a lock is held, then iterated without it. It won't see
/// modifications made after the snapshot is taken.
pub struct SnapshotIter {
    entries: std::vec::IntoIter<(AffinityKey, PartitionId)>,
}

impl SnapshotIter {
    pub(crate) fn new(entries: Vec<(AffinityKey, PartitionId)>) -> Self {
        Self {
            entries: entries.into_iter(),
        }
    }
}

impl Iterator for SnapshotIter {
    type Item = (AffinityKey, PartitionId);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for SnapshotIter {}
