//! Statistics and diagnostics types.

#[cfg(feature = "metrics")]
use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counts for a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Operations {
    /// Number of lookups that found their key.
    pub reads: u64,
    /// Number of puts (inserts and in-place updates).
    pub writes: u64,
    /// Number of removes that found their key.
    pub removes: u64,
}

impl Operations {
    /// Sum of all counted operations.
    pub fn total(&self) -> u64 {
        self.reads + self.writes + self.removes
    }
}

/// Operation counters for a single table.
///
/// Lookups take `&self` and frozen tables are shared across threads, hence atomics.
#[cfg(feature = "metrics")]
pub(crate) struct TableStats {
    reads: AtomicU64,
    writes: AtomicU64,
    removes: AtomicU64,
}

#[cfg(feature = "metrics")]
impl TableStats {
    pub fn new() -> Self {
        Self {
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            removes: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Operations {
        Operations {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
        }
    }
}

#[cfg(feature = "metrics")]
impl Default for TableStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Zero-sized placeholder when metrics are disabled.
#[cfg(not(feature = "metrics"))]
pub(crate) struct TableStats;

#[cfg(not(feature = "metrics"))]
impl TableStats {
    pub fn new() -> Self {
        TableStats
    }

    #[inline]
    pub fn record_read(&self) {}

    #[inline]
    pub fn record_write(&self) {}

    #[inline]
    pub fn record_remove(&self) {}

    pub fn snapshot(&self) -> Operations {
        Operations::default()
    }
}

#[cfg(not(feature = "metrics"))]
impl Default for TableStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Structured snapshot for load and distribution introspection.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    /// Number of live entries.
    pub entries: usize,
    /// Number of buckets.
    pub capacity: usize,
    /// `entries / capacity`.
    pub load_factor: f64,
    /// Buckets whose chain is empty.
    pub empty_buckets: usize,
    /// Length of the longest chain.
    pub longest_chain: usize,
    /// Average chain length over non-empty buckets (0 for an empty table).
    pub avg_chain_len: f64,
    /// Completed capacity doublings.
    pub resizes: u64,
    /// Doublings skipped because the new bucket array could not be allocated.
    pub failed_resizes: u64,
    /// Operation counts (all 0 when the `metrics` feature is disabled).
    pub operations: Operations,
}

impl Diagnostics {
    /// Longest chain / average non-empty chain. User interprets (e.g. 4.0 for clustering).
    pub fn chain_skew(&self) -> f64 {
        if self.avg_chain_len == 0.0 {
            0.0
        } else {
            self.longest_chain as f64 / self.avg_chain_len
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "entries:         {}", self.entries)?;
        writeln!(f, "capacity:        {}", self.capacity)?;
        writeln!(f, "load factor:     {:.3}", self.load_factor)?;
        writeln!(f, "empty buckets:   {}", self.empty_buckets)?;
        writeln!(f, "longest chain:   {}", self.longest_chain)?;
        writeln!(f, "avg chain len:   {:.3}", self.avg_chain_len)?;
        writeln!(f, "resizes:         {}", self.resizes)?;
        write!(f, "failed resizes:  {}", self.failed_resizes)
    }
}
