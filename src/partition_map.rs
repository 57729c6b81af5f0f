use crate::config::Config;
use crate::error::{Error, Result};
use crate::loader::read_records;
use crate::shared::FrozenTable;
use crate::table::HashTable;
use crate::{AffinityKey, PartitionId, NOT_FOUND};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Bucket count the partition map starts with, sized for a bulk load.
pub const PARTITION_MAP_INITIAL_CAPACITY: usize = 20480;

/// Outcome of loading records into a [`PartitionMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadSummary {
    /// Records read and inserted (duplicates included).
    pub records: usize,
    /// Keys in the table after loading.
    pub distinct_keys: usize,
    /// The map was already populated and nothing was read.
    pub already_loaded: bool,
}

/// Key -> partition assignment, loaded once and queried many times.
///
/// Owns at most one [`HashTable`]. Until it is loaded every query misses.
///
/// # Example
///
/// ```rust
/// use affinitymap::{PartitionMap, NOT_FOUND};
///
/// let mut map = PartitionMap::new();
/// assert_eq!(map.query(7), None);
///
/// map.init_from_reader("7\t2\n8\t0\n".as_bytes())?;
/// assert_eq!(map.query(7), Some(2));
/// assert_eq!(map.query_or_sentinel(9), NOT_FOUND);
/// # Ok::<(), affinitymap::Error>(())
/// ```
#[derive(Debug)]
pub struct PartitionMap {
    config: Config,
    table: Option<HashTable>,
}

impl PartitionMap {
    /// Create an unpopulated map with the default bulk-load capacity.
    pub fn new() -> Self {
        Self {
            config: Config {
                initial_capacity: PARTITION_MAP_INITIAL_CAPACITY,
                ..Config::default()
            },
            table: None,
        }
    }

    /// Create an unpopulated map whose table will be built from `config`.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            table: None,
        }
    }

    /// Load the data file at `path` unless the map is already populated.
    pub fn init_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<LoadSummary> {
        let path = path.as_ref();
        if self.is_populated() {
            log::warn!("partition map already initialized, not loading {path:?}");
            return Ok(self.already_loaded());
        }

        let file = File::open(path)?;
        let summary = self.load_reader(BufReader::new(file))?;
        log::info!(
            "loaded {} key-partition pairs from {path:?}",
            summary.records
        );
        Ok(summary)
    }

    /// Load records from `reader` unless the map is already populated.
    pub fn init_from_reader<R: BufRead>(&mut self, reader: R) -> Result<LoadSummary> {
        if self.is_populated() {
            log::warn!("partition map already initialized, not loading");
            return Ok(self.already_loaded());
        }

        let summary = self.load_reader(reader)?;
        log::info!("loaded {} key-partition pairs", summary.records);
        Ok(summary)
    }

    fn load_reader<R: BufRead>(&mut self, reader: R) -> Result<LoadSummary> {
        self.load(read_records(reader))
    }

    /// Insert every pair, creating the table first if needed.
    ///
    /// Each key is read back right after it is written; a mismatch stops the
    /// load with [`Error::InvariantViolation`]. A failed load discards the
    /// table, so the map is unpopulated afterwards and can be loaded again.
    pub fn load_records<I>(&mut self, records: I) -> Result<LoadSummary>
    where
        I: IntoIterator<Item = (AffinityKey, PartitionId)>,
    {
        self.load(records.into_iter().map(Ok))
    }

    fn load<I>(&mut self, records: I) -> Result<LoadSummary>
    where
        I: IntoIterator<Item = Result<(AffinityKey, PartitionId)>>,
    {
        self.table_mut()?;
        let mut count = 0;
        for record in records {
            let inserted = record.and_then(|(key, value)| self.insert_verified(key, value));
            if let Err(e) = inserted {
                log::warn!("partition map load failed after {count} records, discarding: {e}");
                self.cleanup();
                return Err(e);
            }
            count += 1;
        }
        Ok(self.summary(count))
    }

    fn insert_verified(&mut self, key: AffinityKey, value: PartitionId) -> Result<()> {
        let table = self.table_mut()?;
        table.put(key, value);

        match table.find(key) {
            Some(found) if found == value => Ok(()),
            found => Err(Error::InvariantViolation {
                key,
                expected: value,
                found,
            }),
        }
    }

    fn table_mut(&mut self) -> Result<&mut HashTable> {
        if self.table.is_none() {
            self.table = Some(HashTable::with_config(self.config.clone())?);
        }
        self.table.as_mut().ok_or(Error::NotPopulated)
    }

    fn summary(&self, records: usize) -> LoadSummary {
        LoadSummary {
            records,
            distinct_keys: self.table.as_ref().map_or(0, HashTable::size),
            already_loaded: false,
        }
    }

    fn already_loaded(&self) -> LoadSummary {
        LoadSummary {
            already_loaded: true,
            ..self.summary(0)
        }
    }

    /// Partition of `key`, `None` if absent or the map is not loaded.
    pub fn query(&self, key: AffinityKey) -> Option<PartitionId> {
        self.table.as_ref()?.get(key)
    }

    /// Partition of `key`, [`NOT_FOUND`] if absent or the map is not loaded.
    pub fn query_or_sentinel(&self, key: AffinityKey) -> PartitionId {
        self.query(key).unwrap_or(NOT_FOUND)
    }

    /// Whether a table has been created.
    pub fn is_populated(&self) -> bool {
        self.table.is_some()
    }

    /// The loaded table, if any.
    pub fn table(&self) -> Option<&HashTable> {
        self.table.as_ref()
    }

    /// Release the table. The map can be initialized again afterwards.
    pub fn cleanup(&mut self) {
        if let Some(table) = self.table.take() {
            table.destroy();
        }
    }

    /// Hand the loaded table out as a shareable read-only snapshot.
    pub fn into_frozen(self) -> Result<FrozenTable> {
        self.table.map(HashTable::freeze).ok_or(Error::NotPopulated)
    }
}

impl Default for PartitionMap {
    fn default() -> Self {
        Self::new()
    }
}
