use crate::error::Error;
use crate::hash::KeyHasher;
use crate::table::HashTable;

/// Bucket count used when none is configured.
pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

/// Load factor above which the table doubles its bucket array.
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.75;

/// Which hash function to use for bucket selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashFunction {
    /// 64-bit avalanche mix of the key (default).
    #[default]
    Mix64,
    /// Use ahash with fixed keys.
    AHash,
    /// Use fxhash (faster but potentially less distributed).
    #[cfg(feature = "fxhash")]
    FxHash,
}

/// Configuration for a [`HashTable`] instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub(crate) initial_capacity: usize,
    pub(crate) max_load_factor: f64,
    pub(crate) hash_function: HashFunction,
}

impl Config {
    /// Create a new config with defaults (16 buckets, 0.75 load factor, mix64).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial number of buckets. Must be greater than 0.
    pub fn initial_capacity(mut self, capacity: usize) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        self.initial_capacity = capacity;
        Ok(self)
    }

    /// Set the growth threshold. Must be finite and greater than 0.
    pub fn max_load_factor(mut self, load_factor: f64) -> Result<Self, Error> {
        if !load_factor.is_finite() || load_factor <= 0.0 {
            return Err(Error::InvalidLoadFactor);
        }
        self.max_load_factor = load_factor;
        Ok(self)
    }

    /// Set the hash function to use.
    pub fn hash_function(mut self, hash_fn: HashFunction) -> Self {
        self.hash_function = hash_fn;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.initial_capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        if !self.max_load_factor.is_finite() || self.max_load_factor <= 0.0 {
            return Err(Error::InvalidLoadFactor);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            hash_function: HashFunction::Mix64,
        }
    }
}

/// Builder for creating a [`HashTable`] with custom configuration.
pub struct HashTableBuilder {
    config: Config,
}

impl HashTableBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set the initial number of buckets. Must be greater than 0.
    pub fn initial_capacity(mut self, capacity: usize) -> Result<Self, Error> {
        self.config = self.config.initial_capacity(capacity)?;
        Ok(self)
    }

    /// Set the growth threshold. Must be finite and greater than 0.
    pub fn max_load_factor(mut self, load_factor: f64) -> Result<Self, Error> {
        self.config = self.config.max_load_factor(load_factor)?;
        Ok(self)
    }

    /// Set the hash function to use.
    pub fn hash_function(mut self, hash_fn: HashFunction) -> Self {
        self.config = self.config.hash_function(hash_fn);
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build a table with the configured settings.
    pub fn build(self) -> Result<HashTable, Error> {
        HashTable::with_config(self.config)
    }
}

impl Default for HashTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a hash function instance based on the configuration.
pub(crate) fn create_hasher(hash_fn: HashFunction) -> KeyHasher {
    match hash_fn {
        HashFunction::Mix64 => KeyHasher::Mix64,
        HashFunction::AHash => KeyHasher::AHash,
        #[cfg(feature = "fxhash")]
        HashFunction::FxHash => KeyHasher::FxHash,
    }
}
