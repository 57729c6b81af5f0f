use crate::{AffinityKey, PartitionId};

/// Errors that can occur when building, loading or verifying a table.
#[derive(Debug)]
pub enum Error {
    /// The bucket array for the requested number of buckets could not be allocated.
    AllocationFailure {
        /// Bucket count that was requested.
        buckets: usize,
    },
    /// The bucket count is invalid (must be greater than 0).
    InvalidCapacity,
    /// The growth threshold is invalid (must be finite and greater than 0).
    InvalidLoadFactor,
    /// A key did not read back with the value that was just written to it.
    InvariantViolation {
        /// Key that was written.
        key: AffinityKey,
        /// Value that was written.
        expected: PartitionId,
        /// Value that was read back, `None` if the key went missing.
        found: Option<PartitionId>,
    },
    /// A record in a data file could not be parsed.
    Parse {
        /// 1-based line number of the offending record.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },
    /// Reading or writing a data file failed.
    Io(std::io::Error),
    /// The partition map has not been loaded yet.
    NotPopulated,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::AllocationFailure { buckets } => {
                write!(f, "failed to allocate bucket array of {buckets} buckets")
            }
            Error::InvalidCapacity => write!(f, "capacity must be greater than 0"),
            Error::InvalidLoadFactor => {
                write!(f, "max load factor must be finite and greater than 0")
            }
            Error::InvariantViolation {
                key,
                expected,
                found: Some(found),
            } => write!(
                f,
                "mismatch after inserting key {key}: wrote {expected}, read back {found}"
            ),
            Error::InvariantViolation {
                key,
                expected,
                found: None,
            } => write!(
                f,
                "mismatch after inserting key {key}: wrote {expected}, key is missing"
            ),
            Error::Parse { line, reason } => write!(f, "line {line}: {reason}"),
            Error::Io(e) => write!(f, "io error: {e}"),
            Error::NotPopulated => write!(f, "partition map is not populated"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
